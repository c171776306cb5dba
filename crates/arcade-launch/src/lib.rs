//! arcade-launch: game process supervision for the arcade shell.
//! Spawns games with the right interpreter and placement contract, watches
//! them until exit, and hands control back to the shell window.

pub mod launcher;
pub mod positioner;
pub mod process;
pub mod shell;

pub use launcher::{GameKind, GameLauncher, LaunchOutcome, default_python};
pub use positioner::{
    AppleScriptPositioner, NoopPositioner, WindowPositioner, interpreter_process_name,
    positioner_for_platform,
};
pub use process::GameProcessHandle;
pub use shell::ShellWindow;
