//! arcade-core: data model and pure decision logic for the arcade shell.
//! Path confinement, launch geometry, serial port scoring, line framing and
//! the device command table. No IO, no async.

pub mod error;
pub mod line_buffer;
pub mod modules;
pub mod path;
pub mod ports;
pub mod types;
pub mod viewport;

pub use error::ArcadeError;
pub use line_buffer::SerialLineBuffer;
pub use modules::{HANDSHAKE_LINES, module_command, run_command_line};
pub use path::resolve_game_path;
pub use ports::{rank_candidates, score_port};
pub use types::{
    DeviceEvent, DeviceStatus, GameEvent, LaunchMode, LaunchPayload, LaunchRequest, LaunchResult, Rect,
    SerialPortCandidate, Viewport,
};
pub use viewport::{MIN_EMBED_HEIGHT, MIN_EMBED_WIDTH, compute_target_bounds};
