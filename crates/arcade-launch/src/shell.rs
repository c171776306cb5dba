//! The host window the launcher hands off to and takes back from.

use arcade_core::Rect;

/// Operations the launcher needs from the shell's own window.
///
/// Implemented by the host UI layer; the launcher only queries geometry and
/// issues visibility commands.
pub trait ShellWindow: Send + Sync {
    /// Current bounds of the shell window, if it exists.
    fn window_bounds(&self) -> Option<Rect>;

    /// Bounds of the display the shell window is on (primary display if none).
    fn active_display(&self) -> Rect;

    fn set_bounds(&self, bounds: Rect);

    /// Returns `false` when there is no window to apply it to.
    fn set_fullscreen(&self, fullscreen: bool) -> bool;

    /// Bring the shell window back to the front.
    fn show(&self);
}
