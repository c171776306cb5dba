//! Headless stand-in for the shell window.
//!
//! The daemon does not own the kiosk UI window; it tracks the geometry and
//! visibility the launcher requests so the UI layer can query it, and logs
//! every change.

use std::sync::{Mutex, PoisonError};

use arcade_core::Rect;
use arcade_launch::ShellWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShellSnapshot {
    pub bounds: Rect,
    pub fullscreen: bool,
    /// Times the shell was brought back to the front.
    pub raised: u64,
}

pub struct HeadlessShell {
    display: Rect,
    state: Mutex<ShellSnapshot>,
}

impl HeadlessShell {
    /// Shell window covering `display`, windowed.
    pub fn new(display: Rect) -> Self {
        Self {
            display,
            state: Mutex::new(ShellSnapshot {
                bounds: display,
                fullscreen: false,
                raised: 0,
            }),
        }
    }

    pub fn snapshot(&self) -> ShellSnapshot {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update(&self, f: impl FnOnce(&mut ShellSnapshot)) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut state);
    }
}

impl ShellWindow for HeadlessShell {
    fn window_bounds(&self) -> Option<Rect> {
        Some(self.snapshot().bounds)
    }

    fn active_display(&self) -> Rect {
        self.display
    }

    fn set_bounds(&self, bounds: Rect) {
        tracing::debug!(?bounds, "shell bounds");
        self.update(|s| s.bounds = bounds);
    }

    fn set_fullscreen(&self, fullscreen: bool) -> bool {
        self.update(|s| {
            if s.fullscreen != fullscreen {
                tracing::info!(fullscreen, "shell fullscreen");
            }
            s.fullscreen = fullscreen;
        });
        true
    }

    fn show(&self) {
        self.update(|s| {
            s.raised += 1;
            tracing::info!(raised = s.raised, "shell raised");
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_requested_state() {
        let display = Rect::new(0, 0, 1280, 720);
        let shell = HeadlessShell::new(display);
        assert_eq!(shell.window_bounds(), Some(display));
        assert!(!shell.snapshot().fullscreen);

        let inset = Rect::new(100, 100, 640, 480);
        shell.set_bounds(inset);
        assert!(shell.set_fullscreen(true));
        shell.show();

        let snap = shell.snapshot();
        assert_eq!(snap.bounds, inset);
        assert!(snap.fullscreen);
        assert_eq!(snap.raised, 1);
        assert_eq!(shell.active_display(), display);
    }
}
