//! Launch geometry: where the game window should go on the active display.

use crate::types::{LaunchMode, Rect, Viewport};

/// Minimum embedded width, capped by the display width.
pub const MIN_EMBED_WIDTH: u32 = 320;
/// Minimum embedded height, capped by the display height.
pub const MIN_EMBED_HEIGHT: u32 = 240;

/// Compute absolute target bounds for a game window.
///
/// External launches (or embedded launches without a viewport) get the full
/// display. Embedded launches translate the shell-relative `viewport` by the
/// shell window origin, then clamp size and position so the rectangle lies
/// entirely inside `display`.
pub fn compute_target_bounds(
    mode: LaunchMode,
    display: Rect,
    shell: Rect,
    viewport: Option<Viewport>,
) -> Rect {
    let viewport = match (mode, viewport) {
        (LaunchMode::Embedded, Some(v)) => v,
        _ => return display,
    };

    let display_w = i64::from(display.width);
    let display_h = i64::from(display.height);

    let width = clamp(
        round_half_up(viewport.width),
        i64::from(MIN_EMBED_WIDTH).min(display_w),
        display_w,
    );
    let height = clamp(
        round_half_up(viewport.height),
        i64::from(MIN_EMBED_HEIGHT).min(display_h),
        display_h,
    );

    let max_x = i64::from(display.x) + display_w - width;
    let max_y = i64::from(display.y) + display_h - height;

    let x = clamp(
        round_half_up(f64::from(shell.x) + viewport.x),
        i64::from(display.x),
        max_x,
    );
    let y = clamp(
        round_half_up(f64::from(shell.y) + viewport.y),
        i64::from(display.y),
        max_y,
    );

    // All four values are bounded by the display rectangle, so they fit.
    Rect {
        x: x as i32,
        y: y as i32,
        width: width as u32,
        height: height as u32,
    }
}

/// `min(max(value, lo), hi)`; never panics when `lo > hi`.
fn clamp(value: i64, lo: i64, hi: i64) -> i64 {
    value.max(lo).min(hi)
}

/// Round half toward +inf; non-finite input becomes 0.
fn round_half_up(value: f64) -> i64 {
    if value.is_finite() {
        (value + 0.5).floor() as i64
    } else {
        0
    }
}
