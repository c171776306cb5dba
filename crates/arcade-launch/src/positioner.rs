//! Best-effort placement of a game's native window after launch.
//!
//! The game's window appears some time after spawn and there is no portable
//! "window created" event, so placement is retried on a timer and simply
//! stops after a fixed number of attempts.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use arcade_core::{LaunchMode, Rect};

/// Moves/resizes a freshly launched game window. Fire-and-forget: failures
/// never reach the launch result.
pub trait WindowPositioner: Send + Sync {
    fn position(&self, target: Rect, mode: LaunchMode);
}

/// Used on platforms without a positioning mechanism.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPositioner;

impl WindowPositioner for NoopPositioner {
    fn position(&self, _target: Rect, _mode: LaunchMode) {}
}

/// macOS: drive System Events through `osascript`.
#[derive(Debug, Clone)]
pub struct AppleScriptPositioner {
    process_name: String,
    attempts: u32,
    interval: Duration,
}

impl AppleScriptPositioner {
    pub fn new(attempts: u32, interval: Duration) -> Self {
        Self {
            process_name: "Python".to_string(),
            attempts,
            interval,
        }
    }

    /// Match windows of processes whose name contains `name` (default `Python`).
    #[must_use]
    pub fn with_process_name(mut self, name: impl Into<String>) -> Self {
        self.process_name = name.into();
        self
    }
}

impl Default for AppleScriptPositioner {
    fn default() -> Self {
        Self::new(10, Duration::from_millis(500))
    }
}

impl WindowPositioner for AppleScriptPositioner {
    fn position(&self, target: Rect, mode: LaunchMode) {
        let script = build_positioning_script(target, mode, &self.process_name);
        let attempts = self.attempts;
        let interval = self.interval;

        tokio::spawn(async move {
            for attempt in 1..=attempts {
                tokio::time::sleep(interval).await;
                let result = tokio::process::Command::new("osascript")
                    .arg("-e")
                    .arg(&script)
                    .stdin(std::process::Stdio::null())
                    .stdout(std::process::Stdio::null())
                    .stderr(std::process::Stdio::null())
                    .status()
                    .await;
                match result {
                    Ok(status) if status.success() => {}
                    Ok(status) => {
                        tracing::debug!(attempt, "osascript exited {status}");
                    }
                    Err(e) => {
                        tracing::debug!(attempt, "osascript unavailable: {e}");
                        break;
                    }
                }
            }
            tracing::debug!("window positioning finished");
        });
    }
}

/// AppleScript that moves every window of matching processes to `target`
/// and toggles native fullscreen off for embedded launches.
pub fn build_positioning_script(target: Rect, mode: LaunchMode, process_name: &str) -> String {
    let fullscreen = match mode {
        LaunchMode::Embedded => "false",
        LaunchMode::External => "true",
    };
    let process_name = process_name.replace('\\', "\\\\").replace('"', "\\\"");
    format!(
        r#"tell application "System Events"
  try
    set gameProcesses to every process whose name contains "{process_name}"
    repeat with proc in gameProcesses
      try
        repeat with win in (windows of proc)
          try
            set position of win to {{{x}, {y}}}
            set size of win to {{{w}, {h}}}
            set value of attribute "AXFullScreen" of win to {fullscreen}
          end try
        end repeat
      end try
    end repeat
  end try
end tell"#,
        x = target.x,
        y = target.y,
        w = target.width,
        h = target.height,
    )
}

/// Name fragment that matches the process of `interpreter`:
/// `/opt/homebrew/bin/python3.12` becomes `python`. AppleScript `contains`
/// ignores case, so this also matches the `Python` app process.
pub fn interpreter_process_name(interpreter: &str) -> String {
    let stem = Path::new(interpreter)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = stem.trim_end_matches(|c: char| c.is_ascii_digit() || c == '.');
    if name.is_empty() {
        "Python".to_string()
    } else {
        name.to_string()
    }
}

/// Pick the positioner for the running platform. Windows are matched by the
/// name of the interpreter that launches `.py` games.
pub fn positioner_for_platform(
    attempts: u32,
    interval: Duration,
    interpreter: &str,
) -> Arc<dyn WindowPositioner> {
    if cfg!(target_os = "macos") {
        Arc::new(
            AppleScriptPositioner::new(attempts, interval)
                .with_process_name(interpreter_process_name(interpreter)),
        )
    } else {
        Arc::new(NoopPositioner)
    }
}
