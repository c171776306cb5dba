use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ArcadeError;

// ─── Geometry ─────────────────────────────────────────────────────

/// Axis-aligned rectangle in absolute physical-display coordinates.
///
/// Used for display bounds, shell window bounds and computed target bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Exclusive right edge.
    pub fn right(&self) -> i64 {
        i64::from(self.x) + i64::from(self.width)
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> i64 {
        i64::from(self.y) + i64::from(self.height)
    }

    /// True when `other` lies entirely inside `self`.
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// `"x,y"` as passed in `ARCADE_WINDOW_POS`.
    pub fn position_env(&self) -> String {
        format!("{},{}", self.x, self.y)
    }

    /// `"WxH"` as passed in `ARCADE_WINDOW_SIZE`.
    pub fn size_env(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

/// Embedding region requested by the UI, relative to the shell window's
/// client area. Values may be fractional; they are rounded during layout.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Viewport {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

// ─── Launch ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaunchMode {
    /// Game takes over the whole display.
    #[default]
    External,
    /// Game occupies a sub-region of the shell's display.
    Embedded,
}

impl LaunchMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::External => "external",
            Self::Embedded => "embedded",
        }
    }

    /// Value of `ARCADE_EMBEDDED`.
    pub fn embedded_flag(self) -> &'static str {
        match self {
            Self::External => "0",
            Self::Embedded => "1",
        }
    }
}

impl fmt::Display for LaunchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LaunchMode {
    type Err = ArcadeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "external" => Ok(Self::External),
            "embedded" => Ok(Self::Embedded),
            _ => Err(ArcadeError::InvalidRequest(format!(
                "unknown launch mode: {s}"
            ))),
        }
    }
}

/// A request to launch a game. `game_path` is untrusted and relative to the
/// games directory; `viewport` only matters in embedded mode.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchRequest {
    #[serde(default)]
    pub game_path: String,
    #[serde(default)]
    pub mode: LaunchMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport: Option<Viewport>,
}

impl LaunchRequest {
    /// External launch of `game_path` (the bare-string form of the request).
    pub fn external(game_path: impl Into<String>) -> Self {
        Self {
            game_path: game_path.into(),
            mode: LaunchMode::External,
            viewport: None,
        }
    }

    #[must_use]
    pub fn embedded(mut self, viewport: Viewport) -> Self {
        self.mode = LaunchMode::Embedded;
        self.viewport = Some(viewport);
        self
    }
}

/// Wire form of `launchGame`: either a bare path or a full request object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LaunchPayload {
    Path(String),
    Request(LaunchRequest),
}

impl From<LaunchPayload> for LaunchRequest {
    fn from(payload: LaunchPayload) -> Self {
        match payload {
            LaunchPayload::Path(path) => LaunchRequest::external(path),
            LaunchPayload::Request(req) => req,
        }
    }
}

/// `{success, message}` reply returned to the UI for every command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchResult {
    pub success: bool,
    pub message: String,
}

impl LaunchResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

impl<T: Into<String>> From<Result<T, ArcadeError>> for LaunchResult {
    fn from(result: Result<T, ArcadeError>) -> Self {
        match result {
            Ok(message) => Self::ok(message),
            Err(e) => Self::failed(e.to_string()),
        }
    }
}

/// Lifecycle notification for a launched game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    /// The game process terminated. `code` is `None` when it was killed by a signal.
    #[serde(rename_all = "camelCase")]
    Exited {
        game_path: String,
        code: Option<i32>,
    },
}

// ─── Serial device ────────────────────────────────────────────────

/// A serial port found by enumeration, not yet confirmed to be the device.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerialPortCandidate {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pnp_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub friendly_name: Option<String>,
    #[serde(default)]
    pub score: u32,
}

impl SerialPortCandidate {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        self.manufacturer = Some(manufacturer.into());
        self
    }
}

/// Connection status of the auxiliary device. One instance per process,
/// published on every change.
///
/// Invariants: `connected && connecting` is never true; `port_path` is set
/// iff `connected`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStatus {
    pub connected: bool,
    pub connecting: bool,
    pub auto_connect: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_milliseconds_option"
    )]
    pub last_seen_at: Option<DateTime<Utc>>,
}

impl Default for DeviceStatus {
    fn default() -> Self {
        Self {
            connected: false,
            connecting: false,
            auto_connect: true,
            port_path: None,
            error: None,
            last_seen_at: None,
        }
    }
}

impl DeviceStatus {
    /// Move to Connecting. Clears any stale error and port.
    pub fn mark_connecting(&mut self) {
        self.connected = false;
        self.connecting = true;
        self.port_path = None;
        self.error = None;
    }

    /// Move to Connected on `port_path`.
    pub fn mark_connected(&mut self, port_path: impl Into<String>) {
        self.connected = true;
        self.connecting = false;
        self.port_path = Some(port_path.into());
        self.error = None;
    }

    /// Move to Disconnected, recording `error` (None for a requested disconnect).
    pub fn mark_disconnected(&mut self, error: Option<String>) {
        self.connected = false;
        self.connecting = false;
        self.port_path = None;
        self.error = error;
    }

    /// Record device activity (a framed inbound line or a successful write).
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_seen_at = Some(now);
        self.error = None;
    }

    /// Check the status invariants.
    pub fn is_consistent(&self) -> bool {
        !(self.connected && self.connecting) && (self.port_path.is_some() == self.connected)
    }
}

/// Event pushed to UI subscribers by the serial supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    Status(DeviceStatus),
    Line(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn launch_request_accepts_bare_string() {
        let payload: LaunchPayload = serde_json::from_str(r#""games/pong.py""#).expect("parse");
        let req = LaunchRequest::from(payload);
        assert_eq!(req.game_path, "games/pong.py");
        assert_eq!(req.mode, LaunchMode::External);
        assert!(req.viewport.is_none());
    }

    #[test]
    fn launch_request_accepts_object_with_defaults() {
        let payload: LaunchPayload =
            serde_json::from_str(r#"{"gamePath":"games/a.py"}"#).expect("parse");
        let req = LaunchRequest::from(payload);
        assert_eq!(req.mode, LaunchMode::External);

        let payload: LaunchPayload = serde_json::from_str(
            r#"{"gamePath":"games/a.py","mode":"embedded","viewport":{"x":10,"y":20.5,"width":640,"height":480}}"#,
        )
        .expect("parse");
        let req = LaunchRequest::from(payload);
        assert_eq!(req.mode, LaunchMode::Embedded);
        assert_eq!(req.viewport.expect("viewport").y, 20.5);
    }

    #[test]
    fn launch_mode_from_str() {
        assert_eq!("Embedded".parse::<LaunchMode>(), Ok(LaunchMode::Embedded));
        assert!("windowed".parse::<LaunchMode>().is_err());
    }

    #[test]
    fn rect_env_formatting() {
        let r = Rect::new(-10, 20, 800, 600);
        assert_eq!(r.position_env(), "-10,20");
        assert_eq!(r.size_env(), "800x600");
    }

    #[test]
    fn rect_contains() {
        let display = Rect::new(0, 0, 1920, 1080);
        assert!(display.contains_rect(&Rect::new(0, 0, 1920, 1080)));
        assert!(display.contains_rect(&Rect::new(100, 100, 320, 240)));
        assert!(!display.contains_rect(&Rect::new(1800, 0, 320, 240)));
        assert!(!display.contains_rect(&Rect::new(-1, 0, 320, 240)));
    }

    #[test]
    fn device_status_serializes_camel_case_millis() {
        let mut status = DeviceStatus::default();
        status.mark_connected("/dev/ttyACM0");
        status.touch(DateTime::from_timestamp_millis(1_700_000_000_123).expect("ts"));
        let json = serde_json::to_value(&status).expect("serialize");
        assert_eq!(json["connected"], true);
        assert_eq!(json["autoConnect"], true);
        assert_eq!(json["portPath"], "/dev/ttyACM0");
        assert_eq!(json["lastSeenAt"], 1_700_000_000_123_i64);
        assert!(json.get("error").is_none());
    }

    #[test]
    fn device_status_transitions_keep_invariants() {
        let mut status = DeviceStatus::default();
        assert!(status.is_consistent());
        status.mark_connecting();
        assert!(status.is_consistent());
        status.mark_connected("COM3");
        assert!(status.is_consistent());
        status.mark_disconnected(Some("Device disconnected".into()));
        assert!(status.is_consistent());
        assert_eq!(status.error.as_deref(), Some("Device disconnected"));
    }

    #[test]
    fn launch_result_from_result() {
        let ok: LaunchResult = Ok::<_, ArcadeError>("Game launched successfully").into();
        assert!(ok.success);
        let err: LaunchResult = Err::<String, _>(ArcadeError::NoPortsFound).into();
        assert!(!err.success);
        assert_eq!(err.message, "No serial ports found");
    }

    #[test]
    fn game_event_wire_shape() {
        let ev = GameEvent::Exited {
            game_path: "games/a.py".into(),
            code: Some(0),
        };
        let json = serde_json::to_value(&ev).expect("serialize");
        assert_eq!(json["type"], "exited");
        assert_eq!(json["gamePath"], "games/a.py");
        assert_eq!(json["code"], 0);
    }
}
