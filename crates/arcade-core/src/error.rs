//! Error taxonomy shared by the launcher and the serial supervisor.
//!
//! Every variant is recoverable: the IPC boundary renders it as
//! `{success: false, message}` using the `Display` text below.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArcadeError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("Blocked path traversal: {0}")]
    PathTraversal(String),

    #[error("Game file not found: {0}")]
    GameNotFound(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("Failed to launch game: {0}")]
    LaunchFailed(String),

    #[error("No serial ports found")]
    NoPortsFound,

    #[error("Serial port not found: {0}")]
    PortNotFound(String),

    #[error("Already connected to {0}")]
    AlreadyConnected(String),

    #[error("Already connecting")]
    AlreadyConnecting,

    #[error("Failed to connect: {0}")]
    ConnectFailed(String),

    #[error("Not connected")]
    NotConnected,

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Unknown module: {0}")]
    UnknownModule(String),

    #[error("Serial error: {0}")]
    SerialError(String),
}

impl ArcadeError {
    /// Short machine-readable kind, used in structured log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::PathTraversal(_) => "path_traversal",
            Self::GameNotFound(_) => "game_not_found",
            Self::UnsupportedFileType(_) => "unsupported_file_type",
            Self::LaunchFailed(_) => "launch_failed",
            Self::NoPortsFound => "no_ports_found",
            Self::PortNotFound(_) => "port_not_found",
            Self::AlreadyConnected(_) => "already_connected",
            Self::AlreadyConnecting => "already_connecting",
            Self::ConnectFailed(_) => "connect_failed",
            Self::NotConnected => "not_connected",
            Self::WriteFailed(_) => "write_failed",
            Self::UnknownModule(_) => "unknown_module",
            Self::SerialError(_) => "serial_error",
        }
    }
}
