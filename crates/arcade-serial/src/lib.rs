//! arcade-serial: link to the auxiliary "hacker" device over a serial port.
//! Discovers and ranks ports, owns the single open connection, frames
//! inbound lines, and keeps reconnecting in the background.

pub mod broadcast;
pub mod registry;
pub mod supervisor;
pub mod transport;

pub use broadcast::StatusBroadcaster;
pub use registry::SerialDeviceRegistry;
pub use supervisor::{SerialSupervisor, SupervisorConfig};
pub use transport::{SerialTransport, SystemSerial};
