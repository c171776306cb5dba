//! Enumerate and rank serial ports.

use std::sync::Arc;

use arcade_core::{SerialPortCandidate, rank_candidates};

use crate::transport::SerialTransport;

/// Lists candidate ports, best guess first.
pub struct SerialDeviceRegistry<T> {
    transport: Arc<T>,
}

impl<T: SerialTransport> SerialDeviceRegistry<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }

    /// Enumerate, score and sort ports. Never fails: enumeration errors are
    /// logged and yield an empty list.
    pub async fn list_candidates(&self) -> Vec<SerialPortCandidate> {
        let transport = Arc::clone(&self.transport);
        match tokio::task::spawn_blocking(move || transport.list_ports()).await {
            Ok(Ok(ports)) => {
                let ranked = rank_candidates(ports);
                tracing::debug!("found {} serial ports", ranked.len());
                ranked
            }
            Ok(Err(e)) => {
                tracing::warn!("serial port enumeration failed: {e}");
                Vec::new()
            }
            Err(e) => {
                tracing::warn!("serial port enumeration task failed: {e}");
                Vec::new()
            }
        }
    }
}
