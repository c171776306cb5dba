//! Fan-out of device status and inbound lines to UI subscribers.

use tokio::sync::broadcast;

use arcade_core::{DeviceEvent, DeviceStatus};

const DEFAULT_CAPACITY: usize = 256;

/// Pushes [`DeviceEvent`]s to every live subscriber.
///
/// Fire-and-forget: publishing with no subscribers is not an error, and a
/// subscriber that falls behind skips ahead (it can resync via the status
/// getter). Dropping a receiver unsubscribes it.
#[derive(Debug, Clone)]
pub struct StatusBroadcaster {
    tx: broadcast::Sender<DeviceEvent>,
}

impl StatusBroadcaster {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DeviceEvent> {
        self.tx.subscribe()
    }

    pub fn publish_status(&self, status: &DeviceStatus) {
        let _ = self.tx.send(DeviceEvent::Status(status.clone()));
    }

    pub fn publish_line(&self, line: String) {
        let _ = self.tx.send(DeviceEvent::Line(line));
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for StatusBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}
