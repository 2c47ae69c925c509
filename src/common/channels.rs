//! Channel type definitions for inter-task communication

use tokio::sync::mpsc;

/// Default channel buffer size
pub const DEFAULT_CHANNEL_SIZE: usize = 1000;

/// Sending half of the signal source queue (raw alert text)
pub type AlertSender = mpsc::Sender<String>;

/// Receiving half of the signal source queue, consumed by the ingestion loop
pub type AlertReceiver = mpsc::Receiver<String>;

/// Create a new alert channel with a custom buffer size
pub fn create_alert_channel_with_size(size: usize) -> (AlertSender, AlertReceiver) {
    mpsc::channel(size.max(1))
}
