//! Channel factories and handle aliases.

use edgecast_sdk::objects::Alert;
use tokio::sync::{mpsc, watch};

/// Buffer size of the alert log channel. A burst larger than this drops
/// alerts from the log, never from the hub.
pub const DEFAULT_CHANNEL_BUFFER: usize = 256;

pub type AlertLogSender = mpsc::Sender<Alert>;
pub type AlertLogReceiver = mpsc::Receiver<Alert>;

/// `true` once shutdown has started.
pub type ShutdownSender = watch::Sender<bool>;
pub type ShutdownReceiver = watch::Receiver<bool>;

pub fn alert_log_channel() -> (AlertLogSender, AlertLogReceiver) {
    mpsc::channel(DEFAULT_CHANNEL_BUFFER)
}

/// Create the shutdown signal. Send `true` to stop every processor holding
/// a receiver.
pub fn shutdown_channel() -> (ShutdownSender, ShutdownReceiver) {
    watch::channel(false)
}
