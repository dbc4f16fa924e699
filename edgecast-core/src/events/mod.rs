//! Channels connecting the pipeline's background processors.
//!
//! # Flow
//!
//! 1. `POST /events` -> `IngestGateway` encodes and pushes onto the
//!    `IngestQueue`
//! 2. `DetectorWorker` pops records, publishes game summaries and alerts to
//!    the `BroadcastHub`, and forwards alerts to the `AlertLog` when enabled
//! 3. `MetricsReporter` and `HeartbeatMonitor` tick independently against
//!    the hub
//!
//! Every processor watches the same shutdown signal.

pub mod channels;

pub use channels::{
    AlertLogReceiver, AlertLogSender, DEFAULT_CHANNEL_BUFFER, ShutdownReceiver, ShutdownSender,
    alert_log_channel, shutdown_channel,
};
