//! Background processors and request-side entry points.
//!
//! - `IngestGateway`: encodes canonical events onto the `IngestQueue`
//! - `DetectorWorker`: drains the queue through the `StreamDetector` and
//!   publishes games and alerts
//! - `HeartbeatMonitor`: disconnects silent subscribers
//! - `MetricsReporter`: publishes pipeline metrics on the `metrics` channel
//! - `AlertLog`: appends alerts to a JSON-lines file

pub mod alert_log;
pub mod detector_worker;
pub mod heartbeat_monitor;
pub mod ingest_gateway;
pub mod metrics_reporter;

pub use alert_log::{AlertLog, AlertLogError};
pub use detector_worker::DetectorWorker;
pub use heartbeat_monitor::HeartbeatMonitor;
pub use ingest_gateway::IngestGateway;
pub use metrics_reporter::{MetricsReporter, PipelineProbe};
