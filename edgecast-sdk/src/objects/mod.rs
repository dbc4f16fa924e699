pub mod alert;
pub mod event;
pub mod metrics;
pub mod publish;
pub mod ws;

pub use alert::{Alert, GameSummary};
pub use event::{CanonicalEvent, ParticipantStats, SituationalFlags, Sport};
pub use metrics::{DetectorStats, EncoderStats, HubStats, MetricsSnapshot};
pub use publish::{IngestResponse, Priority, PublishReport, PublishRequest};
pub use ws::{ClientFrame, ServerFrame, WsCloseCode};
