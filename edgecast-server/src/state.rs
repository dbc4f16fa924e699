//! Application state shared across all request handlers.

use edgecast_core::events::ShutdownReceiver;
use edgecast_core::hub::BroadcastHub;
use edgecast_core::processors::{IngestGateway, PipelineProbe};
use std::sync::Arc;

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind Arc).
#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<BroadcastHub>,
    /// Encodes `POST /events` bodies onto the ingest queue.
    pub gateway: IngestGateway,
    pub probe: PipelineProbe,
    /// Flips to `true` when the server starts shutting down.
    pub shutdown: ShutdownReceiver,
}

impl AppState {
    pub fn new(
        hub: Arc<BroadcastHub>,
        gateway: IngestGateway,
        probe: PipelineProbe,
        shutdown: ShutdownReceiver,
    ) -> Self {
        Self {
            hub,
            gateway,
            probe,
            shutdown,
        }
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown.borrow()
    }
}
