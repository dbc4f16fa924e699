//! Producer-side entry to the detector.

use edgecast_sdk::objects::{CanonicalEvent, IngestResponse};
use kanau::processor::Processor;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::debug;

use crate::detector::{IngestOutcome, IngestQueue};
use crate::encoder::Encoder;

/// Encodes events and hands them to the detector without waiting.
#[derive(Debug, Clone)]
pub struct IngestGateway {
    encoder: Arc<Encoder>,
    queue: IngestQueue,
}

impl IngestGateway {
    pub fn new(encoder: Arc<Encoder>, queue: IngestQueue) -> Self {
        Self { encoder, queue }
    }

    pub fn encoder(&self) -> &Arc<Encoder> {
        &self.encoder
    }

    pub fn queue(&self) -> &IngestQueue {
        &self.queue
    }

    /// Submit a batch. Records displaced from a full queue still count as
    /// accepted; they show up in `dropped_total`.
    pub fn submit_batch(&self, events: &[CanonicalEvent]) -> IngestResponse {
        let accepted = events
            .iter()
            .map(|event| self.submit(event))
            .filter(|outcome| *outcome != IngestOutcome::Closed)
            .count();
        debug!(received = events.len(), accepted, "Ingested batch");
        IngestResponse {
            accepted,
            dropped_total: self.queue.dropped(),
        }
    }

    fn submit(&self, event: &CanonicalEvent) -> IngestOutcome {
        self.queue.push(self.encoder.encode(event))
    }
}

impl Processor<CanonicalEvent> for IngestGateway {
    type Output = IngestOutcome;
    type Error = Infallible;

    async fn process(&self, event: CanonicalEvent) -> Result<IngestOutcome, Infallible> {
        Ok(self.submit(&event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edgecast_sdk::objects::Sport;

    fn event(n: u32) -> CanonicalEvent {
        CanonicalEvent {
            sport: Sport::Nhl,
            home_id: n,
            away_id: n + 1,
            start_time: 1_700_000_000,
            venue_id: None,
            home_score: 3,
            away_score: 2,
            home_stats: Default::default(),
            away_stats: Default::default(),
            flags: Default::default(),
            temperature_f: None,
            spread: None,
        }
    }

    #[test]
    fn test_batch_reports_queue_drops() {
        let gateway = IngestGateway::new(Arc::new(Encoder::new()), IngestQueue::new(2));
        let events: Vec<_> = (0..5).map(event).collect();
        let response = gateway.submit_batch(&events);
        assert_eq!(response, IngestResponse { accepted: 5, dropped_total: 3 });
        assert_eq!(gateway.queue().len(), 2);
        assert_eq!(gateway.encoder().stats().encoded, 5);
    }

    #[tokio::test]
    async fn test_processor_rejects_after_close() {
        let queue = IngestQueue::new(4);
        let gateway = IngestGateway::new(Arc::new(Encoder::new()), queue.clone());
        assert_eq!(gateway.process(event(1)).await, Ok(IngestOutcome::Queued));
        queue.close();
        assert_eq!(gateway.process(event(2)).await, Ok(IngestOutcome::Closed));
    }
}
