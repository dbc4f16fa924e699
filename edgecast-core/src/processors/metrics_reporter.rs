//! Periodic metrics publication.

use edgecast_sdk::objects::{MetricsSnapshot, Priority};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::detector::{DetectorMetrics, IngestQueue};
use crate::encoder::Encoder;
use crate::hub::{BroadcastHub, Channel};

/// Read-only handles onto every pipeline counter.
#[derive(Debug, Clone)]
pub struct PipelineProbe {
    pub encoder: Arc<Encoder>,
    pub detector: Arc<DetectorMetrics>,
    pub queue: IngestQueue,
    pub hub: Arc<BroadcastHub>,
}

impl PipelineProbe {
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            encoder: self.encoder.stats(),
            detector: self.detector.snapshot(self.queue.len(), self.queue.dropped()),
            hub: self.hub.stats(),
        }
    }
}

/// Publishes a [`MetricsSnapshot`] on the `metrics` channel at a fixed
/// interval.
pub struct MetricsReporter {
    probe: PipelineProbe,
    interval: Duration,
    shutdown_rx: watch::Receiver<bool>,
}

impl MetricsReporter {
    pub fn new(probe: PipelineProbe, shutdown_rx: watch::Receiver<bool>) -> Self {
        let interval = probe.hub.config().metrics_interval;
        Self {
            probe,
            interval,
            shutdown_rx,
        }
    }

    pub async fn run(mut self) {
        info!(interval = ?self.interval, "MetricsReporter started");

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker.tick().await;

        loop {
            tokio::select! {
                biased;

                changed = self.shutdown_rx.changed() => {
                    if changed.is_err() || *self.shutdown_rx.borrow() {
                        info!("MetricsReporter received shutdown signal");
                        break;
                    }
                }

                _ = ticker.tick() => self.report(),
            }
        }

        info!("MetricsReporter shutdown complete");
    }

    fn report(&self) {
        let snapshot = self.probe.snapshot();
        match self
            .probe
            .hub
            .publish_json(&Channel::metrics(), &snapshot, Priority::Normal)
        {
            Ok(report) => debug!(
                records = snapshot.detector.records_processed,
                subscribers = snapshot.hub.subscribers,
                delivered = report.delivered,
                "Published metrics"
            ),
            Err(e) => warn!(error = %e, "Failed to serialize metrics snapshot"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HubConfig;
    use crate::events::shutdown_channel;

    fn probe(hub: Arc<BroadcastHub>) -> PipelineProbe {
        PipelineProbe {
            encoder: Arc::new(Encoder::new()),
            detector: Arc::new(DetectorMetrics::new()),
            queue: IngestQueue::new(8),
            hub,
        }
    }

    #[test]
    fn test_snapshot_reads_every_component() {
        let hub = Arc::new(BroadcastHub::new(HubConfig::default()));
        hub.connect();
        let probe = probe(hub);
        let snapshot = probe.snapshot();
        assert_eq!(snapshot.hub.subscribers, 1);
        assert_eq!(snapshot.detector.queue_depth, 0);
        assert_eq!(snapshot.encoder.encoded, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reporter_publishes_on_interval() {
        let hub = Arc::new(BroadcastHub::new(HubConfig {
            metrics_interval: Duration::from_secs(15),
            ..Default::default()
        }));
        let subscriber = hub.connect();
        hub.subscribe(subscriber.id(), &[Channel::metrics()]).unwrap();
        while subscriber.try_recv().is_some() {}

        let (shutdown_tx, shutdown_rx) = shutdown_channel();
        let handle = tokio::spawn(MetricsReporter::new(probe(hub.clone()), shutdown_rx).run());

        tokio::time::sleep(Duration::from_secs(31)).await;
        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();

        let frames: Vec<_> = std::iter::from_fn(|| subscriber.try_recv()).collect();
        assert_eq!(frames.len(), 2);
        let snapshot: MetricsSnapshot = frames[1].to_frame().unwrap().data_as().unwrap();
        assert_eq!(snapshot.hub.subscribers, 1);
        assert_eq!(snapshot.hub.published, 1);
    }
}
