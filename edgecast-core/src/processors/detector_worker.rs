//! DetectorWorker processor.
//!
//! The DetectorWorker is responsible for:
//! - Popping compact records off the `IngestQueue`
//! - Publishing a summary of each game on the `games` channel
//! - Running the `StreamDetector` and publishing alerts on `alerts` at high
//!   priority
//! - Forwarding alerts to the alert log, when one is attached
//! - On shutdown, scoring whatever is still queued and flushing the detector

use edgecast_sdk::objects::{Alert, Priority};
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::detector::{Alerts, IngestQueue, StreamDetector};
use crate::encoder::{CompactRecord, summarize};
use crate::events::AlertLogSender;
use crate::hub::{BroadcastHub, Channel};

pub struct DetectorWorker {
    detector: StreamDetector,
    queue: IngestQueue,
    hub: Arc<BroadcastHub>,
    alert_log: Option<AlertLogSender>,
    shutdown_rx: watch::Receiver<bool>,
    games: Channel,
    alerts: Channel,
}

impl DetectorWorker {
    pub fn new(
        detector: StreamDetector,
        queue: IngestQueue,
        hub: Arc<BroadcastHub>,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            detector,
            queue,
            hub,
            alert_log: None,
            shutdown_rx,
            games: Channel::games(),
            alerts: Channel::alerts(),
        }
    }

    pub fn with_alert_log(mut self, sender: AlertLogSender) -> Self {
        self.alert_log = Some(sender);
        self
    }

    /// Run until shutdown or until the queue is closed, then drain and flush.
    pub async fn run(mut self) {
        info!(scorers = ?self.detector.registry(), mode = ?self.detector.mode(), "DetectorWorker started");

        loop {
            tokio::select! {
                biased;

                changed = self.shutdown_rx.changed() => {
                    if changed.is_err() || *self.shutdown_rx.borrow() {
                        info!("DetectorWorker received shutdown signal");
                        break;
                    }
                }

                record = self.queue.pop() => match record {
                    Some(record) => self.handle(record),
                    None => {
                        info!("Ingest queue closed");
                        break;
                    }
                },
            }
        }

        self.queue.close();
        let remaining = self.queue.drain();
        if !remaining.is_empty() {
            info!(records = remaining.len(), "Scoring records left in the ingest queue");
        }
        for record in remaining {
            self.handle(record);
        }
        let flushed = self.detector.flush();
        self.dispatch(flushed);

        info!("DetectorWorker shutdown complete");
    }

    fn handle(&mut self, record: CompactRecord) {
        if let Err(e) = self
            .hub
            .publish_json(&self.games, &summarize(&record), Priority::Normal)
        {
            warn!(error = %e, "Failed to serialize game summary");
        }
        let alerts = self.detector.ingest(record);
        self.dispatch(alerts);
    }

    fn dispatch(&self, alerts: Alerts) {
        for alert in alerts {
            match self.hub.publish_json(&self.alerts, &alert, Priority::High) {
                Ok(report) => {
                    debug!(alert = %alert.id, scorer = %alert.scorer, delivered = report.delivered, "Published alert");
                }
                Err(e) => warn!(alert = %alert.id, error = %e, "Failed to serialize alert"),
            }
            self.log(alert);
        }
    }

    fn log(&self, alert: Alert) {
        let Some(sender) = &self.alert_log else {
            return;
        };
        match sender.try_send(alert) {
            Ok(()) => {}
            Err(TrySendError::Full(alert)) => {
                warn!(alert = %alert.id, "Alert log is behind, alert not logged");
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Alert log closed");
            }
        }
    }
}
