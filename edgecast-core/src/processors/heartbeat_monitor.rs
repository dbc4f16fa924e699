//! Disconnects subscribers that stopped sending heartbeats.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::hub::BroadcastHub;

pub struct HeartbeatMonitor {
    hub: Arc<BroadcastHub>,
    interval: Duration,
    shutdown_rx: watch::Receiver<bool>,
}

impl HeartbeatMonitor {
    /// Reap on the hub's configured interval.
    pub fn new(hub: Arc<BroadcastHub>, shutdown_rx: watch::Receiver<bool>) -> Self {
        let interval = hub.config().reap_interval;
        Self {
            hub,
            interval,
            shutdown_rx,
        }
    }

    pub async fn run(mut self) {
        info!(interval = ?self.interval, timeout = ?self.hub.config().heartbeat_timeout, "HeartbeatMonitor started");

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                biased;

                changed = self.shutdown_rx.changed() => {
                    if changed.is_err() || *self.shutdown_rx.borrow() {
                        info!("HeartbeatMonitor received shutdown signal");
                        break;
                    }
                }

                _ = ticker.tick() => {
                    let reaped = self.hub.reap_idle(Instant::now());
                    if reaped.is_empty() {
                        debug!(subscribers = self.hub.subscriber_count(), "No idle subscribers");
                    } else {
                        info!(reaped = reaped.len(), "Disconnected idle subscribers");
                    }
                }
            }
        }

        info!("HeartbeatMonitor shutdown complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HubConfig;
    use crate::events::shutdown_channel;

    #[tokio::test(start_paused = true)]
    async fn test_idle_subscriber_is_reaped() {
        let hub = Arc::new(BroadcastHub::new(HubConfig {
            heartbeat_timeout: Duration::from_secs(30),
            reap_interval: Duration::from_secs(10),
            ..Default::default()
        }));
        let subscriber = hub.connect();

        let (shutdown_tx, shutdown_rx) = shutdown_channel();
        let handle = tokio::spawn(HeartbeatMonitor::new(hub.clone(), shutdown_rx).run());

        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(hub.subscriber_count(), 1);

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(hub.subscriber_count(), 0);
        assert!(subscriber.is_closed());

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
