//! Broadcast hub: fan-out of typed messages to channel subscribers.
//!
//! Producers call [`BroadcastHub::publish`], which serializes the message
//! once and pushes it into the bounded queue of every subscriber on the
//! channel. It never waits on a subscriber. Each connection drains its own
//! queue through [`Subscriber::recv`].
//!
//! The registry and the channel map are [`DashMap`]s. No code path holds a
//! guard on one map while touching the other.

mod channel;
mod message;
mod subscriber;

pub use channel::{Channel, ChannelNameError};
pub use message::Message;
pub use subscriber::{Subscriber, SubscriberId};

use dashmap::DashMap;
use edgecast_sdk::objects::ws::WelcomeData;
use edgecast_sdk::objects::{HubStats, Priority, PublishReport, PublishRequest, ServerFrame};
use kanau::processor::Processor;
use serde::Serialize;
use smallvec::SmallVec;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::HubConfig;
use subscriber::Delivery;

#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error("unknown subscriber {0}")]
    UnknownSubscriber(SubscriberId),
    #[error("invalid channel: {0}")]
    InvalidChannel(#[from] ChannelNameError),
}

/// A subscriber's channel set after a membership change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Subscription {
    pub subscriber: SubscriberId,
    pub channels: Vec<Channel>,
}

#[derive(Debug, Default)]
struct HubCounters {
    published: AtomicU64,
    delivered: AtomicU64,
    evicted: AtomicU64,
    dropped: AtomicU64,
}

#[derive(Debug)]
pub struct BroadcastHub {
    subscribers: DashMap<SubscriberId, Arc<Subscriber>>,
    channels: DashMap<Channel, HashSet<SubscriberId>>,
    config: HubConfig,
    counters: HubCounters,
}

impl BroadcastHub {
    pub fn new(config: HubConfig) -> Self {
        Self {
            subscribers: DashMap::new(),
            channels: DashMap::new(),
            config,
            counters: HubCounters::default(),
        }
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Register a new subscriber with no channels. Its queue starts with a
    /// `welcome` frame.
    pub fn connect(&self) -> Arc<Subscriber> {
        let id = SubscriberId::new();
        let subscriber = Arc::new(Subscriber::new(id, self.config.queue_capacity));
        let welcome = WelcomeData {
            subscriber_id: id.as_uuid(),
            channels: self.known_channels(),
            heartbeat_timeout_secs: self.config.heartbeat_timeout.as_secs(),
        };
        subscriber.enqueue(ServerFrame::welcome(&welcome).into(), Priority::High);
        self.subscribers.insert(id, subscriber.clone());
        info!(subscriber = %id, total = self.subscribers.len(), "Subscriber connected");
        subscriber
    }

    pub fn subscriber(&self, id: SubscriberId) -> Option<Arc<Subscriber>> {
        self.subscribers.get(&id).map(|s| s.value().clone())
    }

    /// Join `channels`. Acknowledged with a `subscribed` frame.
    pub fn subscribe(&self, id: SubscriberId, channels: &[Channel]) -> Result<Subscription, HubError> {
        let subscriber = self.lookup(id)?;
        let joined = subscriber.join(channels);
        for channel in &joined {
            self.channels.entry(channel.clone()).or_default().insert(id);
        }
        // A concurrent disconnect may have detached before the inserts above.
        if !self.subscribers.contains_key(&id) {
            self.detach(id, &joined);
            return Err(HubError::UnknownSubscriber(id));
        }
        debug!(subscriber = %id, ?channels, "Subscribed");
        Ok(self.acknowledge(&subscriber))
    }

    /// Leave a subset of channels.
    pub fn leave(&self, id: SubscriberId, channels: &[Channel]) -> Result<Subscription, HubError> {
        let subscriber = self.lookup(id)?;
        let left = subscriber.part(channels);
        self.detach(id, &left);
        debug!(subscriber = %id, ?left, "Left channels");
        Ok(self.acknowledge(&subscriber))
    }

    /// Leave every channel. The subscriber stays connected.
    pub fn unsubscribe(&self, id: SubscriberId) -> Result<Subscription, HubError> {
        let subscriber = self.lookup(id)?;
        let left = subscriber.part_all();
        self.detach(id, &left);
        debug!(subscriber = %id, "Unsubscribed from all channels");
        Ok(self.acknowledge(&subscriber))
    }

    /// Drop the subscriber entirely and close its queue. Returns whether it
    /// was registered.
    pub fn disconnect(&self, id: SubscriberId) -> bool {
        let Some((_, subscriber)) = self.subscribers.remove(&id) else {
            return false;
        };
        let left = subscriber.part_all();
        self.detach(id, &left);
        subscriber.close();
        info!(
            subscriber = %id,
            dropped = subscriber.dropped(),
            evicted = subscriber.evicted(),
            total = self.subscribers.len(),
            "Subscriber disconnected"
        );
        true
    }

    /// Queue a control frame (`pong`, `error`) for one subscriber, behind
    /// anything already waiting. Returns whether the subscriber exists.
    pub fn send_to(&self, id: SubscriberId, frame: ServerFrame) -> bool {
        match self.subscriber(id) {
            Some(subscriber) => {
                subscriber.enqueue(frame.into(), Priority::High);
                true
            }
            None => false,
        }
    }

    /// Record activity from a subscriber.
    pub fn touch(&self, id: SubscriberId) {
        if let Some(subscriber) = self.subscribers.get(&id) {
            subscriber.touch();
        }
    }

    /// Serialize `data` once and offer it to every subscriber on `channel`.
    pub fn publish(&self, channel: &Channel, data: serde_json::Value, priority: Priority) -> PublishReport {
        self.publish_message(channel, Message::new(channel.as_str(), data), priority)
    }

    /// Serialize a typed payload and publish it.
    pub fn publish_json<T: Serialize>(
        &self,
        channel: &Channel,
        payload: &T,
        priority: Priority,
    ) -> Result<PublishReport, serde_json::Error> {
        let data = serde_json::to_value(payload)?;
        Ok(self.publish(channel, data, priority))
    }

    pub fn publish_message(&self, channel: &Channel, message: Message, priority: Priority) -> PublishReport {
        self.counters.published.fetch_add(1, Ordering::Relaxed);

        let ids: SmallVec<[SubscriberId; 16]> = match self.channels.get(channel) {
            Some(members) => members.iter().copied().collect(),
            None => return PublishReport::default(),
        };

        let mut report = PublishReport::default();
        for id in ids {
            let Some(subscriber) = self.subscriber(id) else {
                continue;
            };
            match subscriber.enqueue(message.clone(), priority) {
                Delivery::Queued => report.delivered += 1,
                Delivery::Evicted => {
                    report.delivered += 1;
                    report.evicted += 1;
                }
                Delivery::Dropped => report.dropped += 1,
                Delivery::Closed => {}
            }
        }

        self.counters
            .delivered
            .fetch_add(report.delivered as u64, Ordering::Relaxed);
        self.counters
            .evicted
            .fetch_add(report.evicted as u64, Ordering::Relaxed);
        self.counters
            .dropped
            .fetch_add(report.dropped as u64, Ordering::Relaxed);
        if report.dropped > 0 {
            debug!(%channel, dropped = report.dropped, "Subscriber queues full, message dropped");
        }
        report
    }

    /// Disconnect every subscriber idle for longer than the heartbeat
    /// timeout as of `now`.
    pub fn reap_idle(&self, now: Instant) -> Vec<SubscriberId> {
        let timeout = self.config.heartbeat_timeout;
        let idle: Vec<SubscriberId> = self
            .subscribers
            .iter()
            .filter(|entry| entry.value().idle_for(now) > timeout)
            .map(|entry| *entry.key())
            .collect();
        for id in &idle {
            warn!(subscriber = %id, ?timeout, "Heartbeat timeout");
            self.disconnect(*id);
        }
        idle
    }

    /// Disconnect everyone, used on shutdown.
    pub fn close_all(&self) {
        let ids: Vec<SubscriberId> = self.subscribers.iter().map(|e| *e.key()).collect();
        for id in ids {
            self.disconnect(id);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Channels with at least one subscriber.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn stats(&self) -> HubStats {
        HubStats {
            subscribers: self.subscribers.len(),
            channels: self.channels.len(),
            published: self.counters.published.load(Ordering::Relaxed),
            delivered: self.counters.delivered.load(Ordering::Relaxed),
            evicted: self.counters.evicted.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
        }
    }

    fn lookup(&self, id: SubscriberId) -> Result<Arc<Subscriber>, HubError> {
        self.subscriber(id).ok_or(HubError::UnknownSubscriber(id))
    }

    fn detach(&self, id: SubscriberId, channels: &[Channel]) {
        for channel in channels {
            self.channels.remove_if_mut(channel, |_, members| {
                members.remove(&id);
                members.is_empty()
            });
        }
    }

    fn acknowledge(&self, subscriber: &Subscriber) -> Subscription {
        let channels = subscriber.channels();
        let names = channels.iter().map(|c| c.to_string()).collect();
        subscriber.enqueue(ServerFrame::subscribed(names).into(), Priority::High);
        Subscription {
            subscriber: subscriber.id(),
            channels,
        }
    }

    /// Well-known channels plus every channel that currently has members.
    fn known_channels(&self) -> Vec<String> {
        let mut names: Vec<String> = [
            Channel::alerts(),
            Channel::games(),
            Channel::metrics(),
            Channel::predictions(),
        ]
        .iter()
        .map(|c| c.to_string())
        .collect();
        for entry in self.channels.iter() {
            let name = entry.key().to_string();
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }
}

impl Processor<PublishRequest> for BroadcastHub {
    type Output = PublishReport;
    type Error = HubError;

    async fn process(&self, request: PublishRequest) -> Result<PublishReport, HubError> {
        let channel = Channel::new(&request.channel)?;
        Ok(self.publish(&channel, request.data, request.priority))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn hub(queue_capacity: usize) -> BroadcastHub {
        BroadcastHub::new(HubConfig {
            queue_capacity,
            heartbeat_timeout: Duration::from_secs(30),
            ..Default::default()
        })
    }

    /// Connect and subscribe, then discard the control frames.
    fn joined(hub: &BroadcastHub, channels: &[Channel]) -> Arc<Subscriber> {
        let subscriber = hub.connect();
        hub.subscribe(subscriber.id(), channels).unwrap();
        while subscriber.try_recv().is_some() {}
        subscriber
    }

    #[test]
    fn test_connect_sends_welcome() {
        let hub = hub(8);
        let subscriber = hub.connect();
        let frame = subscriber.try_recv().unwrap().to_frame().unwrap();
        assert_eq!(frame.kind, ServerFrame::WELCOME);
        let welcome: WelcomeData = frame.data_as().unwrap();
        assert_eq!(welcome.subscriber_id, subscriber.id().as_uuid());
        assert_eq!(welcome.heartbeat_timeout_secs, 30);
        assert!(welcome.channels.contains(&"alerts".to_owned()));
    }

    #[test]
    fn test_subscription_changes_are_acknowledged() {
        let hub = hub(8);
        let subscriber = hub.connect();
        let id = subscriber.id();
        subscriber.try_recv();

        let sub = hub.subscribe(id, &[Channel::alerts(), Channel::games()]).unwrap();
        assert_eq!(sub.channels, vec![Channel::alerts(), Channel::games()]);
        let ack = subscriber.try_recv().unwrap().to_frame().unwrap();
        assert_eq!(ack.kind, ServerFrame::SUBSCRIBED);
        assert_eq!(ack.data, json!({"channels": ["alerts", "games"]}));

        let sub = hub.leave(id, &[Channel::games()]).unwrap();
        assert_eq!(sub.channels, vec![Channel::alerts()]);
        assert_eq!(hub.channel_count(), 1);

        let sub = hub.unsubscribe(id).unwrap();
        assert!(sub.channels.is_empty());
        assert_eq!(hub.channel_count(), 0);
        assert_eq!(hub.subscriber_count(), 1);
    }

    #[test]
    fn test_unknown_subscriber() {
        let hub = hub(8);
        let ghost = SubscriberId::new();
        assert!(matches!(
            hub.subscribe(ghost, &[Channel::alerts()]),
            Err(HubError::UnknownSubscriber(id)) if id == ghost
        ));
        assert!(!hub.disconnect(ghost));
    }

    #[test]
    fn test_publish_never_blocks_on_a_stalled_subscriber() {
        let hub = hub(64);
        let stalled = joined(&hub, &[Channel::games()]);
        for n in 0..10_000 {
            hub.publish(&Channel::games(), json!(n), Priority::Normal);
        }
        assert_eq!(stalled.queued(), 64);
        assert_eq!(stalled.dropped(), 10_000 - 64);
        assert_eq!(hub.stats().published, 10_000);
    }

    #[test]
    fn test_full_queue_eviction_policy() {
        let hub = hub(3);
        let subscriber = joined(&hub, &[Channel::alerts()]);
        for n in 0..3 {
            hub.publish(&Channel::alerts(), json!(n), Priority::Normal);
        }

        let before: Vec<String> = subscriber.pending().iter().map(|m| m.text().to_owned()).collect();
        let report = hub.publish(&Channel::alerts(), json!("late"), Priority::Normal);
        assert_eq!(report, PublishReport { delivered: 0, evicted: 0, dropped: 1 });
        let after: Vec<String> = subscriber.pending().iter().map(|m| m.text().to_owned()).collect();
        assert_eq!(before, after);
        assert_eq!(subscriber.dropped(), 1);

        let report = hub.publish(&Channel::alerts(), json!("urgent"), Priority::High);
        assert_eq!(report, PublishReport { delivered: 1, evicted: 1, dropped: 0 });
        let data: Vec<serde_json::Value> = subscriber
            .pending()
            .iter()
            .map(|m| m.to_frame().unwrap().data)
            .collect();
        assert_eq!(data, vec![json!(1), json!(2), json!("urgent")]);
    }

    #[test]
    fn test_channel_isolation() {
        let hub = hub(8);
        let metrics_only = joined(&hub, &[Channel::metrics()]);
        let alerts_only = joined(&hub, &[Channel::alerts()]);

        let report = hub.publish(&Channel::alerts(), json!({"scorer": "blowout"}), Priority::High);
        assert_eq!(report.delivered, 1);
        assert!(metrics_only.try_recv().is_none());
        assert_eq!(alerts_only.try_recv().unwrap().kind(), "alerts");

        let nobody = hub.publish(&Channel::predictions(), json!(null), Priority::Normal);
        assert_eq!(nobody, PublishReport::default());
    }

    #[test]
    fn test_disconnect_racing_subscribe_leaves_no_members() {
        let hub = BroadcastHub::new(HubConfig::default());
        for _ in 0..500 {
            let id = hub.connect().id();
            std::thread::scope(|scope| {
                scope.spawn(|| {
                    let _ = hub.subscribe(id, &[Channel::alerts(), Channel::games()]);
                });
                scope.spawn(|| hub.disconnect(id));
            });
        }
        assert_eq!(hub.subscriber_count(), 0);
        assert_eq!(hub.channel_count(), 0);
    }

    #[tokio::test]
    async fn test_disconnect_closes_queue() {
        let hub = hub(8);
        let subscriber = joined(&hub, &[Channel::games()]);
        hub.publish(&Channel::games(), json!(1), Priority::Normal);
        assert!(hub.disconnect(subscriber.id()));

        assert_eq!(subscriber.recv().await.map(|m| m.kind().to_owned()), Some("games".into()));
        assert!(subscriber.recv().await.is_none());
        assert_eq!(hub.channel_count(), 0);
        let report = hub.publish(&Channel::games(), json!(2), Priority::Normal);
        assert_eq!(report.delivered, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reap_idle_subscribers() {
        let hub = hub(8);
        let quiet = joined(&hub, &[Channel::games()]);
        let chatty = joined(&hub, &[Channel::games()]);

        tokio::time::advance(Duration::from_secs(20)).await;
        hub.touch(chatty.id());
        tokio::time::advance(Duration::from_secs(15)).await;

        let reaped = hub.reap_idle(Instant::now());
        assert_eq!(reaped, vec![quiet.id()]);
        assert!(quiet.is_closed());
        assert!(!chatty.is_closed());
        assert_eq!(hub.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn test_publish_request_processor() {
        let hub = hub(8);
        let subscriber = joined(&hub, &[Channel::new("nba-props").unwrap()]);
        let report = hub
            .process(PublishRequest {
                channel: "nba-props".into(),
                priority: Priority::Normal,
                data: json!({"line": 221.5}),
            })
            .await
            .unwrap();
        assert_eq!(report.delivered, 1);
        assert_eq!(subscriber.queued(), 1);

        let err = hub
            .process(PublishRequest {
                channel: "Bad Name".into(),
                priority: Priority::Normal,
                data: json!(null),
            })
            .await;
        assert!(matches!(err, Err(HubError::InvalidChannel(_))));
    }
}
