//! Bodies of the publish and ingest endpoints.

use serde::{Deserialize, Serialize};

/// Delivery priority for a published message.
///
/// When a subscriber's queue is full, a [`Priority::High`] message evicts
/// the oldest queued message, while a [`Priority::Normal`] message is
/// dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Normal,
    High,
}

/// `POST /publish` request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishRequest {
    pub channel: String,
    #[serde(default)]
    pub priority: Priority,
    pub data: serde_json::Value,
}

/// Outcome of one publish across every subscriber on the channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishReport {
    /// Subscribers that received the message (including those where an
    /// older message was evicted to make room).
    pub delivered: usize,
    /// Subscribers whose oldest queued message was evicted.
    pub evicted: usize,
    /// Subscribers whose queue was full, so the message was dropped.
    pub dropped: usize,
}

/// `POST /events` response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestResponse {
    /// Events encoded and queued by this request.
    pub accepted: usize,
    /// Records dropped by the ingest queue since startup.
    pub dropped_total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_defaults_to_normal() {
        let req: PublishRequest =
            serde_json::from_str(r#"{"channel":"games","data":{"done":true}}"#).unwrap();
        assert_eq!(req.priority, Priority::Normal);

        let req: PublishRequest =
            serde_json::from_str(r#"{"channel":"alerts","priority":"high","data":null}"#)
                .unwrap();
        assert_eq!(req.priority, Priority::High);
    }
}
