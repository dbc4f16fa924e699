//! WebSocket message types for the subscriber stream.
//!
//! The `GET /ws` endpoint upgrades to a WebSocket connection.
//!
//! # Protocol
//!
//! 1. The server sends a `welcome` frame carrying the subscriber id as soon
//!    as the upgrade completes (also after every reconnect).
//! 2. The client sends [`ClientFrame::Subscribe`] naming one or more
//!    channels; the server answers with a `subscribed` frame listing the
//!    full channel set.
//! 3. Every message published on a subscribed channel arrives as a frame
//!    whose `type` is the channel name.
//! 4. The client should send [`ClientFrame::Ping`] periodically; the server
//!    answers with `pong`. A connection that stays silent past the server's
//!    heartbeat timeout is closed with [`WsCloseCode::HEARTBEAT_TIMEOUT`].
//!
//! Delivery is best-effort: messages published while a client is
//! disconnected are not replayed.

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Client-to-server WebSocket message.
///
/// ```json
/// {"type":"subscribe","channels":["alerts","metrics"]}
/// {"type":"unsubscribe","channels":["metrics"]}
/// {"type":"ping"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    Subscribe {
        channels: Vec<String>,
    },
    /// Leave the listed channels, or every channel when `channels` is
    /// omitted.
    Unsubscribe {
        #[serde(default)]
        channels: Option<Vec<String>>,
    },
    Ping,
}

/// Server-to-client WebSocket message: `{"type": ..., "data": ...}`.
///
/// `type` is one of `welcome`, `subscribed`, `pong`, `error`, or the name
/// of the channel a published message arrived on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerFrame {
    #[serde(rename = "type")]
    pub kind: CompactString,
    pub data: serde_json::Value,
}

/// Payload of a `welcome` frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WelcomeData {
    pub subscriber_id: Uuid,
    /// Channels the server knows about.
    pub channels: Vec<String>,
    pub heartbeat_timeout_secs: u64,
}

/// Payload of a `subscribed` frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribedData {
    /// The subscriber's full channel set after the change.
    pub channels: Vec<String>,
}

/// Payload of an `error` frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorData {
    pub code: u16,
    pub reason: String,
}

impl ServerFrame {
    pub const WELCOME: &'static str = "welcome";
    pub const SUBSCRIBED: &'static str = "subscribed";
    pub const PONG: &'static str = "pong";
    pub const ERROR: &'static str = "error";

    pub fn new(kind: impl Into<CompactString>, data: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            data,
        }
    }

    pub fn welcome(data: &WelcomeData) -> Self {
        Self::new(Self::WELCOME, serde_json::to_value(data).unwrap_or_default())
    }

    pub fn subscribed(channels: Vec<String>) -> Self {
        Self::new(
            Self::SUBSCRIBED,
            serde_json::to_value(SubscribedData { channels }).unwrap_or_default(),
        )
    }

    pub fn pong(server_time: i64) -> Self {
        Self::new(Self::PONG, serde_json::json!({ "server_time": server_time }))
    }

    pub fn error(code: u16, reason: impl Into<String>) -> Self {
        let data = ErrorData {
            code,
            reason: reason.into(),
        };
        Self::new(Self::ERROR, serde_json::to_value(data).unwrap_or_default())
    }

    /// Deserialize `data` into a typed payload.
    pub fn data_as<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.data)
    }
}

/// Well-known WebSocket close codes used by the subscriber stream.
///
/// Codes in the 4000–4999 range are reserved for application use by
/// [RFC 6455 §7.4.2](https://www.rfc-editor.org/rfc/rfc6455#section-7.4.2).
pub struct WsCloseCode;

impl WsCloseCode {
    pub const NORMAL: u16 = 1000;

    /// The server is shutting down.
    pub const GOING_AWAY: u16 = 1001;

    pub const INTERNAL_ERROR: u16 = 1011;

    /// No heartbeat was received within the configured interval.
    pub const HEARTBEAT_TIMEOUT: u16 = 4008;

    /// The client sent a frame the server could not parse.
    pub const INVALID_FRAME: u16 = 4400;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_frame_parsing() {
        let frame: ClientFrame =
            serde_json::from_str(r#"{"type":"subscribe","channels":["alerts"]}"#).unwrap();
        assert_eq!(
            frame,
            ClientFrame::Subscribe {
                channels: vec!["alerts".to_string()]
            }
        );

        let frame: ClientFrame = serde_json::from_str(r#"{"type":"unsubscribe"}"#).unwrap();
        assert_eq!(frame, ClientFrame::Unsubscribe { channels: None });

        let frame: ClientFrame = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert_eq!(frame, ClientFrame::Ping);
    }

    #[test]
    fn test_server_frame_shape() {
        let frame = ServerFrame::subscribed(vec!["alerts".into(), "games".into()]);
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["type"], "subscribed");
        assert_eq!(json["data"]["channels"][1], "games");

        let data: SubscribedData = frame.data_as().unwrap();
        assert_eq!(data.channels.len(), 2);
    }
}
