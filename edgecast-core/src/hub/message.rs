//! Pre-serialized outbound messages.

use compact_str::CompactString;
use edgecast_sdk::objects::ServerFrame;
use serde_json::{Map, Value};
use std::sync::Arc;

/// A `{type, data}` frame serialized once and shared by every subscriber
/// queue it lands in. Cloning is a reference count bump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    inner: Arc<MessageInner>,
}

#[derive(Debug, PartialEq, Eq)]
struct MessageInner {
    kind: CompactString,
    text: Box<str>,
}

impl Message {
    pub fn new(kind: &str, data: Value) -> Self {
        let mut frame = Map::with_capacity(2);
        frame.insert("type".to_owned(), Value::String(kind.to_owned()));
        frame.insert("data".to_owned(), data);
        Self {
            inner: Arc::new(MessageInner {
                kind: kind.into(),
                text: Value::Object(frame).to_string().into_boxed_str(),
            }),
        }
    }

    /// The channel name, or the control frame type.
    pub fn kind(&self) -> &str {
        &self.inner.kind
    }

    /// JSON text sent over the socket.
    pub fn text(&self) -> &str {
        &self.inner.text
    }

    /// Parse the text back into a frame.
    pub fn to_frame(&self) -> Result<ServerFrame, serde_json::Error> {
        serde_json::from_str(self.text())
    }
}

impl From<ServerFrame> for Message {
    fn from(frame: ServerFrame) -> Self {
        Self::new(&frame.kind, frame.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_text_is_a_server_frame() {
        let message = Message::new("alerts", json!({"confidence": 0.8}));
        assert_eq!(message.kind(), "alerts");
        let frame = message.to_frame().unwrap();
        assert_eq!(frame.kind, "alerts");
        assert_eq!(frame.data, json!({"confidence": 0.8}));
    }

    #[test]
    fn test_clones_share_text() {
        let message = Message::from(ServerFrame::pong(5));
        let clone = message.clone();
        assert!(std::ptr::eq(message.text(), clone.text()));
        assert_eq!(clone.kind(), ServerFrame::PONG);
    }
}
