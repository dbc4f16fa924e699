//! Subscriber-side WebSocket client.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;

use super::ClientError;
use crate::objects::ws::{ClientFrame, ServerFrame, WelcomeData};

/// A live subscription to the `GET /ws` stream.
///
/// The connection is not re-established automatically; after a disconnect
/// call [`SubscriberClient::connect`] again and re-subscribe.
pub struct SubscriberClient {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
    welcome: WelcomeData,
}

impl SubscriberClient {
    /// Connect and wait for the server's `welcome` frame.
    ///
    /// `ws_url` is the full WebSocket URL, e.g. `ws://localhost:8080/ws`.
    pub async fn connect(ws_url: &Url) -> Result<Self, ClientError> {
        let (mut socket, _) = tokio_tungstenite::connect_async(ws_url.as_str()).await?;
        loop {
            match socket.next().await {
                Some(Ok(Message::Text(text))) => {
                    let frame: ServerFrame = serde_json::from_str(&text)?;
                    if frame.kind == ServerFrame::WELCOME {
                        let welcome = frame.data_as()?;
                        return Ok(Self { socket, welcome });
                    }
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(e.into()),
                None => {
                    return Err(ClientError::WebSocket(
                        tokio_tungstenite::tungstenite::Error::ConnectionClosed,
                    ));
                }
            }
        }
    }

    /// The `welcome` payload received on connect.
    pub fn welcome(&self) -> &WelcomeData {
        &self.welcome
    }

    /// Join the given channels. The server answers with a `subscribed`
    /// frame, delivered through [`next_frame`](Self::next_frame).
    pub async fn subscribe<I, S>(&mut self, channels: I) -> Result<(), ClientError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let frame = ClientFrame::Subscribe {
            channels: channels.into_iter().map(Into::into).collect(),
        };
        self.send(&frame).await
    }

    /// Leave every channel.
    pub async fn unsubscribe_all(&mut self) -> Result<(), ClientError> {
        self.send(&ClientFrame::Unsubscribe { channels: None }).await
    }

    /// Send a keep-alive.
    pub async fn ping(&mut self) -> Result<(), ClientError> {
        self.send(&ClientFrame::Ping).await
    }

    /// Wait for the next server frame. Returns `Ok(None)` once the server
    /// closes the connection.
    pub async fn next_frame(&mut self) -> Result<Option<ServerFrame>, ClientError> {
        while let Some(msg) = self.socket.next().await {
            match msg? {
                Message::Text(text) => return Ok(Some(serde_json::from_str(&text)?)),
                Message::Close(_) => return Ok(None),
                _ => continue,
            }
        }
        Ok(None)
    }

    async fn send(&mut self, frame: &ClientFrame) -> Result<(), ClientError> {
        let json = serde_json::to_string(frame)?;
        self.socket.send(Message::Text(json)).await?;
        Ok(())
    }
}
