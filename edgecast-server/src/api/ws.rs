use axum::{
    extract::{
        State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use edgecast_core::hub::{BroadcastHub, Channel, SubscriberId};
use edgecast_sdk::objects::alert::unix_millis_now;
use edgecast_sdk::objects::{ClientFrame, ServerFrame, WsCloseCode};

use crate::state::AppState;

/// `GET /ws`: subscriber stream.
///
/// Registers a hub subscriber for the lifetime of the connection. The
/// first frame is always `welcome`; after that the connection carries
/// whatever the client subscribes to. Any inbound frame counts as a
/// heartbeat.
pub(super) async fn subscriber_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_subscriber_ws(socket, state))
}

/// What the client frame loop decided.
enum Inbound {
    Continue,
    Close(u16, &'static str),
}

/// Background task that drives a single WebSocket connection.
///
/// Outbound frames come only from the subscriber's hub queue, so control
/// frames and channel messages keep their relative order.
async fn handle_subscriber_ws(mut socket: WebSocket, state: AppState) {
    let hub = state.hub.clone();
    let subscriber = hub.connect();
    let id = subscriber.id();

    let close = loop {
        tokio::select! {
            outbound = subscriber.recv() => {
                match outbound {
                    Some(message) => {
                        if socket.send(Message::Text(message.text().to_owned().into())).await.is_err() {
                            break None;
                        }
                    }
                    // The hub closed the queue: heartbeat timeout or shutdown.
                    None if state.is_shutting_down() => {
                        break Some((WsCloseCode::GOING_AWAY, "server shutting down"));
                    }
                    None => break Some((WsCloseCode::HEARTBEAT_TIMEOUT, "heartbeat timeout")),
                }
            }

            inbound = socket.recv() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        hub.touch(id);
                        match handle_client_frame(&hub, id, text.as_str()) {
                            Inbound::Continue => {}
                            Inbound::Close(code, reason) => break Some((code, reason)),
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break None,
                    Some(Ok(_)) => hub.touch(id),
                    Some(Err(e)) => {
                        tracing::debug!(subscriber = %id, error = %e, "WS: receive failed");
                        break None;
                    }
                }
            }
        }
    };

    hub.disconnect(id);

    if let Some((code, reason)) = close {
        // Flush whatever control frames were queued before closing.
        while let Some(message) = subscriber.try_recv() {
            if socket.send(Message::Text(message.text().to_owned().into())).await.is_err() {
                return;
            }
        }
        let _ = socket
            .send(Message::Close(Some(CloseFrame {
                code,
                reason: reason.into(),
            })))
            .await;
    }
}

fn handle_client_frame(hub: &BroadcastHub, id: SubscriberId, text: &str) -> Inbound {
    let frame = match serde_json::from_str::<ClientFrame>(text) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::debug!(subscriber = %id, error = %e, "WS: unparseable client frame");
            hub.send_to(id, ServerFrame::error(WsCloseCode::INVALID_FRAME, e.to_string()));
            return Inbound::Close(WsCloseCode::INVALID_FRAME, "invalid frame");
        }
    };

    let result = match frame {
        ClientFrame::Subscribe { channels } => Channel::parse_all(&channels)
            .map_err(|e| e.to_string())
            .and_then(|channels| hub.subscribe(id, &channels).map_err(|e| e.to_string())),
        ClientFrame::Unsubscribe { channels: None } => {
            hub.unsubscribe(id).map_err(|e| e.to_string())
        }
        ClientFrame::Unsubscribe {
            channels: Some(channels),
        } => Channel::parse_all(&channels)
            .map_err(|e| e.to_string())
            .and_then(|channels| hub.leave(id, &channels).map_err(|e| e.to_string())),
        ClientFrame::Ping => {
            hub.send_to(id, ServerFrame::pong(unix_millis_now()));
            return Inbound::Continue;
        }
    };

    // Bad channel names are reported but keep the connection open.
    if let Err(reason) = result {
        hub.send_to(id, ServerFrame::error(WsCloseCode::INVALID_FRAME, reason));
    }
    Inbound::Continue
}
