//! HTTP and WebSocket handlers.
//!
//! # Endpoints
//!
//! - `POST /events`  – submit one canonical event or an array of them
//! - `POST /publish` – publish directly to a channel, bypassing the detector
//! - `GET  /metrics` – pipeline metrics snapshot
//! - `GET  /ws`      – subscriber WebSocket stream

use axum::{
    Json, Router,
    extract::State,
    response::IntoResponse,
    routing::{get, post},
};

use crate::state::AppState;

mod ingest;
mod publish;
mod ws;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/events", post(ingest::submit_events))
        .route("/publish", post(publish::publish))
        .route("/metrics", get(metrics))
        .route("/ws", get(ws::subscriber_ws))
}

/// `GET /metrics`: current counters of every pipeline component.
async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.probe.snapshot())
}
