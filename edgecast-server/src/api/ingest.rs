use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use edgecast_sdk::objects::{CanonicalEvent, IngestResponse};
use serde::Deserialize;

use crate::state::AppState;

/// `POST /events` body: a single event or an array of them.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum EventBatch {
    Many(Vec<CanonicalEvent>),
    One(Box<CanonicalEvent>),
}

impl EventBatch {
    fn into_events(self) -> Vec<CanonicalEvent> {
        match self {
            EventBatch::Many(events) => events,
            EventBatch::One(event) => vec![*event],
        }
    }
}

/// `POST /events`: encode events onto the ingest queue.
///
/// Replies `202 Accepted` as soon as the records are queued. A full queue
/// drops its oldest records, which shows up in `dropped_total`.
pub(super) async fn submit_events(
    State(state): State<AppState>,
    Json(batch): Json<EventBatch>,
) -> Result<impl IntoResponse, IngestApiError> {
    let events = batch.into_events();
    let response: IngestResponse = state.gateway.submit_batch(&events);
    if response.accepted < events.len() {
        return Err(IngestApiError::ShuttingDown);
    }
    Ok((StatusCode::ACCEPTED, Json(response)))
}

#[derive(Debug)]
pub(super) enum IngestApiError {
    /// The detector stopped accepting records.
    ShuttingDown,
}

impl IntoResponse for IngestApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            IngestApiError::ShuttingDown => {
                tracing::warn!("Rejected events, detector is shutting down");
                (StatusCode::SERVICE_UNAVAILABLE, "shutting down").into_response()
            }
        }
    }
}
