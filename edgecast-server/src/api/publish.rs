use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use edgecast_core::hub::HubError;
use edgecast_sdk::objects::PublishRequest;
use kanau::processor::Processor;

use crate::state::AppState;

/// `POST /publish`: push a message to every subscriber of a channel.
///
/// Never waits on subscribers: the reply reports how many queues took the
/// message and how many were full.
pub(super) async fn publish(
    State(state): State<AppState>,
    Json(request): Json<PublishRequest>,
) -> Result<impl IntoResponse, PublishApiError> {
    let channel = request.channel.clone();
    let report = state
        .hub
        .process(request)
        .await
        .map_err(PublishApiError::Hub)?;
    tracing::debug!(%channel, delivered = report.delivered, dropped = report.dropped, "Direct publish");
    Ok((StatusCode::ACCEPTED, Json(report)))
}

#[derive(Debug)]
pub(super) enum PublishApiError {
    Hub(HubError),
}

impl IntoResponse for PublishApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            PublishApiError::Hub(HubError::InvalidChannel(e)) => {
                (StatusCode::BAD_REQUEST, e.to_string()).into_response()
            }
            PublishApiError::Hub(e) => {
                tracing::error!(error = %e, "Publish failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
            }
        }
    }
}
