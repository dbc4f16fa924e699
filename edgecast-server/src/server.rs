//! Axum server setup and router configuration.

use crate::state::AppState;
use axum::{Json, Router, response::IntoResponse, routing::get};
use serde::Serialize;
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;

/// Build the main application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health check endpoint
        .route("/health", get(health_check))
        .merge(crate::api::router())
        // Add state to all routes
        .with_state(state)
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Simple health check - returns OK if the server is running.
async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Run the server until `shutdown` completes, then drain connections.
pub async fn run_server(
    router: Router,
    addr: SocketAddr,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), std::io::Error> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use edgecast_core::config::HubConfig;
    use edgecast_core::detector::{DetectorMetrics, IngestQueue};
    use edgecast_core::encoder::Encoder;
    use edgecast_core::events::{ShutdownSender, shutdown_channel};
    use edgecast_core::hub::{BroadcastHub, Channel};
    use edgecast_core::processors::{IngestGateway, PipelineProbe};
    use edgecast_sdk::objects::{IngestResponse, MetricsSnapshot, PublishReport};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app() -> (Router, AppState, ShutdownSender) {
        let hub = Arc::new(BroadcastHub::new(HubConfig::default()));
        let encoder = Arc::new(Encoder::new());
        let queue = IngestQueue::new(2);
        let probe = PipelineProbe {
            encoder: encoder.clone(),
            detector: Arc::new(DetectorMetrics::new()),
            queue: queue.clone(),
            hub: hub.clone(),
        };
        let (shutdown_tx, shutdown_rx) = shutdown_channel();
        let state = AppState::new(hub, IngestGateway::new(encoder, queue), probe, shutdown_rx);
        (build_router(state.clone()), state, shutdown_tx)
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_owned()))
            .unwrap()
    }

    async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    const EVENT: &str = r#"{
        "sport": "nfl", "home_id": 1, "away_id": 2, "start_time": 1700000000,
        "home_score": 31, "away_score": 3
    }"#;

    #[tokio::test]
    async fn test_health() {
        let (router, _, _shutdown) = app();
        let response = router
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_events_accepts_single_and_array() {
        let (router, state, _shutdown) = app();

        let response = router.clone().oneshot(post_json("/events", EVENT)).await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let body: IngestResponse = body_json(response).await;
        assert_eq!(body, IngestResponse { accepted: 1, dropped_total: 0 });

        let batch = format!("[{EVENT},{EVENT}]");
        let response = router.oneshot(post_json("/events", &batch)).await.unwrap();
        let body: IngestResponse = body_json(response).await;
        assert_eq!(body, IngestResponse { accepted: 2, dropped_total: 1 });
        assert_eq!(state.gateway.queue().len(), 2);
    }

    #[tokio::test]
    async fn test_events_rejected_after_close() {
        let (router, state, _shutdown) = app();
        state.gateway.queue().close();
        let response = router.oneshot(post_json("/events", EVENT)).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_publish_reports_delivery() {
        let (router, state, _shutdown) = app();
        let subscriber = state.hub.connect();
        state.hub.subscribe(subscriber.id(), &[Channel::predictions()]).unwrap();

        let body = r#"{"channel":"predictions","priority":"high","data":{"pick":"over"}}"#;
        let response = router.clone().oneshot(post_json("/publish", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let report: PublishReport = body_json(response).await;
        assert_eq!(report.delivered, 1);

        let response = router
            .oneshot(post_json("/publish", r#"{"channel":"UPPER","data":1}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_metrics_snapshot() {
        let (router, state, _shutdown) = app();
        state.hub.connect();
        let response = router
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let snapshot: MetricsSnapshot = body_json(response).await;
        assert_eq!(snapshot.hub.subscribers, 1);
    }
}
