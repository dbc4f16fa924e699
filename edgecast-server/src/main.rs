//! Edgecast Server
//!
//! Ingests completed-game events, scores them for situational patterns and
//! streams alerts to WebSocket subscribers.

mod api;
mod config;
mod server;
mod shutdown;
mod state;

use clap::Parser;
use config::ConfigLoader;
use edgecast_core::detector::{IngestQueue, StreamDetector};
use edgecast_core::encoder::Encoder;
use edgecast_core::events::{alert_log_channel, shutdown_channel};
use edgecast_core::hub::BroadcastHub;
use edgecast_core::processors::{
    AlertLog, DetectorWorker, HeartbeatMonitor, IngestGateway, MetricsReporter, PipelineProbe,
};
use server::{build_router, run_server};
use shutdown::shutdown_pipeline;
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Edgecast - streaming pattern alerts for completed games
#[derive(Parser, Debug)]
#[command(name = "edgecast-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./edgecast.toml", env = "EDGECAST_CONFIG")]
    config: PathBuf,

    /// Override the listen address (e.g., 0.0.0.0:3000)
    #[arg(short, long)]
    listen: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    init_tracing();

    // Parse command line arguments
    let args = Args::parse();

    tracing::info!("Starting edgecast-server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_loader = ConfigLoader::new(&args.config, args.listen);
    let config = config_loader.load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;
    tracing::info!("Configuration loaded from {:?}", args.config);

    let (shutdown_tx, shutdown_rx) = shutdown_channel();

    // Pipeline components
    let encoder = Arc::new(Encoder::new());
    let queue = IngestQueue::new(config.detector.buffer_capacity);
    let hub = Arc::new(BroadcastHub::new(config.hub.clone()));
    let detector = StreamDetector::from_config(&config.detector);
    tracing::info!(scorers = ?detector.registry(), "Stream detector ready");

    let probe = PipelineProbe {
        encoder: encoder.clone(),
        detector: detector.metrics(),
        queue: queue.clone(),
        hub: hub.clone(),
    };

    let mut worker = DetectorWorker::new(detector, queue.clone(), hub.clone(), shutdown_rx.clone());

    let alert_log_handle = match &config.alert_log {
        Some(path) => {
            let (alert_tx, alert_rx) = alert_log_channel();
            let log = AlertLog::open(path, alert_rx)
                .await
                .map_err(|e| {
                    tracing::error!("Failed to open alert log {:?}: {}", path, e);
                    e
                })?;
            worker = worker.with_alert_log(alert_tx);
            Some(tokio::spawn(log.run()))
        }
        None => None,
    };

    let worker_handle = tokio::spawn(worker.run());
    let heartbeat_handle = tokio::spawn(HeartbeatMonitor::new(hub.clone(), shutdown_rx.clone()).run());
    let metrics_handle =
        tokio::spawn(MetricsReporter::new(probe.clone(), shutdown_rx.clone()).run());

    // Build the router
    let state = AppState::new(
        hub.clone(),
        IngestGateway::new(encoder, queue),
        probe,
        shutdown_rx,
    );
    let router = build_router(state);

    // Run the server
    tracing::info!("Starting HTTP server on {}", config.listen);
    let result = run_server(
        router,
        config.listen,
        shutdown_pipeline(shutdown_tx, worker_handle, hub),
    )
    .await;

    // The detector worker was awaited during shutdown; the alert log ends
    // once the worker's sender is gone.
    for (name, handle) in [
        ("heartbeat monitor", heartbeat_handle),
        ("metrics reporter", metrics_handle),
    ] {
        if let Err(e) = handle.await {
            tracing::error!("{} task failed: {}", name, e);
        }
    }
    if let Some(handle) = alert_log_handle {
        if let Err(e) = handle.await {
            tracing::error!("alert log task failed: {}", e);
        }
    }
    tracing::info!("Server shutdown complete");

    result.map_err(Into::into)
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
