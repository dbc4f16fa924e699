//! Signal handling for graceful shutdown.

use edgecast_core::events::ShutdownSender;
use edgecast_core::hub::BroadcastHub;
use std::sync::Arc;
use tokio::signal::unix::{SignalKind, signal};
use tokio::task::JoinHandle;

/// Creates a future that completes when a shutdown signal is received.
///
/// Listens for SIGTERM and SIGINT (Ctrl+C).
pub async fn shutdown_signal() {
    let (mut sigterm, mut sigint) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
        (Err(e), _) | (_, Err(e)) => {
            tracing::error!(error = %e, "Failed to install signal handlers, falling back to Ctrl+C");
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            }
            return;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
        _ = sigint.recv() => {
            tracing::info!("Received SIGINT, initiating graceful shutdown");
        }
    }
}

/// Wait for a signal, then wind the pipeline down in order.
pub async fn shutdown_pipeline(
    shutdown_tx: ShutdownSender,
    worker: JoinHandle<()>,
    hub: Arc<BroadcastHub>,
) {
    shutdown_signal().await;
    drain_pipeline(shutdown_tx, worker, hub).await;
}

/// Stop the processors, let the detector worker score what is still queued
/// and flush, and only then close every subscriber queue.
///
/// The alert log ends by itself once the worker drops its sender.
pub async fn drain_pipeline(
    shutdown_tx: ShutdownSender,
    worker: JoinHandle<()>,
    hub: Arc<BroadcastHub>,
) {
    // Receivers may already be gone if a processor exited early.
    let _ = shutdown_tx.send(true);
    if let Err(e) = worker.await {
        tracing::error!("detector worker task failed: {}", e);
    }
    hub.close_all();
}
