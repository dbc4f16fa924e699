//! AlertLog processor.
//!
//! Appends every alert it receives to a JSON-lines file. It is fed through a
//! bounded channel with `try_send`, so a slow disk loses log lines instead
//! of slowing the detector.
//!
//! The log does not watch the shutdown signal. It runs until every sender is
//! dropped, which happens once the `DetectorWorker` has drained and flushed.

use edgecast_sdk::objects::Alert;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{error, info};

use crate::events::AlertLogReceiver;

#[derive(Debug, Error)]
pub enum AlertLogError {
    #[error("alert log I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("alert serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub struct AlertLog {
    path: PathBuf,
    writer: BufWriter<File>,
    alert_rx: AlertLogReceiver,
    written: u64,
}

impl AlertLog {
    /// Open `path` for appending, creating it if needed.
    pub async fn open(
        path: impl AsRef<Path>,
        alert_rx: AlertLogReceiver,
    ) -> Result<Self, AlertLogError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
            alert_rx,
            written: 0,
        })
    }

    pub async fn run(mut self) {
        info!(path = %self.path.display(), "AlertLog started");

        while let Some(alert) = self.alert_rx.recv().await {
            if let Err(e) = self.append(&alert).await {
                error!(alert = %alert.id, error = %e, "Failed to append alert");
            }
        }

        if let Err(e) = self.writer.flush().await {
            error!(error = %e, "Failed to flush alert log");
        }

        info!(written = self.written, "AlertLog shutdown complete");
    }

    async fn append(&mut self, alert: &Alert) -> Result<(), AlertLogError> {
        let mut line = serde_json::to_vec(alert)?;
        line.push(b'\n');
        self.writer.write_all(&line).await?;
        if self.alert_rx.is_empty() {
            self.writer.flush().await?;
        }
        self.written += 1;
        Ok(())
    }
}
