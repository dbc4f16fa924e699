//! Pipeline metrics snapshot, served on `GET /metrics` and published on the
//! `metrics` channel.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub encoder: EncoderStats,
    pub detector: DetectorStats,
    pub hub: HubStats,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderStats {
    pub encoded: u64,
    /// Fields clamped to their representable range.
    pub clamped: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectorStats {
    pub records_processed: u64,
    pub alerts_emitted: u64,
    /// Mean time spent scoring one record, in microseconds.
    pub avg_latency_us: f64,
    /// Records dropped by the ingest queue.
    pub ingest_dropped: u64,
    /// Scorer invocations that panicked.
    pub scorer_faults: u64,
    /// Records currently waiting in the ingest queue.
    pub queue_depth: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubStats {
    pub subscribers: usize,
    pub channels: usize,
    pub published: u64,
    pub delivered: u64,
    pub evicted: u64,
    pub dropped: u64,
}
