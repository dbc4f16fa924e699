//! Lock-free detector counters.

use edgecast_sdk::objects::DetectorStats;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Aggregate detector metrics. Updated with relaxed atomics from the ingest
/// path and read by the metrics reporter.
#[derive(Debug, Default)]
pub struct DetectorMetrics {
    records_processed: AtomicU64,
    alerts_emitted: AtomicU64,
    latency_nanos: AtomicU64,
    scorer_faults: AtomicU64,
}

impl DetectorMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_ingest(&self, elapsed: Duration, alerts: usize) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.records_processed.fetch_add(1, Ordering::Relaxed);
        self.latency_nanos.fetch_add(nanos, Ordering::Relaxed);
        self.add_alerts(alerts);
    }

    pub(crate) fn add_alerts(&self, alerts: usize) {
        if alerts > 0 {
            self.alerts_emitted
                .fetch_add(alerts as u64, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_scorer_fault(&self) {
        self.scorer_faults.fetch_add(1, Ordering::Relaxed);
    }

    pub fn records_processed(&self) -> u64 {
        self.records_processed.load(Ordering::Relaxed)
    }

    pub fn alerts_emitted(&self) -> u64 {
        self.alerts_emitted.load(Ordering::Relaxed)
    }

    pub fn scorer_faults(&self) -> u64 {
        self.scorer_faults.load(Ordering::Relaxed)
    }

    /// Mean scoring time per record.
    pub fn average_latency(&self) -> Duration {
        let records = self.records_processed();
        if records == 0 {
            return Duration::ZERO;
        }
        Duration::from_nanos(self.latency_nanos.load(Ordering::Relaxed) / records)
    }

    /// Snapshot for reporting. Queue figures come from the ingest queue.
    pub fn snapshot(&self, queue_depth: usize, ingest_dropped: u64) -> DetectorStats {
        DetectorStats {
            records_processed: self.records_processed(),
            alerts_emitted: self.alerts_emitted(),
            avg_latency_us: self.average_latency().as_secs_f64() * 1e6,
            ingest_dropped,
            scorer_faults: self.scorer_faults(),
            queue_depth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_latency() {
        let metrics = DetectorMetrics::new();
        assert_eq!(metrics.average_latency(), Duration::ZERO);
        metrics.record_ingest(Duration::from_micros(10), 0);
        metrics.record_ingest(Duration::from_micros(30), 2);
        assert_eq!(metrics.average_latency(), Duration::from_micros(20));
        assert_eq!(metrics.alerts_emitted(), 2);

        let stats = metrics.snapshot(5, 1);
        assert_eq!(stats.records_processed, 2);
        assert_eq!(stats.queue_depth, 5);
        assert!((stats.avg_latency_us - 20.0).abs() < 1e-6);
    }
}
