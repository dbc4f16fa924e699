//! Stream detector: runs pattern scorers over compact records.

mod history;
mod metrics;
mod queue;
mod scorer;
pub mod scorers;

pub use history::{HistoryStore, MatchupHistory, MatchupKey};
pub use metrics::DetectorMetrics;
pub use queue::{IngestOutcome, IngestQueue};
pub use scorer::{PatternScorer, ScoreOutcome, ScorerRegistry, expected_roi};

use edgecast_sdk::objects::Alert;
use edgecast_sdk::objects::alert::unix_millis_now;
use rayon::prelude::*;
use smallvec::SmallVec;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::{DetectorConfig, EvaluationMode};
use crate::encoder::{CompactRecord, summarize};

/// Alerts produced by one record. Most records produce none or one.
pub type Alerts = SmallVec<[Alert; 2]>;

pub struct StreamDetector {
    registry: ScorerRegistry,
    history: HistoryStore,
    mode: EvaluationMode,
    metrics: Arc<DetectorMetrics>,
}

impl StreamDetector {
    pub fn new(registry: ScorerRegistry, config: &DetectorConfig) -> Self {
        Self {
            registry,
            history: HistoryStore::new(config.history_window),
            mode: config.evaluation,
            metrics: Arc::new(DetectorMetrics::new()),
        }
    }

    /// Build the scorers named in `config`.
    pub fn from_config(config: &DetectorConfig) -> Self {
        Self::new(ScorerRegistry::from_specs(&config.scorers), config)
    }

    pub fn metrics(&self) -> Arc<DetectorMetrics> {
        self.metrics.clone()
    }

    pub fn registry(&self) -> &ScorerRegistry {
        &self.registry
    }

    pub fn mode(&self) -> EvaluationMode {
        self.mode
    }

    /// Number of matchups with live history.
    pub fn tracked_matchups(&self) -> usize {
        self.history.len()
    }

    /// Score one record and fold it into its matchup history.
    pub fn ingest(&mut self, record: CompactRecord) -> Alerts {
        let started = Instant::now();
        let key = MatchupKey::of(&record);
        let history = self.history.window_mut(key);
        let view: &MatchupHistory = history;

        let outcomes = match self.mode {
            EvaluationMode::Sequential => self
                .registry
                .scorers()
                .iter()
                .map(|s| guarded_score(s.as_ref(), &record, view, &self.metrics))
                .collect::<Vec<_>>(),
            EvaluationMode::Parallel => self
                .registry
                .scorers()
                .par_iter()
                .map(|s| guarded_score(s.as_ref(), &record, view, &self.metrics))
                .collect::<Vec<_>>(),
        };

        let alerts: Alerts = self
            .registry
            .scorers()
            .iter()
            .zip(outcomes)
            .filter_map(|(scorer, outcome)| {
                let outcome = outcome?;
                outcome
                    .qualifies(scorer.threshold())
                    .then(|| build_alert(scorer.name(), &record, key, outcome))
            })
            .collect();

        history.push(record);
        self.metrics.record_ingest(started.elapsed(), alerts.len());
        if !alerts.is_empty() {
            debug!(matchup = %key, alerts = alerts.len(), "Record produced alerts");
        }
        alerts
    }

    /// End of stream. Scorers report patterns still open in each matchup,
    /// then all history is discarded.
    pub fn flush(&mut self) -> Alerts {
        let mut alerts = Alerts::new();
        for (key, history) in self.history.drain() {
            let Some(latest) = history.latest().copied() else {
                continue;
            };
            for scorer in self.registry.scorers() {
                let finished =
                    panic::catch_unwind(AssertUnwindSafe(|| scorer.finish(&history)));
                match finished {
                    Ok(Some(outcome)) if outcome.qualifies(scorer.threshold()) => {
                        alerts.push(build_alert(scorer.name(), &latest, key, outcome));
                    }
                    Ok(_) => {}
                    Err(_) => {
                        self.metrics.record_scorer_fault();
                        warn!(scorer = scorer.name(), matchup = %key, "Scorer panicked while finishing");
                    }
                }
            }
        }
        self.metrics.add_alerts(alerts.len());
        debug!(alerts = alerts.len(), "Detector flushed");
        alerts
    }
}

impl std::fmt::Debug for StreamDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamDetector")
            .field("registry", &self.registry)
            .field("mode", &self.mode)
            .field("matchups", &self.history.len())
            .finish()
    }
}

/// A panicking scorer counts as a fault and a miss.
fn guarded_score(
    scorer: &dyn PatternScorer,
    record: &CompactRecord,
    history: &MatchupHistory,
    metrics: &DetectorMetrics,
) -> Option<ScoreOutcome> {
    match panic::catch_unwind(AssertUnwindSafe(|| scorer.score(record, history))) {
        Ok(outcome) => Some(outcome),
        Err(_) => {
            metrics.record_scorer_fault();
            warn!(scorer = scorer.name(), "Scorer panicked, treating as no match");
            None
        }
    }
}

fn build_alert(
    scorer: &str,
    record: &CompactRecord,
    key: MatchupKey,
    outcome: ScoreOutcome,
) -> Alert {
    Alert {
        id: Uuid::now_v7(),
        scorer: scorer.into(),
        event_id: record.event_id(),
        matchup: key.to_compact(),
        confidence: outcome.confidence,
        expected_roi: outcome.expected_roi,
        created_at: unix_millis_now(),
        game: summarize(record),
    }
}
