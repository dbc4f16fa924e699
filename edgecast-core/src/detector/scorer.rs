//! The scorer contract and registry.

use compact_str::CompactString;
use tracing::warn;

use super::history::MatchupHistory;
use super::scorers;
use crate::config::ScorerSpec;
use crate::encoder::CompactRecord;

/// Result of evaluating one scorer against one record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreOutcome {
    pub matched: bool,
    pub confidence: f64,
    pub expected_roi: f64,
}

impl ScoreOutcome {
    pub const fn miss() -> Self {
        Self {
            matched: false,
            confidence: 0.0,
            expected_roi: 0.0,
        }
    }

    /// A match at `confidence`, priced at standard -110 odds.
    pub fn hit(confidence: f64) -> Self {
        Self {
            matched: true,
            confidence,
            expected_roi: expected_roi(confidence),
        }
    }

    /// Whether this outcome should produce an alert under `threshold`.
    /// Non-finite confidences never qualify.
    pub fn qualifies(&self, threshold: f64) -> bool {
        self.matched && self.confidence.is_finite() && self.confidence >= threshold
    }
}

/// Expected return per unit staked at -110 given a win probability.
pub fn expected_roi(confidence: f64) -> f64 {
    const PAYOUT: f64 = 100.0 / 110.0;
    confidence * PAYOUT - (1.0 - confidence)
}

/// A named pattern evaluated against each compact record.
///
/// Implementations must be pure: the outcome depends only on the record
/// and the matchup history passed in, never on other scorers or on hidden
/// state, so scorers can run in any order or in parallel.
pub trait PatternScorer: Send + Sync {
    fn name(&self) -> &str;

    /// Minimum confidence for a match to become an alert.
    fn threshold(&self) -> f64;

    /// Evaluate `record`. `history` holds earlier records of the same
    /// matchup, oldest first, and does not yet include `record`.
    fn score(&self, record: &CompactRecord, history: &MatchupHistory) -> ScoreOutcome;

    /// Report a pattern still open when the stream ends. Called once per
    /// matchup from [`StreamDetector::flush`](super::StreamDetector::flush).
    fn finish(&self, _history: &MatchupHistory) -> Option<ScoreOutcome> {
        None
    }
}

/// The detector's scorers, fixed at construction.
#[derive(Default)]
pub struct ScorerRegistry {
    scorers: Vec<Box<dyn PatternScorer>>,
}

impl ScorerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, scorer: impl PatternScorer + 'static) -> Self {
        self.register(Box::new(scorer));
        self
    }

    /// Build every scorer named in `specs`.
    pub fn from_specs(specs: &[ScorerSpec]) -> Self {
        let mut registry = Self::new();
        for spec in specs {
            registry.register(scorers::build(spec));
        }
        registry
    }

    fn register(&mut self, scorer: Box<dyn PatternScorer>) {
        if self.scorers.iter().any(|s| s.name() == scorer.name()) {
            warn!(scorer = scorer.name(), "Registering a second scorer with the same name");
        }
        self.scorers.push(scorer);
    }

    pub fn scorers(&self) -> &[Box<dyn PatternScorer>] {
        &self.scorers
    }

    pub fn names(&self) -> Vec<CompactString> {
        self.scorers.iter().map(|s| CompactString::from(s.name())).collect()
    }

    pub fn len(&self) -> usize {
        self.scorers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scorers.is_empty()
    }
}

impl std::fmt::Debug for ScorerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.scorers.iter().map(|s| s.name()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_roi_break_even() {
        // -110 breaks even at 110/210.
        assert!(expected_roi(110.0 / 210.0).abs() < 1e-12);
        assert!(expected_roi(0.6) > 0.0);
        assert!(expected_roi(0.5) < 0.0);
    }

    #[test]
    fn test_qualifies_rejects_non_finite() {
        assert!(ScoreOutcome::hit(0.7).qualifies(0.5));
        assert!(!ScoreOutcome::hit(0.4).qualifies(0.5));
        assert!(!ScoreOutcome::hit(f64::NAN).qualifies(0.0));
        assert!(!ScoreOutcome::miss().qualifies(0.0));
    }

    #[test]
    fn test_registry_from_default_specs() {
        let registry = ScorerRegistry::from_specs(&ScorerSpec::defaults());
        assert_eq!(
            registry.names(),
            vec!["blowout", "upset", "rest_edge", "revenge", "shootout", "streak"]
        );
    }
}
