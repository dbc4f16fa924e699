//! Built-in scorers.
//!
//! All of them are deterministic functions of the record and, for
//! [`StreakScorer`], the matchup history. [`ExperimentalScorer`] draws from
//! a random generator seeded by the record bytes, so even it is
//! reproducible, but it is only registered when explicitly configured.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::history::MatchupHistory;
use super::scorer::{PatternScorer, ScoreOutcome};
use crate::config::ScorerSpec;
use crate::encoder::{CompactRecord, RecordFlags, Side};

pub(crate) fn build(spec: &ScorerSpec) -> Box<dyn PatternScorer> {
    match *spec {
        ScorerSpec::Blowout {
            threshold,
            min_margin,
        } => Box::new(BlowoutScorer::new(min_margin, threshold)),
        ScorerSpec::Upset {
            threshold,
            min_spread,
        } => Box::new(UpsetScorer {
            min_spread,
            threshold,
        }),
        ScorerSpec::RestEdge { threshold } => Box::new(RestEdgeScorer { threshold }),
        ScorerSpec::Revenge { threshold } => Box::new(RevengeScorer { threshold }),
        ScorerSpec::Shootout {
            threshold,
            min_excess,
        } => Box::new(ShootoutScorer {
            min_excess,
            threshold,
        }),
        ScorerSpec::Streak { threshold, length } => {
            Box::new(StreakScorer::new(length, threshold))
        }
        ScorerSpec::Experimental {
            threshold,
            hit_rate,
        } => Box::new(ExperimentalScorer {
            hit_rate,
            threshold,
        }),
    }
}

/// Final margin of at least `min_margin` points, either way.
///
/// Confidence starts at 0.5 on the boundary and reaches 1.0 at twice the
/// minimum margin.
#[derive(Debug, Clone)]
pub struct BlowoutScorer {
    min_margin: u8,
    threshold: f64,
}

impl BlowoutScorer {
    pub fn new(min_margin: u8, threshold: f64) -> Self {
        Self {
            min_margin: min_margin.max(1),
            threshold,
        }
    }
}

impl PatternScorer for BlowoutScorer {
    fn name(&self) -> &str {
        "blowout"
    }

    fn threshold(&self) -> f64 {
        self.threshold
    }

    fn score(&self, record: &CompactRecord, _history: &MatchupHistory) -> ScoreOutcome {
        let margin = record.margin().unsigned_abs();
        let min = u16::from(self.min_margin);
        if margin < min {
            return ScoreOutcome::miss();
        }
        let overshoot = f64::from(margin - min) / f64::from(min);
        ScoreOutcome::hit(0.5 + 0.5 * overshoot.min(1.0))
    }
}

/// The side the spread made an underdog of at least `min_spread` points
/// won outright.
#[derive(Debug, Clone)]
pub struct UpsetScorer {
    min_spread: f64,
    threshold: f64,
}

impl PatternScorer for UpsetScorer {
    fn name(&self) -> &str {
        "upset"
    }

    fn threshold(&self) -> f64 {
        self.threshold
    }

    fn score(&self, record: &CompactRecord, _history: &MatchupHistory) -> ScoreOutcome {
        let Some(spread) = record.spread() else {
            return ScoreOutcome::miss();
        };
        if spread.abs() < self.min_spread || spread == 0.0 {
            return ScoreOutcome::miss();
        }
        // Negative spread: home favoured, so the away side is the underdog.
        let underdog = if spread < 0.0 { Side::Away } else { Side::Home };
        if record.winner() != Some(underdog) {
            return ScoreOutcome::miss();
        }
        ScoreOutcome::hit((0.5 + spread.abs() / 20.0).min(0.95))
    }
}

/// Exactly one side played a back-to-back, and the rested side won.
#[derive(Debug, Clone)]
pub struct RestEdgeScorer {
    threshold: f64,
}

impl PatternScorer for RestEdgeScorer {
    fn name(&self) -> &str {
        "rest_edge"
    }

    fn threshold(&self) -> f64 {
        self.threshold
    }

    fn score(&self, record: &CompactRecord, _history: &MatchupHistory) -> ScoreOutcome {
        let flags = record.flags();
        let (rested, tired) = match (
            flags.contains(RecordFlags::HOME_BACK_TO_BACK),
            flags.contains(RecordFlags::AWAY_BACK_TO_BACK),
        ) {
            (false, true) => (Side::Home, Side::Away),
            (true, false) => (Side::Away, Side::Home),
            _ => return ScoreOutcome::miss(),
        };
        if record.winner() != Some(rested) {
            return ScoreOutcome::miss();
        }
        let form_gap = match (record.win_rate(rested), record.win_rate(tired)) {
            (Some(r), Some(t)) => (r - t).max(0.0),
            _ => 0.0,
        };
        ScoreOutcome::hit((0.55 + 0.4 * form_gap).min(0.9))
    }
}

/// A home side flagged as seeking revenge won.
#[derive(Debug, Clone)]
pub struct RevengeScorer {
    threshold: f64,
}

impl PatternScorer for RevengeScorer {
    fn name(&self) -> &str {
        "revenge"
    }

    fn threshold(&self) -> f64 {
        self.threshold
    }

    fn score(&self, record: &CompactRecord, _history: &MatchupHistory) -> ScoreOutcome {
        let flags = record.flags();
        if !flags.contains(RecordFlags::REVENGE) || record.winner() != Some(Side::Home) {
            return ScoreOutcome::miss();
        }
        let rivalry = if flags.contains(RecordFlags::RIVALRY) {
            0.1
        } else {
            0.0
        };
        let margin = (f64::from(record.margin()) / 50.0).min(0.2);
        ScoreOutcome::hit(0.55 + rivalry + margin)
    }
}

/// Combined score beat the total implied by both sides' averages by at
/// least `min_excess` points.
#[derive(Debug, Clone)]
pub struct ShootoutScorer {
    min_excess: f64,
    threshold: f64,
}

impl PatternScorer for ShootoutScorer {
    fn name(&self) -> &str {
        "shootout"
    }

    fn threshold(&self) -> f64 {
        self.threshold
    }

    fn score(&self, record: &CompactRecord, _history: &MatchupHistory) -> ScoreOutcome {
        let (Some(hs), Some(ha), Some(as_), Some(aa)) = (
            record.scoring_avg(Side::Home),
            record.allowed_avg(Side::Home),
            record.scoring_avg(Side::Away),
            record.allowed_avg(Side::Away),
        ) else {
            return ScoreOutcome::miss();
        };
        let implied = (hs + aa) / 2.0 + (as_ + ha) / 2.0;
        if implied <= 0.0 {
            return ScoreOutcome::miss();
        }
        let total = f64::from(record.home_score()) + f64::from(record.away_score());
        let excess = total - implied;
        if excess < self.min_excess {
            return ScoreOutcome::miss();
        }
        ScoreOutcome::hit(0.5 + (excess / implied).min(0.45))
    }
}

/// A participant's run of `length` or more straight wins in a matchup.
///
/// Fires when a qualifying run is snapped by the current game, and from
/// [`finish`](PatternScorer::finish) for runs still open at stream end.
#[derive(Debug, Clone)]
pub struct StreakScorer {
    length: usize,
    threshold: f64,
}

impl StreakScorer {
    pub fn new(length: usize, threshold: f64) -> Self {
        Self {
            length: length.max(2),
            threshold,
        }
    }

    fn confidence(&self, run: usize) -> f64 {
        (0.6 + 0.05 * (run - self.length) as f64).min(0.95)
    }
}

impl PatternScorer for StreakScorer {
    fn name(&self) -> &str {
        "streak"
    }

    fn threshold(&self) -> f64 {
        self.threshold
    }

    fn score(&self, record: &CompactRecord, history: &MatchupHistory) -> ScoreOutcome {
        let Some((owner, run)) = history.winning_run() else {
            return ScoreOutcome::miss();
        };
        if run < self.length {
            return ScoreOutcome::miss();
        }
        let winner = record.winner().map(|side| record.participant(side));
        if winner == Some(owner) {
            return ScoreOutcome::miss();
        }
        ScoreOutcome::hit(self.confidence(run))
    }

    fn finish(&self, history: &MatchupHistory) -> Option<ScoreOutcome> {
        let (_, run) = history.winning_run()?;
        (run >= self.length).then(|| ScoreOutcome::hit(self.confidence(run)))
    }
}

/// Randomized exploratory scorer.
///
/// Matches with probability `hit_rate` and a uniform confidence in
/// `[0.5, 1.0)`. The generator is seeded from the record bytes, so the
/// same record always scores the same.
#[derive(Debug, Clone)]
pub struct ExperimentalScorer {
    hit_rate: f64,
    threshold: f64,
}

impl PatternScorer for ExperimentalScorer {
    fn name(&self) -> &str {
        "experimental"
    }

    fn threshold(&self) -> f64 {
        self.threshold
    }

    fn score(&self, record: &CompactRecord, _history: &MatchupHistory) -> ScoreOutcome {
        let mut rng = StdRng::seed_from_u64(fnv1a(record.as_bytes()));
        let hit_rate = if self.hit_rate.is_finite() {
            self.hit_rate.clamp(0.0, 1.0)
        } else {
            0.0
        };
        if !rng.random_bool(hit_rate) {
            return ScoreOutcome::miss();
        }
        ScoreOutcome::hit(rng.random_range(0.5..1.0))
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325, |hash, &b| {
        (hash ^ u64::from(b)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}
