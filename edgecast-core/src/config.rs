//! Runtime configuration for the pipeline components.
//!
//! These types are validated and fixed at startup. Loading them from a file
//! is handled by the server crate; scorer specs deserialize directly from
//! the `[[detector.scorers]]` TOML tables.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How the detector runs its scorers against a record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationMode {
    Sequential,
    /// Fan scorers out over the rayon thread pool.
    #[default]
    Parallel,
}

/// Stream detector configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorConfig {
    /// Capacity of the ingest queue in front of the detector.
    pub buffer_capacity: usize,
    /// Records kept per matchup for history-aware scorers.
    pub history_window: usize,
    pub evaluation: EvaluationMode,
    pub scorers: Vec<ScorerSpec>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: 4096,
            history_window: 10,
            evaluation: EvaluationMode::default(),
            scorers: ScorerSpec::defaults(),
        }
    }
}

/// Broadcast hub configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct HubConfig {
    /// Outbound queue capacity per subscriber.
    pub queue_capacity: usize,
    /// Subscribers silent for longer than this are disconnected.
    pub heartbeat_timeout: Duration,
    /// How often idle subscribers are reaped.
    pub reap_interval: Duration,
    /// How often a metrics snapshot is published on the `metrics` channel.
    pub metrics_interval: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
            heartbeat_timeout: Duration::from_secs(60),
            reap_interval: Duration::from_secs(10),
            metrics_interval: Duration::from_secs(15),
        }
    }
}

fn default_threshold() -> f64 {
    0.5
}

fn default_min_margin() -> u8 {
    20
}

fn default_min_spread() -> f64 {
    3.0
}

fn default_min_excess() -> f64 {
    15.0
}

fn default_streak_length() -> usize {
    3
}

fn default_hit_rate() -> f64 {
    0.05
}

/// One registered scorer and its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScorerSpec {
    /// Final margin of at least `min_margin` points.
    Blowout {
        #[serde(default = "default_threshold")]
        threshold: f64,
        #[serde(default = "default_min_margin")]
        min_margin: u8,
    },
    /// The spread underdog won outright.
    Upset {
        #[serde(default = "default_threshold")]
        threshold: f64,
        #[serde(default = "default_min_spread")]
        min_spread: f64,
    },
    /// A rested side beat a side playing a back-to-back.
    RestEdge {
        #[serde(default = "default_threshold")]
        threshold: f64,
    },
    /// A revenge-flagged home side won.
    Revenge {
        #[serde(default = "default_threshold")]
        threshold: f64,
    },
    /// Combined score beat the total implied by season averages.
    Shootout {
        #[serde(default = "default_threshold")]
        threshold: f64,
        #[serde(default = "default_min_excess")]
        min_excess: f64,
    },
    /// One participant won `length` or more straight meetings of a matchup.
    Streak {
        #[serde(default = "default_threshold")]
        threshold: f64,
        #[serde(default = "default_streak_length")]
        length: usize,
    },
    /// Randomized exploratory scorer. Never part of the defaults.
    Experimental {
        #[serde(default = "default_threshold")]
        threshold: f64,
        #[serde(default = "default_hit_rate")]
        hit_rate: f64,
    },
}

impl ScorerSpec {
    /// The deterministic scorer set used when none is configured.
    pub fn defaults() -> Vec<ScorerSpec> {
        vec![
            ScorerSpec::Blowout {
                threshold: default_threshold(),
                min_margin: default_min_margin(),
            },
            ScorerSpec::Upset {
                threshold: default_threshold(),
                min_spread: default_min_spread(),
            },
            ScorerSpec::RestEdge {
                threshold: default_threshold(),
            },
            ScorerSpec::Revenge {
                threshold: default_threshold(),
            },
            ScorerSpec::Shootout {
                threshold: default_threshold(),
                min_excess: default_min_excess(),
            },
            ScorerSpec::Streak {
                threshold: default_threshold(),
                length: default_streak_length(),
            },
        ]
    }

    pub fn threshold(&self) -> f64 {
        match self {
            ScorerSpec::Blowout { threshold, .. }
            | ScorerSpec::Upset { threshold, .. }
            | ScorerSpec::RestEdge { threshold }
            | ScorerSpec::Revenge { threshold }
            | ScorerSpec::Shootout { threshold, .. }
            | ScorerSpec::Streak { threshold, .. }
            | ScorerSpec::Experimental { threshold, .. } => *threshold,
        }
    }

    pub fn is_experimental(&self) -> bool {
        matches!(self, ScorerSpec::Experimental { .. })
    }
}
