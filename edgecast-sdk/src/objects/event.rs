//! Canonical game events.
//!
//! A [`CanonicalEvent`] is the authoritative record of one completed game as
//! produced by an upstream collector. It is immutable once produced; the
//! pipeline only ever reads it.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Sports known to the pipeline.
pub enum Sport {
    Nba,
    Nfl,
    Mlb,
    Nhl,
    Ncaab,
    Ncaaf,
    Soccer,
    #[serde(other)]
    Unknown,
}

impl Sport {
    /// Four-bit code used by the compact encoding. `0xF` is reserved for
    /// [`Sport::Unknown`].
    pub const fn code(self) -> u8 {
        match self {
            Sport::Nba => 0,
            Sport::Nfl => 1,
            Sport::Mlb => 2,
            Sport::Nhl => 3,
            Sport::Ncaab => 4,
            Sport::Ncaaf => 5,
            Sport::Soccer => 6,
            Sport::Unknown => 0xF,
        }
    }

    pub const fn from_code(code: u8) -> Self {
        match code {
            0 => Sport::Nba,
            1 => Sport::Nfl,
            2 => Sport::Mlb,
            3 => Sport::Nhl,
            4 => Sport::Ncaab,
            5 => Sport::Ncaaf,
            6 => Sport::Soccer,
            _ => Sport::Unknown,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Sport::Nba => "nba",
            Sport::Nfl => "nfl",
            Sport::Mlb => "mlb",
            Sport::Nhl => "nhl",
            Sport::Ncaab => "ncaab",
            Sport::Ncaaf => "ncaaf",
            Sport::Soccer => "soccer",
            Sport::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Sport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rolling statistics for one participant, precomputed by the collector.
///
/// Every field is optional; a missing value is encoded as a sentinel rather
/// than rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ParticipantStats {
    /// Average points scored per game.
    #[serde(default)]
    pub scoring_avg: Option<f64>,
    /// Average points allowed per game.
    #[serde(default)]
    pub allowed_avg: Option<f64>,
    /// Possessions (or plays) per game.
    #[serde(default)]
    pub pace: Option<f64>,
    /// Win rate over the recent window, in `[0, 1]`.
    #[serde(default)]
    pub win_rate: Option<f64>,
}

/// Situational flags attached to a game.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SituationalFlags {
    #[serde(default)]
    pub home_back_to_back: bool,
    #[serde(default)]
    pub away_back_to_back: bool,
    #[serde(default)]
    pub rivalry: bool,
    /// The home side lost the previous meeting.
    #[serde(default)]
    pub revenge: bool,
}

/// One completed game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalEvent {
    pub sport: Sport,
    pub home_id: u32,
    pub away_id: u32,
    /// Scheduled start, unix seconds.
    pub start_time: i64,
    #[serde(default)]
    pub venue_id: Option<u32>,
    pub home_score: i32,
    pub away_score: i32,
    #[serde(default)]
    pub home_stats: ParticipantStats,
    #[serde(default)]
    pub away_stats: ParticipantStats,
    #[serde(default)]
    pub flags: SituationalFlags,
    /// Game-time temperature in °F, for outdoor venues.
    #[serde(default)]
    pub temperature_f: Option<f64>,
    /// Closing point spread from the home side's perspective
    /// (negative means the home side was favoured).
    #[serde(default)]
    pub spread: Option<f64>,
}

impl CanonicalEvent {
    /// Final margin from the home side's perspective.
    pub fn margin(&self) -> i64 {
        i64::from(self.home_score) - i64::from(self.away_score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sport_code_roundtrip() {
        for sport in [
            Sport::Nba,
            Sport::Nfl,
            Sport::Mlb,
            Sport::Nhl,
            Sport::Ncaab,
            Sport::Ncaaf,
            Sport::Soccer,
            Sport::Unknown,
        ] {
            assert_eq!(Sport::from_code(sport.code()), sport);
        }
        assert_eq!(Sport::from_code(9), Sport::Unknown);
    }

    #[test]
    fn test_minimal_event_parsing() {
        let json = r#"{
            "sport": "nba",
            "home_id": 1610612747,
            "away_id": 1610612738,
            "start_time": 1700000000,
            "home_score": 112,
            "away_score": 104
        }"#;
        let event: CanonicalEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.sport, Sport::Nba);
        assert_eq!(event.margin(), 8);
        assert_eq!(event.venue_id, None);
        assert_eq!(event.home_stats, ParticipantStats::default());
        assert!(!event.flags.rivalry);
    }

    #[test]
    fn test_unrecognised_sport_is_unknown() {
        let json = r#"{
            "sport": "cricket",
            "home_id": 1,
            "away_id": 2,
            "start_time": 0,
            "home_score": 0,
            "away_score": 0
        }"#;
        let event: CanonicalEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.sport, Sport::Unknown);
    }
}
