//! Alerts produced by the stream detector.

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::event::Sport;

/// A scorer match that cleared its confidence threshold.
///
/// Alerts are immutable. A corrected or repeated determination produces a
/// new alert with a new `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    /// Name of the scorer that matched.
    pub scorer: CompactString,
    /// Identifier of the originating game.
    pub event_id: CompactString,
    /// Matchup key the game belongs to (`{sport}:{low_id}-{high_id}`).
    pub matchup: CompactString,
    pub confidence: f64,
    pub expected_roi: f64,
    /// Creation time, unix milliseconds.
    pub created_at: i64,
    /// Decoded view of the game, for display.
    pub game: GameSummary,
}

/// Approximate game summary recovered from the compact encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSummary {
    pub sport: Sport,
    pub home_id: u32,
    pub away_id: u32,
    pub start_time: i64,
    pub home_score: u8,
    pub away_score: u8,
    pub margin: i16,
    pub spread: Option<f64>,
}

/// Current wall-clock time in unix milliseconds.
pub fn unix_millis_now() -> i64 {
    let now = time::OffsetDateTime::now_utc();
    (now.unix_timestamp_nanos() / 1_000_000) as i64
}
