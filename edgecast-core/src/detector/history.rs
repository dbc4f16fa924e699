//! Per-matchup rolling history.
//!
//! History is partitioned by [`MatchupKey`] and owned by the detector, which
//! is the only writer. Scorers receive a shared reference to one matchup's
//! window and never see other keys.

use compact_str::{CompactString, format_compact};
use edgecast_sdk::objects::Sport;
use std::collections::{HashMap, VecDeque};

use crate::encoder::CompactRecord;

/// Unordered pair of participants within a sport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MatchupKey {
    pub sport: Sport,
    pub low: u32,
    pub high: u32,
}

impl MatchupKey {
    pub fn of(record: &CompactRecord) -> Self {
        let (a, b) = (record.home_id(), record.away_id());
        Self {
            sport: record.sport(),
            low: a.min(b),
            high: a.max(b),
        }
    }

    pub fn to_compact(self) -> CompactString {
        format_compact!("{}:{}-{}", self.sport, self.low, self.high)
    }
}

impl std::fmt::Display for MatchupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}-{}", self.sport, self.low, self.high)
    }
}

/// The last `window` records of one matchup, oldest first.
#[derive(Debug, Clone)]
pub struct MatchupHistory {
    records: VecDeque<CompactRecord>,
    window: usize,
}

impl MatchupHistory {
    pub fn new(window: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(window),
            window,
        }
    }

    pub fn push(&mut self, record: CompactRecord) {
        if self.window == 0 {
            return;
        }
        if self.records.len() == self.window {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    pub fn latest(&self) -> Option<&CompactRecord> {
        self.records.back()
    }

    /// Most recent first.
    pub fn iter_recent(&self) -> impl Iterator<Item = &CompactRecord> {
        self.records.iter().rev()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Trailing run of wins by the same participant: `(winner, length)`.
    ///
    /// A tie ends the run.
    pub fn winning_run(&self) -> Option<(u32, usize)> {
        let mut recent = self.iter_recent();
        let first = recent.next()?;
        let owner = first.winner().map(|side| first.participant(side))?;
        let extra = recent
            .take_while(|r| r.winner().map(|side| r.participant(side)) == Some(owner))
            .count();
        Some((owner, 1 + extra))
    }
}

/// All matchup windows.
#[derive(Debug)]
pub struct HistoryStore {
    windows: HashMap<MatchupKey, MatchupHistory>,
    window: usize,
}

impl HistoryStore {
    pub fn new(window: usize) -> Self {
        Self {
            windows: HashMap::new(),
            window,
        }
    }

    /// The window for `key`, created empty on first use.
    pub fn window_mut(&mut self, key: MatchupKey) -> &mut MatchupHistory {
        let window = self.window;
        self.windows
            .entry(key)
            .or_insert_with(|| MatchupHistory::new(window))
    }

    pub fn get(&self, key: &MatchupKey) -> Option<&MatchupHistory> {
        self.windows.get(key)
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Remove and return every window.
    pub fn drain(&mut self) -> impl Iterator<Item = (MatchupKey, MatchupHistory)> + '_ {
        self.windows.drain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::Encoder;
    use edgecast_sdk::objects::CanonicalEvent;

    fn game(home: u32, away: u32, home_score: i32, away_score: i32) -> CompactRecord {
        Encoder::new().encode(&CanonicalEvent {
            sport: Sport::Nfl,
            home_id: home,
            away_id: away,
            start_time: 1_700_000_000,
            venue_id: None,
            home_score,
            away_score,
            home_stats: Default::default(),
            away_stats: Default::default(),
            flags: Default::default(),
            temperature_f: None,
            spread: None,
        })
    }

    #[test]
    fn test_key_is_order_independent() {
        assert_eq!(MatchupKey::of(&game(7, 3, 1, 0)), MatchupKey::of(&game(3, 7, 1, 0)));
        assert_eq!(MatchupKey::of(&game(7, 3, 1, 0)).to_compact(), "nfl:3-7");
    }

    #[test]
    fn test_window_is_bounded() {
        let mut history = MatchupHistory::new(2);
        history.push(game(1, 2, 10, 0));
        history.push(game(1, 2, 20, 0));
        history.push(game(1, 2, 30, 0));
        assert_eq!(history.len(), 2);
        assert_eq!(history.latest().map(|r| r.home_score()), Some(30));
    }

    #[test]
    fn test_winning_run_follows_participant_across_venues() {
        let mut history = MatchupHistory::new(10);
        history.push(game(2, 1, 30, 10)); // 2 wins
        history.push(game(1, 2, 14, 21)); // 2 wins on the road
        history.push(game(2, 1, 24, 17)); // 2 wins
        assert_eq!(history.winning_run(), Some((2, 3)));

        history.push(game(1, 2, 20, 20)); // tie breaks the run
        assert_eq!(history.winning_run(), None);
    }
}
