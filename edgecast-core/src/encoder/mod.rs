//! Canonical event → compact record encoding.
//!
//! Encoding is total and O(1): every event maps to exactly one 32-byte
//! record, no heap allocation happens, and out-of-range values are clamped
//! rather than rejected. Clamps are counted so data quality problems show
//! up in metrics instead of as failures.
//!
//! Decoding is for diagnostics and alert payloads only; scorers read fields
//! straight from [`CompactRecord`].

mod quantize;
mod record;

pub use record::{CompactRecord, LAYOUT_VERSION, RECORD_LEN, RecordFlags, START_EPOCH, Side};

use edgecast_sdk::objects::{
    CanonicalEvent, EncoderStats, GameSummary, ParticipantStats, SituationalFlags,
};
use record::{RecordWriter, offset, scale};
use std::sync::atomic::{AtomicU64, Ordering};

/// The decoded, approximate form of a [`CompactRecord`].
///
/// Every field is within its quantization tolerance of the original event.
pub type ApproximateEvent = CanonicalEvent;

/// Stateless encoder with observability counters.
#[derive(Debug, Default)]
pub struct Encoder {
    encoded: AtomicU64,
    clamped: AtomicU64,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode one event. Never fails.
    pub fn encode(&self, event: &CanonicalEvent) -> CompactRecord {
        let mut w = RecordWriter::new();
        let mut clamps = 0u64;
        let mut count = |clamped: bool| clamps += u64::from(clamped);

        w.put_u8(
            offset::HEADER,
            (LAYOUT_VERSION << 4) | (event.sport.code() & 0x0F),
        );
        w.put_u8(offset::FLAGS, pack_flags(&event.flags).bits());
        w.put_u32(offset::HOME_ID, event.home_id);
        w.put_u32(offset::AWAY_ID, event.away_id);

        let (start, c) = quantize::clamp_int(
            event.start_time.saturating_sub(START_EPOCH),
            0,
            i64::from(u32::MAX),
        );
        count(c);
        w.put_u32(offset::START, start as u32);

        let venue = match event.venue_id {
            None => scale::VENUE_NONE,
            Some(id) => {
                let (v, c) = quantize::clamp_int(i64::from(id), 0, scale::VENUE_MAX);
                count(c);
                v as u16
            }
        };
        w.put_u16(offset::VENUE, venue);

        let (home_score, c) = quantize::clamp_int(i64::from(event.home_score), 0, 255);
        count(c);
        w.put_u8(offset::HOME_SCORE, home_score as u8);
        let (away_score, c) = quantize::clamp_int(i64::from(event.away_score), 0, 255);
        count(c);
        w.put_u8(offset::AWAY_SCORE, away_score as u8);

        let sides = [
            (
                &event.home_stats,
                offset::HOME_SCORING_AVG,
                offset::HOME_ALLOWED_AVG,
                offset::HOME_PACE,
                offset::HOME_WIN_RATE,
            ),
            (
                &event.away_stats,
                offset::AWAY_SCORING_AVG,
                offset::AWAY_ALLOWED_AVG,
                offset::AWAY_PACE,
                offset::AWAY_WIN_RATE,
            ),
        ];
        for (stats, scoring_at, allowed_at, pace_at, win_rate_at) in sides {
            let (v, c) = quantize::unsigned(
                stats.scoring_avg,
                scale::AVERAGE,
                scale::AVERAGE_MAX,
                scale::AVERAGE_NONE,
            );
            count(c);
            w.put_u16(scoring_at, v as u16);

            let (v, c) = quantize::unsigned(
                stats.allowed_avg,
                scale::AVERAGE,
                scale::AVERAGE_MAX,
                scale::AVERAGE_NONE,
            );
            count(c);
            w.put_u16(allowed_at, v as u16);

            let (v, c) =
                quantize::unsigned(stats.pace, scale::PACE, scale::PACE_MAX, scale::PACE_NONE);
            count(c);
            w.put_u8(pace_at, v as u8);

            let (v, c) = quantize::unsigned(
                stats.win_rate,
                scale::WIN_RATE,
                scale::WIN_RATE_MAX,
                scale::WIN_RATE_NONE,
            );
            count(c);
            w.put_u8(win_rate_at, v as u8);
        }

        let (temperature, c) = quantize::signed(
            event.temperature_f,
            scale::TEMPERATURE,
            scale::SIGNED_MIN,
            scale::SIGNED_MAX,
            scale::SIGNED_NONE,
        );
        count(c);
        w.put_i8(offset::TEMPERATURE, temperature as i8);

        let (spread, c) = quantize::signed(
            event.spread,
            scale::SPREAD,
            scale::SIGNED_MIN,
            scale::SIGNED_MAX,
            scale::SIGNED_NONE,
        );
        count(c);
        w.put_i8(offset::SPREAD, spread as i8);

        if clamps > 0 {
            self.clamped.fetch_add(clamps, Ordering::Relaxed);
        }
        self.encoded.fetch_add(1, Ordering::Relaxed);
        w.finish()
    }

    /// See [`decode`].
    pub fn decode(record: &CompactRecord) -> ApproximateEvent {
        decode(record)
    }

    /// Number of fields clamped since construction.
    pub fn clamp_count(&self) -> u64 {
        self.clamped.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> EncoderStats {
        EncoderStats {
            encoded: self.encoded.load(Ordering::Relaxed),
            clamped: self.clamp_count(),
        }
    }
}

/// Recover an approximate event from a record.
pub fn decode(record: &CompactRecord) -> ApproximateEvent {
    let flags = record.flags();
    CanonicalEvent {
        sport: record.sport(),
        home_id: record.home_id(),
        away_id: record.away_id(),
        start_time: record.start_time(),
        venue_id: record.venue_id().map(u32::from),
        home_score: i32::from(record.home_score()),
        away_score: i32::from(record.away_score()),
        home_stats: decode_stats(record, Side::Home),
        away_stats: decode_stats(record, Side::Away),
        flags: SituationalFlags {
            home_back_to_back: flags.contains(RecordFlags::HOME_BACK_TO_BACK),
            away_back_to_back: flags.contains(RecordFlags::AWAY_BACK_TO_BACK),
            rivalry: flags.contains(RecordFlags::RIVALRY),
            revenge: flags.contains(RecordFlags::REVENGE),
        },
        temperature_f: record.temperature_f(),
        spread: record.spread(),
    }
}

/// Short display form of a record, attached to alerts and game feeds.
pub fn summarize(record: &CompactRecord) -> GameSummary {
    GameSummary {
        sport: record.sport(),
        home_id: record.home_id(),
        away_id: record.away_id(),
        start_time: record.start_time(),
        home_score: record.home_score(),
        away_score: record.away_score(),
        margin: record.margin(),
        spread: record.spread(),
    }
}

fn decode_stats(record: &CompactRecord, side: Side) -> ParticipantStats {
    ParticipantStats {
        scoring_avg: record.scoring_avg(side),
        allowed_avg: record.allowed_avg(side),
        pace: record.pace(side),
        win_rate: record.win_rate(side),
    }
}

fn pack_flags(flags: &SituationalFlags) -> RecordFlags {
    let mut bits = 0u8;
    if flags.home_back_to_back {
        bits |= RecordFlags::HOME_BACK_TO_BACK;
    }
    if flags.away_back_to_back {
        bits |= RecordFlags::AWAY_BACK_TO_BACK;
    }
    if flags.rivalry {
        bits |= RecordFlags::RIVALRY;
    }
    if flags.revenge {
        bits |= RecordFlags::REVENGE;
    }
    RecordFlags::from_bits(bits)
}
