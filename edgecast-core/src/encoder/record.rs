//! The 32-byte compact record and its field layout.
//!
//! | offset | size | field |
//! |-------:|-----:|-------|
//! | 0  | 1 | layout version (high nibble), sport code (low nibble) |
//! | 1  | 1 | situational flags bitmask |
//! | 2  | 4 | home id |
//! | 6  | 4 | away id |
//! | 10 | 4 | start, seconds since 2000-01-01T00:00:00Z |
//! | 14 | 2 | venue id |
//! | 16 | 1 | home score |
//! | 17 | 1 | away score |
//! | 18 | 2 | home scoring avg, 1/64 steps |
//! | 20 | 2 | home allowed avg, 1/64 steps |
//! | 22 | 2 | away scoring avg, 1/64 steps |
//! | 24 | 2 | away allowed avg, 1/64 steps |
//! | 26 | 1 | home pace |
//! | 27 | 1 | away pace |
//! | 28 | 1 | home win rate, 1/254 steps |
//! | 29 | 1 | away win rate, 1/254 steps |
//! | 30 | 1 | temperature °F, signed |
//! | 31 | 1 | point spread, signed half points |
//!
//! Multi-byte fields are little-endian.

use compact_str::{CompactString, format_compact};
use edgecast_sdk::objects::Sport;

use super::quantize::{dequantize_signed, dequantize_unsigned};

pub const RECORD_LEN: usize = 32;
pub const LAYOUT_VERSION: u8 = 1;

/// Unix timestamp of 2000-01-01T00:00:00Z, the origin of the start field.
pub const START_EPOCH: i64 = 946_684_800;

pub(crate) mod offset {
    pub const HEADER: usize = 0;
    pub const FLAGS: usize = 1;
    pub const HOME_ID: usize = 2;
    pub const AWAY_ID: usize = 6;
    pub const START: usize = 10;
    pub const VENUE: usize = 14;
    pub const HOME_SCORE: usize = 16;
    pub const AWAY_SCORE: usize = 17;
    pub const HOME_SCORING_AVG: usize = 18;
    pub const HOME_ALLOWED_AVG: usize = 20;
    pub const AWAY_SCORING_AVG: usize = 22;
    pub const AWAY_ALLOWED_AVG: usize = 24;
    pub const HOME_PACE: usize = 26;
    pub const AWAY_PACE: usize = 27;
    pub const HOME_WIN_RATE: usize = 28;
    pub const AWAY_WIN_RATE: usize = 29;
    pub const TEMPERATURE: usize = 30;
    pub const SPREAD: usize = 31;
}

pub(crate) mod scale {
    pub const AVERAGE: f64 = 64.0;
    pub const AVERAGE_MAX: u32 = 0xFFFE;
    pub const AVERAGE_NONE: u32 = 0xFFFF;

    pub const PACE: f64 = 1.0;
    pub const PACE_MAX: u32 = 254;
    pub const PACE_NONE: u32 = 0xFF;

    pub const WIN_RATE: f64 = 254.0;
    pub const WIN_RATE_MAX: u32 = 254;
    pub const WIN_RATE_NONE: u32 = 0xFF;

    pub const TEMPERATURE: f64 = 1.0;
    pub const SPREAD: f64 = 2.0;
    pub const SIGNED_MIN: i32 = -127;
    pub const SIGNED_MAX: i32 = 127;
    pub const SIGNED_NONE: i32 = i8::MIN as i32;

    pub const VENUE_MAX: i64 = 0xFFFE;
    pub const VENUE_NONE: u16 = 0xFFFF;
}

/// Situational flags packed into one byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RecordFlags(u8);

impl RecordFlags {
    pub const HOME_BACK_TO_BACK: u8 = 1 << 0;
    pub const AWAY_BACK_TO_BACK: u8 = 1 << 1;
    pub const RIVALRY: u8 = 1 << 2;
    pub const REVENGE: u8 = 1 << 3;

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, flag: u8) -> bool {
        self.0 & flag == flag
    }
}

/// Which side of a game a per-participant field belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Home,
    Away,
}

/// Fixed-size, lossily quantized encoding of one canonical event.
///
/// Accessors read straight from the byte array, so scorers never need to
/// decode the full record.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompactRecord([u8; RECORD_LEN]);

impl CompactRecord {
    pub const fn from_bytes(bytes: [u8; RECORD_LEN]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; RECORD_LEN] {
        &self.0
    }

    pub const fn layout_version(&self) -> u8 {
        self.0[offset::HEADER] >> 4
    }

    pub const fn sport(&self) -> Sport {
        Sport::from_code(self.0[offset::HEADER] & 0x0F)
    }

    pub const fn flags(&self) -> RecordFlags {
        RecordFlags(self.0[offset::FLAGS])
    }

    pub fn home_id(&self) -> u32 {
        self.read_u32(offset::HOME_ID)
    }

    pub fn away_id(&self) -> u32 {
        self.read_u32(offset::AWAY_ID)
    }

    pub fn participant(&self, side: Side) -> u32 {
        match side {
            Side::Home => self.home_id(),
            Side::Away => self.away_id(),
        }
    }

    /// Start time as unix seconds.
    pub fn start_time(&self) -> i64 {
        START_EPOCH + i64::from(self.read_u32(offset::START))
    }

    pub fn venue_id(&self) -> Option<u16> {
        let raw = self.read_u16(offset::VENUE);
        (raw != scale::VENUE_NONE).then_some(raw)
    }

    pub const fn home_score(&self) -> u8 {
        self.0[offset::HOME_SCORE]
    }

    pub const fn away_score(&self) -> u8 {
        self.0[offset::AWAY_SCORE]
    }

    pub fn score(&self, side: Side) -> u8 {
        match side {
            Side::Home => self.home_score(),
            Side::Away => self.away_score(),
        }
    }

    /// Final margin from the home side's perspective.
    pub const fn margin(&self) -> i16 {
        self.home_score() as i16 - self.away_score() as i16
    }

    /// The winning side, or `None` for a tie.
    pub const fn winner(&self) -> Option<Side> {
        match self.margin() {
            m if m > 0 => Some(Side::Home),
            m if m < 0 => Some(Side::Away),
            _ => None,
        }
    }

    pub fn scoring_avg(&self, side: Side) -> Option<f64> {
        let at = match side {
            Side::Home => offset::HOME_SCORING_AVG,
            Side::Away => offset::AWAY_SCORING_AVG,
        };
        self.average_at(at)
    }

    pub fn allowed_avg(&self, side: Side) -> Option<f64> {
        let at = match side {
            Side::Home => offset::HOME_ALLOWED_AVG,
            Side::Away => offset::AWAY_ALLOWED_AVG,
        };
        self.average_at(at)
    }

    pub fn pace(&self, side: Side) -> Option<f64> {
        let at = match side {
            Side::Home => offset::HOME_PACE,
            Side::Away => offset::AWAY_PACE,
        };
        dequantize_unsigned(u32::from(self.0[at]), scale::PACE, scale::PACE_NONE)
    }

    pub fn win_rate(&self, side: Side) -> Option<f64> {
        let at = match side {
            Side::Home => offset::HOME_WIN_RATE,
            Side::Away => offset::AWAY_WIN_RATE,
        };
        dequantize_unsigned(u32::from(self.0[at]), scale::WIN_RATE, scale::WIN_RATE_NONE)
    }

    pub fn temperature_f(&self) -> Option<f64> {
        let raw = i32::from(self.0[offset::TEMPERATURE] as i8);
        dequantize_signed(raw, scale::TEMPERATURE, scale::SIGNED_NONE)
    }

    /// Point spread from the home side's perspective.
    pub fn spread(&self) -> Option<f64> {
        let raw = i32::from(self.0[offset::SPREAD] as i8);
        dequantize_signed(raw, scale::SPREAD, scale::SIGNED_NONE)
    }

    /// Identifier of the originating game: `{sport}:{home}-{away}@{start}`.
    pub fn event_id(&self) -> CompactString {
        format_compact!(
            "{}:{}-{}@{}",
            self.sport(),
            self.home_id(),
            self.away_id(),
            self.start_time()
        )
    }

    fn average_at(&self, at: usize) -> Option<f64> {
        dequantize_unsigned(
            u32::from(self.read_u16(at)),
            scale::AVERAGE,
            scale::AVERAGE_NONE,
        )
    }

    fn read_u16(&self, at: usize) -> u16 {
        u16::from_le_bytes([self.0[at], self.0[at + 1]])
    }

    fn read_u32(&self, at: usize) -> u32 {
        u32::from_le_bytes([self.0[at], self.0[at + 1], self.0[at + 2], self.0[at + 3]])
    }
}

impl std::fmt::Debug for CompactRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CompactRecord(")?;
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        f.write_str(")")
    }
}

/// Write cursor used by the encoder. Lives on the stack.
pub(crate) struct RecordWriter([u8; RECORD_LEN]);

impl RecordWriter {
    pub(crate) const fn new() -> Self {
        Self([0; RECORD_LEN])
    }

    pub(crate) fn put_u8(&mut self, at: usize, value: u8) {
        self.0[at] = value;
    }

    pub(crate) fn put_i8(&mut self, at: usize, value: i8) {
        self.0[at] = value as u8;
    }

    pub(crate) fn put_u16(&mut self, at: usize, value: u16) {
        self.0[at..at + 2].copy_from_slice(&value.to_le_bytes());
    }

    pub(crate) fn put_u32(&mut self, at: usize, value: u32) {
        self.0[at..at + 4].copy_from_slice(&value.to_le_bytes());
    }

    pub(crate) const fn finish(self) -> CompactRecord {
        CompactRecord(self.0)
    }
}
