//! Coarse frame time tags.
//!
//! Protocol generations disagree on the epoch of the "second of century"
//! field: older encoders count from 1900-01-01 (NTP), newer ones from
//! 1970-01-01 (Unix). [`Timestamp`] normalizes both to signed nanoseconds
//! relative to the Unix epoch.

use std::fmt;

use serde::Serialize;

/// Seconds between the NTP epoch (1900) and the Unix epoch (1970).
pub const NTP_UNIX_OFFSET_SECONDS: i64 = 2_208_988_800;

/// Second-of-century values above this are taken to be NTP-epoch seconds.
///
/// Used only by encoders that do not say which epoch they use, until a
/// configuration frame settles it.
pub const NTP_EPOCH_THRESHOLD: u32 = 3_155_673_600;

const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Epoch a raw time tag was interpreted against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeTagEpoch {
    Ntp,
    Unix,
}

/// A point in time as signed nanoseconds from the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    pub const fn from_unix_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    pub const fn from_unix_seconds(seconds: i64) -> Self {
        Self(seconds * NANOS_PER_SECOND)
    }

    /// Interpret a 32-bit second count as seconds since 1900-01-01.
    pub const fn from_ntp_seconds(seconds: u32) -> Self {
        Self::from_unix_seconds(seconds as i64 - NTP_UNIX_OFFSET_SECONDS)
    }

    /// Interpret a second-of-century field whose epoch is not declared.
    pub fn from_second_of_century(seconds: u32) -> (Self, TimeTagEpoch) {
        if seconds > NTP_EPOCH_THRESHOLD {
            (Self::from_ntp_seconds(seconds), TimeTagEpoch::Ntp)
        } else {
            (Self::from_unix_seconds(i64::from(seconds)), TimeTagEpoch::Unix)
        }
    }

    pub const fn unix_nanos(self) -> i64 {
        self.0
    }

    /// Whole seconds relative to the Unix epoch, rounded toward negative infinity.
    pub const fn unix_seconds(self) -> i64 {
        self.0.div_euclid(NANOS_PER_SECOND)
    }

    pub fn as_unix_seconds_f64(self) -> f64 {
        self.0 as f64 / NANOS_PER_SECOND as f64
    }

    /// Offset by a fractional number of seconds, rounded to the nearest nanosecond.
    pub fn add_seconds(self, seconds: f64) -> Self {
        Self(self.0 + (seconds * NANOS_PER_SECOND as f64).round() as i64)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:09}",
            self.0.div_euclid(NANOS_PER_SECOND),
            self.0.rem_euclid(NANOS_PER_SECOND)
        )
    }
}
