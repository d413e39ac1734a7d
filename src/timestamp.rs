//! Conversion of browser-native visit timestamps into calendar time.
//!
//! Every profile carries an [`EpochKind`]; conversion depends on nothing else,
//! so a new browser only needs to name the epoch its database uses.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Seconds between 1601-01-01T00:00:00Z and 1970-01-01T00:00:00Z.
pub const WEBKIT_UNIX_OFFSET_SECONDS: i64 = 11_644_473_600;

const MICROS_PER_SECOND: i64 = 1_000_000;

/// Zero point and unit of a stored visit timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EpochKind {
    /// Microseconds since 1601-01-01 UTC (Chromium family).
    Webkit,
    /// Microseconds since 1970-01-01 UTC (Mozilla family).
    Unix,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TimestampError {
    #[error("timestamp {raw} is out of range for the {epoch:?} epoch")]
    OutOfRange { raw: i64, epoch: EpochKind },
}

/// Shift a raw value onto the Unix epoch, still in microseconds.
pub fn to_unix_micros(raw: i64, epoch: EpochKind) -> Option<i64> {
    match epoch {
        EpochKind::Webkit => raw.checked_sub(WEBKIT_UNIX_OFFSET_SECONDS * MICROS_PER_SECOND),
        EpochKind::Unix => Some(raw),
    }
}

pub fn to_utc(raw: i64, epoch: EpochKind) -> Result<DateTime<Utc>, TimestampError> {
    let micros = to_unix_micros(raw, epoch).ok_or(TimestampError::OutOfRange { raw, epoch })?;
    let secs = micros.div_euclid(MICROS_PER_SECOND);
    let nsecs = (micros.rem_euclid(MICROS_PER_SECOND) as u32) * 1000;
    DateTime::<Utc>::from_timestamp(secs, nsecs).ok_or(TimestampError::OutOfRange { raw, epoch })
}

/// Convert a raw timestamp into the local timezone.
pub fn to_datetime(raw: i64, epoch: EpochKind) -> Result<DateTime<Local>, TimestampError> {
    to_utc(raw, epoch).map(|dt| dt.with_timezone(&Local))
}

/// Inverse of [`to_utc`], used to build fixture databases.
pub fn from_datetime(dt: DateTime<Utc>, epoch: EpochKind) -> i64 {
    let micros = dt.timestamp_micros();
    match epoch {
        EpochKind::Webkit => micros + WEBKIT_UNIX_OFFSET_SECONDS * MICROS_PER_SECOND,
        EpochKind::Unix => micros,
    }
}
