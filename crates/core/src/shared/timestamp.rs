//! Conversion between seconds and `HH:MM:SS,mmm` timestamps.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid timestamp '{0}': expected HH:MM:SS,mmm")]
pub struct TimestampError(pub String);

/// Parses `HH:MM:SS,mmm` or `HH:MM:SS.mmm`. The fractional part is padded or
/// truncated to milliseconds; it may be omitted entirely.
pub fn parse_timestamp(value: &str) -> Result<f64, TimestampError> {
    let err = || TimestampError(value.to_string());
    let normalized = value.trim().replace(',', ".");

    let (base, millis) = match normalized.rsplit_once('.') {
        Some((base, frac)) => {
            if frac.is_empty() || !frac.chars().all(|c| c.is_ascii_digit()) {
                return Err(err());
            }
            let digits: String = frac.chars().chain(std::iter::repeat('0')).take(3).collect();
            (base.to_string(), digits.parse::<u32>().map_err(|_| err())?)
        }
        None => (normalized, 0),
    };

    let parts = base
        .split(':')
        .map(|p| p.parse::<u32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| err())?;
    let [hours, minutes, seconds] = parts.as_slice() else {
        return Err(err());
    };

    Ok(f64::from(*hours) * 3600.0
        + f64::from(*minutes) * 60.0
        + f64::from(*seconds)
        + f64::from(millis) / 1000.0)
}

/// Formats seconds as `HH:MM:SS,mmm`, rounded to the nearest millisecond.
pub fn format_timestamp(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms / 60_000) % 60;
    let secs = (total_ms / 1000) % 60;
    let millis = total_ms % 1000;
    format!("{hours:02}:{minutes:02}:{secs:02},{millis:03}")
}

/// Serde adapter for a time in seconds that may be written either as a JSON
/// number or as a timestamp string. Serializes as seconds.
pub mod flexible_seconds {
    use serde::de::{self, Deserializer, Visitor};
    use serde::Serializer;
    use std::fmt;

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(*value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        deserializer.deserialize_any(SecondsVisitor)
    }

    pub(super) struct SecondsVisitor;

    impl Visitor<'_> for SecondsVisitor {
        type Value = f64;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("seconds as a number or an HH:MM:SS,mmm string")
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<f64, E> {
            if v.is_finite() && v >= 0.0 {
                Ok(v)
            } else {
                Err(E::custom(format!("time must be non-negative, got {v}")))
            }
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<f64, E> {
            Ok(v as f64)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<f64, E> {
            self.visit_f64(v as f64)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<f64, E> {
            super::parse_timestamp(v).map_err(E::custom)
        }
    }
}

/// Serde adapter that writes seconds as an `HH:MM:SS,mmm` string and reads
/// either form back.
pub mod srt_time {
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_timestamp(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        deserializer.deserialize_any(super::flexible_seconds::SecondsVisitor)
    }
}
