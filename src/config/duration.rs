//! Duration strings in configuration files.
//!
//! Timeouts are written the way the rest of our tooling writes them:
//! `"5s"`, `"250ms"`, `"1m30s"`. A value is an optional `+` sign followed by
//! one or more `<decimal><unit>` pairs, units `ns`, `us` (or `µs`), `ms`,
//! `s`, `m`, `h`. A bare `"0"` needs no unit, and an empty string means
//! "unset" and parses to zero so validation can substitute the default.

use std::time::Duration;

use serde::{Deserialize, Deserializer};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DurationError {
    #[error("invalid duration {0:?}")]
    Invalid(String),
    #[error("unknown unit {unit:?} in duration {input:?}")]
    UnknownUnit { input: String, unit: String },
    #[error("negative duration {0:?}")]
    Negative(String),
}

/// Parse a duration string.
///
/// Empty input and `"0"` both yield `Duration::ZERO`.
pub fn parse_duration(input: &str) -> Result<Duration, DurationError> {
    let mut s = input.trim();
    if s.is_empty() || s == "0" || s == "+0" {
        return Ok(Duration::ZERO);
    }
    if s.starts_with('-') {
        return Err(DurationError::Negative(input.to_string()));
    }
    s = s.strip_prefix('+').unwrap_or(s);
    if s.is_empty() {
        return Err(DurationError::Invalid(input.to_string()));
    }

    let mut total = Duration::ZERO;
    let mut rest = s;
    while !rest.is_empty() {
        let digits = rest
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .unwrap_or(rest.len());
        if digits == 0 {
            return Err(DurationError::Invalid(input.to_string()));
        }
        let (number, tail) = rest.split_at(digits);
        let value: f64 = number
            .parse()
            .map_err(|_| DurationError::Invalid(input.to_string()))?;

        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);
        let nanos_per_unit: f64 = match unit {
            "ns" => 1.0,
            "us" | "µs" => 1_000.0,
            "ms" => 1_000_000.0,
            "s" => 1_000_000_000.0,
            "m" => 60.0 * 1_000_000_000.0,
            "h" => 3_600.0 * 1_000_000_000.0,
            "" => return Err(DurationError::Invalid(input.to_string())),
            other => {
                return Err(DurationError::UnknownUnit {
                    input: input.to_string(),
                    unit: other.to_string(),
                })
            }
        };
        total += Duration::from_nanos((value * nanos_per_unit) as u64);
        rest = tail;
    }

    Ok(total)
}

/// Serde adapter for duration fields, used with `deserialize_with`.
pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_duration(&raw).map_err(serde::de::Error::custom)
}
