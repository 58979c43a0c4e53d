//! Timestamp parsing for persisted configuration
//!
//! Registry files may carry timestamps with an offset (`2024-05-01T10:00:00Z`)
//! or without one (`2024-05-01T10:00:00.123456`, as older writers produced).
//! Offset-less values are read as UTC.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
#[error("Invalid datetime format: '{input}'")]
pub struct DateTimeError {
    pub input: String,
}

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
];

/// Parse an RFC 3339 timestamp, or a naive ISO 8601 one taken as UTC
pub fn parse_flexible(datetime_str: &str) -> Result<DateTime<Utc>, DateTimeError> {
    let trimmed = datetime_str.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
        .ok_or_else(|| DateTimeError {
            input: datetime_str.to_string(),
        })
}

/// Use with `#[serde(deserialize_with = "deserialize_datetime")]`
pub fn deserialize_datetime<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_flexible(&s).map_err(serde::de::Error::custom)
}

/// Use with `#[serde(default, deserialize_with = "deserialize_optional_datetime")]`
pub fn deserialize_optional_datetime<'de, D>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(s) => parse_flexible(&s).map(Some).map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}
