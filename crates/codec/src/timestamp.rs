//! Canonical timestamp format.
//!
//! Header timestamps are rendered as `yyyy-MM-ddTHH:mm:ss.ffffffZ`:
//! always UTC, always six fractional digits.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serializer};

const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// Render a timestamp in the canonical format.
pub fn format(time: &DateTime<Utc>) -> String {
    time.format(FORMAT).to_string()
}

/// Parse a timestamp in the canonical format.
pub fn parse(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    NaiveDateTime::parse_from_str(s, FORMAT).map(|naive| naive.and_utc())
}

/// Serialize a timestamp in the canonical format.
pub fn serialize<S>(time: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format(time))
}

/// Deserialize a timestamp in the canonical format.
pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse(&s).map_err(serde::de::Error::custom)
}
