//! Parsing and rendering of tracker timestamps.

use chrono::{DateTime, FixedOffset, SecondsFormat};
use thiserror::Error;

use crate::sentinel::ZERO_TIMESTAMP;

/// A point in time with the offset the tracker reported it in.
pub type Timestamp = DateTime<FixedOffset>;

/// Jira's native timestamp layout, e.g. `2024-01-02T10:00:00.000+0000`.
const JIRA_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f%z";

/// A timestamp string that matched none of the accepted layouts.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid timestamp {value:?}: {reason}")]
pub struct TimestampError {
    pub value: String,
    pub reason: String,
}

/// Parses an RFC 3339 or Jira-style timestamp, keeping its offset.
pub fn parse_timestamp(value: &str) -> Result<Timestamp, TimestampError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts);
    }
    DateTime::parse_from_str(value, JIRA_FORMAT).map_err(|e| TimestampError {
        value: value.to_string(),
        reason: e.to_string(),
    })
}

/// Renders a timestamp as RFC 3339 at second precision, or the zero
/// sentinel when unknown.
pub fn format_timestamp(ts: Option<&Timestamp>) -> String {
    ts.map_or_else(
        || ZERO_TIMESTAMP.to_string(),
        |ts| ts.to_rfc3339_opts(SecondsFormat::Secs, true),
    )
}
