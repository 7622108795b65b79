//! Timestamp formatting for database storage
//!
//! All timestamps are stored as UTC RFC 3339 TEXT with whole-second
//! precision and a `Z` suffix. The fixed format keeps lexicographic
//! comparison equivalent to chronological comparison, so SQL `WHERE`
//! clauses can compare timestamp columns directly against bound strings.

use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

/// Format a timestamp for storage
pub fn to_db(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse a stored timestamp
pub fn from_db(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Failed to parse timestamp '{}': {}", s, e)))
}

/// Current time formatted for storage
pub fn now_db() -> String {
    to_db(Utc::now())
}

/// Parse a stored ISO calendar date (YYYY-MM-DD)
pub fn date_from_db(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| Error::InvalidInput(format!("Invalid date '{}': {}", s, e)))
}
