//! Small shared value types used across crate boundaries.

use chrono::{DateTime, Utc};

/// ISO-8601 timestamp; every artifact's `timestamp` field is always
/// ISO-8601 text on the wire.
pub fn now_iso8601() -> String {
    Utc::now().to_rfc3339()
}

pub fn parse_iso8601(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.with_timezone(&Utc))
}
