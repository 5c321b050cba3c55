//! Date helpers for stored timestamps and local-day bucketing.

use chrono::{DateTime, Local, NaiveDate, Utc};

/// Today's date in the user's local timezone.
///
/// Streaks and deadline windows bucket by local calendar day, so this is
/// the reference point for both.
pub fn today_local() -> NaiveDate {
    Local::now().date_naive()
}

/// Parse a stored RFC 3339 timestamp.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse a stored YYYY-MM-DD date.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    s.parse().ok()
}
