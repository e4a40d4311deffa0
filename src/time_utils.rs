// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting.
//!
//! Timestamps are stored as RFC3339 strings with a `Z` suffix and second
//! precision, so string order in Firestore matches chronological order.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Current time in stored form.
pub fn now_rfc3339() -> String {
    format_utc_rfc3339(Utc::now())
}

/// Parse a client- or feed-supplied date.
///
/// Accepts full RFC3339 (any offset) or a bare `YYYY-MM-DD`, which is read as
/// the end of that day in UTC.
pub fn parse_flexible_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(23, 59, 59))
        .map(|dt| dt.and_utc())
}

/// Normalize a date to stored form, or `None` if it cannot be parsed.
pub fn normalize_date(raw: &str) -> Option<String> {
    parse_flexible_date(raw).map(format_utc_rfc3339)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_uses_z_suffix() {
        let dt = Utc.with_ymd_and_hms(2026, 3, 1, 8, 30, 0).unwrap();
        assert_eq!(format_utc_rfc3339(dt), "2026-03-01T08:30:00Z");
    }

    #[test]
    fn test_parse_offset_and_bare_date() {
        assert_eq!(
            normalize_date("2026-03-01T10:00:00+05:30").as_deref(),
            Some("2026-03-01T04:30:00Z")
        );
        assert_eq!(
            normalize_date("2026-12-31").as_deref(),
            Some("2026-12-31T23:59:59Z")
        );
        assert_eq!(normalize_date("next tuesday"), None);
    }
}
