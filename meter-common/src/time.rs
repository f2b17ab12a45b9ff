//! Timestamp utilities
//!
//! Readings are stored with a single fixed RFC 3339 layout so that string
//! comparison in SQL matches chronological order.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};

use crate::{Error, Result};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Calendar month containing `timestamp`, as `[month_start, next_month_start)`
///
/// Boundaries are computed in UTC from the timestamp itself, never from the
/// wall clock.
pub fn month_window(timestamp: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let year = timestamp.year();
    let month = timestamp.month();

    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };

    (
        first_instant_of_month(year, month),
        first_instant_of_month(next_year, next_month),
    )
}

fn first_instant_of_month(year: i32, month: u32) -> DateTime<Utc> {
    // Day 1 at midnight always exists in UTC
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Calendar month of `timestamp` as `YYYY-MM`, the key of the duplicate window
pub fn month_key(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y-%m").to_string()
}

/// Format a timestamp for storage (`YYYY-MM-DDTHH:MM:SS.sssZ`)
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a stored timestamp back into UTC
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Failed to parse timestamp '{}': {}", value, e)))
}

/// Parse a caller-supplied datetime
///
/// Accepts RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS[.fff]` (or with a space
/// separator), or a bare `YYYY-MM-DD`. Naive values are taken as UTC.
pub fn parse_datetime_lenient(value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }

    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, pattern) {
            return Ok(naive.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(naive.and_utc());
        }
    }

    Err(Error::InvalidInput(format!("Invalid datetime format: {}", value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    #[test]
    fn test_month_window_mid_month() {
        let (start, end) = month_window(utc(2024, 8, 15, 13, 45, 0));
        assert_eq!(start, utc(2024, 8, 1, 0, 0, 0));
        assert_eq!(end, utc(2024, 9, 1, 0, 0, 0));
    }

    #[test]
    fn test_month_window_first_instant_is_inclusive() {
        let ts = utc(2024, 8, 1, 0, 0, 0);
        let (start, end) = month_window(ts);
        assert_eq!(start, ts);
        assert!(ts < end);
    }

    #[test]
    fn test_month_window_last_second_of_month() {
        let (start, end) = month_window(utc(2024, 8, 31, 23, 59, 59));
        assert_eq!(start, utc(2024, 8, 1, 0, 0, 0));
        assert_eq!(end, utc(2024, 9, 1, 0, 0, 0));
    }

    #[test]
    fn test_month_window_december_rolls_year() {
        let (start, end) = month_window(utc(2023, 12, 24, 8, 0, 0));
        assert_eq!(start, utc(2023, 12, 1, 0, 0, 0));
        assert_eq!(end, utc(2024, 1, 1, 0, 0, 0));
    }

    #[test]
    fn test_month_window_leap_february() {
        let (start, end) = month_window(utc(2024, 2, 29, 12, 0, 0));
        assert_eq!(start, utc(2024, 2, 1, 0, 0, 0));
        assert_eq!(end, utc(2024, 3, 1, 0, 0, 0));
    }

    #[test]
    fn test_month_key_matches_window() {
        assert_eq!(month_key(&utc(2024, 8, 1, 0, 0, 0)), "2024-08");
        assert_eq!(month_key(&utc(2024, 8, 31, 23, 59, 59)), "2024-08");
        assert_eq!(month_key(&utc(2024, 12, 31, 23, 59, 59)), "2024-12");
        assert_eq!(month_key(&utc(2025, 1, 1, 0, 0, 0)), "2025-01");
    }

    #[test]
    fn test_format_timestamp_is_fixed_width() {
        let formatted = format_timestamp(&utc(2024, 8, 5, 7, 3, 9));
        assert_eq!(formatted, "2024-08-05T07:03:09.000Z");
    }

    #[test]
    fn test_format_then_parse_preserves_instant() {
        let ts = utc(2024, 8, 5, 7, 3, 9);
        assert_eq!(parse_timestamp(&format_timestamp(&ts)).unwrap(), ts);
    }

    #[test]
    fn test_formatted_order_matches_chronological_order() {
        let earlier = format_timestamp(&utc(2024, 8, 31, 23, 59, 59));
        let later = format_timestamp(&utc(2024, 9, 1, 0, 0, 0));
        assert!(earlier < later);
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_parse_lenient_rfc3339_with_offset() {
        let parsed = parse_datetime_lenient("2024-08-10T10:00:00-03:00").unwrap();
        assert_eq!(parsed, utc(2024, 8, 10, 13, 0, 0));
    }

    #[test]
    fn test_parse_lenient_naive_and_date_only() {
        assert_eq!(
            parse_datetime_lenient("2024-08-10T10:00:00").unwrap(),
            utc(2024, 8, 10, 10, 0, 0)
        );
        assert_eq!(
            parse_datetime_lenient("2024-08-10 10:00:00.250").unwrap().timestamp(),
            utc(2024, 8, 10, 10, 0, 0).timestamp()
        );
        assert_eq!(
            parse_datetime_lenient("2024-08-10").unwrap(),
            utc(2024, 8, 10, 0, 0, 0)
        );
    }

    #[test]
    fn test_parse_lenient_rejects_invalid() {
        assert!(matches!(
            parse_datetime_lenient("2024-13-45"),
            Err(Error::InvalidInput(_))
        ));
        assert!(parse_datetime_lenient("").is_err());
    }

    #[test]
    fn test_now_returns_recent_timestamp() {
        let timestamp = now();
        assert!(timestamp.timestamp() > 946_684_800); // 2000-01-01 00:00:00 UTC
        assert!(timestamp.timestamp() < 4_102_444_800); // 2100-01-01 00:00:00 UTC
    }
}
