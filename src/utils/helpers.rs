//! Helper functions and utilities

use chrono::{DateTime, Utc};

/// Default page size for list queries
pub const DEFAULT_PAGE_SIZE: i64 = 100;

/// Clamp a requested page size into `1..=max`
pub fn clamp_limit(limit: Option<i64>, default: i64, max: i64) -> i64 {
    limit.unwrap_or(default).clamp(1, max)
}

/// Format a timestamp for logs and reports
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Check whether `at` falls inside an optional `[from, to]` window
pub fn within_window(at: DateTime<Utc>, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> bool {
    from.map_or(true, |from| at >= from) && to.map_or(true, |to| at <= to)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(None, 100, 100), 100);
        assert_eq!(clamp_limit(Some(0), 100, 100), 1);
        assert_eq!(clamp_limit(Some(500), 10, 50), 50);
        assert_eq!(clamp_limit(Some(-3), 10, 50), 1);
    }

    #[test]
    fn test_format_timestamp() {
        let at = Utc.with_ymd_and_hms(2024, 9, 1, 18, 30, 0).unwrap();
        assert_eq!(format_timestamp(at), "2024-09-01 18:30:00 UTC");
    }

    #[test]
    fn test_within_window() {
        let now = Utc::now();
        assert!(within_window(now, None, None));
        assert!(within_window(now, Some(now - Duration::hours(1)), Some(now + Duration::hours(1))));
        assert!(!within_window(now, Some(now + Duration::hours(1)), None));
        assert!(!within_window(now, None, Some(now - Duration::hours(1))));
    }
}
