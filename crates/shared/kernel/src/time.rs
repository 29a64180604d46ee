//! Clock helpers. The domain stores timestamps as Unix milliseconds.

use chrono::{DateTime, TimeZone, Utc};

/// Current time in Unix milliseconds.
#[must_use]
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Converts Unix milliseconds to a UTC date-time; out-of-range values clamp to the epoch.
#[must_use]
pub fn to_datetime(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis).single().unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// RFC 3339 rendering used in exported documents.
#[must_use]
pub fn to_rfc3339(millis: i64) -> String {
    to_datetime(millis).to_rfc3339()
}

/// Truncates to the start of the minute; evaluations inside one minute share cache entries.
#[must_use]
pub const fn minute_bucket(millis: i64) -> i64 {
    millis - millis.rem_euclid(60_000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversions_agree() {
        let now = now_millis();
        assert_eq!(to_datetime(now).timestamp_millis(), now);
        assert_eq!(to_rfc3339(0), "1970-01-01T00:00:00+00:00");
    }

    #[test]
    fn minute_bucket_truncates() {
        assert_eq!(minute_bucket(119_999), 60_000);
        assert_eq!(minute_bucket(120_000), 120_000);
        assert_eq!(minute_bucket(-1), -60_000);
    }
}
