//! Lenient timestamp parsing.
//!
//! The backend emits timestamps as RFC 3339 strings, SQL `DATETIME` strings
//! (`2024-05-01 10:30:00`, assumed UTC), or bare dates. Anything else is
//! treated as "no timestamp" rather than an error.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Parse a backend timestamp, returning `None` for unrecognized input.
///
/// ```
/// use verdant_core::parse_timestamp;
///
/// assert!(parse_timestamp("2024-05-01T10:30:00Z").is_some());
/// assert!(parse_timestamp("2024-05-01 10:30:00").is_some());
/// assert!(parse_timestamp("yesterday").is_none());
/// ```
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Serde adapter for `Option<DateTime<Utc>>` fields using [`parse_timestamp`].
pub mod lenient {
    use super::{DateTime, Deserialize, Deserializer, Utc, parse_timestamp};

    /// Deserialize an optional timestamp; malformed values become `None`.
    ///
    /// # Errors
    ///
    /// Only fails if the input is not valid JSON for the field.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
        Ok(raw
            .as_ref()
            .and_then(serde_json::Value::as_str)
            .and_then(parse_timestamp))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Datelike, Timelike};

    use super::*;

    #[test]
    fn test_sql_datetime_is_utc() {
        let dt = parse_timestamp("2024-05-01 10:30:00").unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2024, 5, 1));
        assert_eq!(dt.hour(), 10);
    }

    #[test]
    fn test_offsets_are_normalized() {
        let dt = parse_timestamp("2024-05-01T10:30:00+05:30").unwrap();
        assert_eq!(dt.hour(), 5);
    }

    #[test]
    fn test_date_only_and_garbage() {
        assert_eq!(parse_timestamp("2024-05-01").unwrap().hour(), 0);
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("01/05/2024").is_none());
    }
}
