// Helper functions for safe logging, timestamps and serialization

use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use serde::{Serialize, Serializer};

/// Storage format for every timestamp column, matching SQLite's `datetime('now')`
pub const SQL_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Masks email addresses for safe logging
///
/// # Example
/// ```ignore
/// let masked = safe_email_log("user@example.com");
/// // Returns: "u***@example.com"
/// ```
pub fn safe_email_log(email: &str) -> String {
    if email.len() > 3 {
        let parts: Vec<&str> = email.split('@').collect();
        if parts.len() == 2 && !parts[0].is_empty() {
            let first = parts[0].chars().next().map(String::from).unwrap_or_default();
            format!("{}***@{}", first, parts[1])
        } else {
            "***@***.***".to_string()
        }
    } else {
        "***@***.***".to_string()
    }
}

pub fn sql_timestamp(at: DateTime<Utc>) -> String {
    at.format(SQL_TIMESTAMP_FORMAT).to_string()
}

pub fn parse_sql_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, SQL_TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Truncate to the start of the enclosing minute
pub fn minute_bucket(at: DateTime<Utc>) -> DateTime<Utc> {
    at.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(at)
}

/// Serializes a JSON-encoded list column as an array; bad or missing data becomes `[]`
pub fn serialize_json_list<S>(raw: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    json_list(raw.as_deref()).serialize(serializer)
}

pub fn json_list(raw: Option<&str>) -> Vec<String> {
    raw.and_then(|json| serde_json::from_str::<Vec<String>>(json).ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_safe_email_log() {
        assert_eq!(safe_email_log("user@example.com"), "u***@example.com");
        assert_eq!(safe_email_log("a@b"), "***@***.***");
        assert_eq!(safe_email_log("no-at-sign"), "***@***.***");
    }

    #[test]
    fn test_timestamp_round_trip_and_ordering() {
        let early = Utc.with_ymd_and_hms(2024, 3, 9, 8, 5, 7).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap();

        assert_eq!(sql_timestamp(early), "2024-03-09 08:05:07");
        assert_eq!(parse_sql_timestamp("2024-03-09 08:05:07"), Some(early));
        // Text ordering must agree with time ordering for window comparisons
        assert!(sql_timestamp(early) < sql_timestamp(late));
    }

    #[test]
    fn test_minute_bucket() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 8, 5, 59).unwrap();
        assert_eq!(sql_timestamp(minute_bucket(at)), "2024-03-09 08:05:00");
    }

    #[test]
    fn test_json_list_tolerates_garbage() {
        assert_eq!(json_list(Some(r#"["ai","rust"]"#)), vec!["ai", "rust"]);
        assert!(json_list(Some("not json")).is_empty());
        assert!(json_list(None).is_empty());
    }
}
