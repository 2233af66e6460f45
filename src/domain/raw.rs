//! Tolerant accessors over raw broker JSON.
//!
//! Raw records are often partially populated. A missing or null
//! field reads as `None`; callers decide whether that is fatal.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde_json::Value;

/// String view of a field. Numbers keep their JSON text (serde_json is
/// built with `arbitrary_precision`), so no float round-trip happens.
pub fn string(record: &Value, key: &str) -> Option<String> {
    match record.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// First present field among `keys`.
pub fn string_any(record: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| string(record, key))
}

/// Parse an RFC 3339 timestamp (nanosecond precision allowed) into
/// Unix milliseconds.
pub fn parse_date(value: &str) -> Option<i64> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc).timestamp_millis())
}

/// Timestamp field as Unix milliseconds.
pub fn timestamp(record: &Value, key: &str) -> Option<i64> {
    string(record, key).and_then(|s| parse_date(&s))
}

/// Render Unix milliseconds as ISO 8601 with millisecond precision.
pub fn iso8601(millis: i64) -> Option<String> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_string_field_variants() {
        let record = json!({"a": "1.5", "b": 7, "c": null, "d": {"x": 1}});
        assert_eq!(string(&record, "a").as_deref(), Some("1.5"));
        assert_eq!(string(&record, "b").as_deref(), Some("7"));
        assert_eq!(string(&record, "c"), None);
        assert_eq!(string(&record, "d"), None);
        assert_eq!(string(&record, "missing"), None);
        assert_eq!(string_any(&record, &["missing", "b"]).as_deref(), Some("7"));
    }

    #[test]
    fn test_numbers_keep_source_text() {
        let record: Value =
            serde_json::from_str(r#"{"units": 12345678901234567.25, "price": 101.10}"#).unwrap();
        assert_eq!(string(&record, "units").as_deref(), Some("12345678901234567.25"));
        assert_eq!(string(&record, "price").as_deref(), Some("101.10"));
    }

    #[test]
    fn test_nanosecond_timestamps() {
        let ms = parse_date("2022-02-03T11:38:15.490811234Z").unwrap();
        assert_eq!(ms, 1_643_888_295_490);
        assert_eq!(iso8601(ms).unwrap(), "2022-02-03T11:38:15.490Z");
    }

    #[test]
    fn test_bad_timestamp_is_absent() {
        assert_eq!(parse_date("yesterday"), None);
    }
}
