//! # Date Rehydration
//!
//! A backup file flattens every date to an ISO-8601 string. Before the
//! restored records are decoded into typed entities, [`rehydrate`] walks the
//! parsed JSON and turns every date-time string back into a date,
//! normalised to canonical UTC RFC 3339 form.
//!
//! ```text
//!   "2024-03-05T10:15:00+02:00"   ──►  2024-03-05T08:15:00Z
//!   "2024-03-05T10:15:00.250"     ──►  2024-03-05T10:15:00.250Z   (no offset: UTC)
//!   "INV-000042"                  ──►  unchanged
//!   [ .. ] / { .. }               ──►  mapped recursively
//! ```
//!
//! The walk is pure and terminates because parsed JSON is always a tree.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde_json::Value;

/// Converts a single ISO-8601 date-time string.
///
/// Accepts `YYYY-MM-DDTHH:MM:SS` with an optional fraction and an optional
/// `Z` or `±HH:MM` offset. Strings without an offset are read as UTC.
///
/// ```rust
/// use tally_core::rehydrate::rehydrate_str;
///
/// let date = rehydrate_str("2024-03-05T10:15:00+02:00").unwrap();
/// assert_eq!(date.to_rfc3339(), "2024-03-05T08:15:00+00:00");
/// assert!(rehydrate_str("2024-03-05").is_none());
/// assert!(rehydrate_str("Groceries").is_none());
/// ```
pub fn rehydrate_str(s: &str) -> Option<DateTime<Utc>> {
    if !looks_like_date_time(s) {
        return None;
    }

    if let Ok(date) = DateTime::parse_from_rfc3339(s) {
        return Some(date.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Cheap shape check so ordinary strings never reach the parsers.
fn looks_like_date_time(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() >= 19
        && b[4] == b'-'
        && b[7] == b'-'
        && b[10] == b'T'
        && b[13] == b':'
        && b[16] == b':'
        && [0, 1, 2, 3, 5, 6, 8, 9, 11, 12, 14, 15, 17, 18]
            .iter()
            .all(|&i| b[i].is_ascii_digit())
}

/// Rehydrates every date-time string inside `value`.
pub fn rehydrate(value: Value) -> Value {
    match value {
        Value::String(s) => match rehydrate_str(&s) {
            Some(date) => Value::String(date.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            None => Value::String(s),
        },
        Value::Array(items) => Value::Array(items.into_iter().map(rehydrate).collect()),
        Value::Object(map) => Value::Object(map.into_iter().map(|(k, v)| (k, rehydrate(v))).collect()),
        other => other,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalizes_offsets_to_utc() {
        let out = rehydrate(json!("2024-03-05T23:30:00-01:00"));
        assert_eq!(out, json!("2024-03-06T00:30:00Z"));
    }

    #[test]
    fn test_offsetless_is_utc() {
        assert_eq!(
            rehydrate(json!("2024-03-05T10:15:00.250")),
            json!("2024-03-05T10:15:00.250Z")
        );
    }

    #[test]
    fn test_walks_nested_structures() {
        let input = json!({
            "sales": [{
                "id": "s-1",
                "createdAt": "2024-01-01T09:00:00.000Z",
                "items": [{ "quantity": 2, "productName": "2024 calendar" }],
                "returnedAt": null
            }],
            "version": "1.0.0"
        });

        let out = rehydrate(input);
        assert_eq!(out["sales"][0]["createdAt"], "2024-01-01T09:00:00Z");
        assert_eq!(out["sales"][0]["items"][0]["productName"], "2024 calendar");
        assert_eq!(out["sales"][0]["items"][0]["quantity"], 2);
        assert!(out["sales"][0]["returnedAt"].is_null());
        assert_eq!(out["version"], "1.0.0");
    }

    #[test]
    fn test_invalid_calendar_values_pass_through() {
        assert_eq!(
            rehydrate(json!("2024-13-45T99:00:00Z")),
            json!("2024-13-45T99:00:00Z")
        );
    }

    #[test]
    fn test_output_matches_chrono_serialization() {
        let date = rehydrate_str("2024-06-01T12:00:00.123456Z").unwrap();
        let via_serde = serde_json::to_value(date).unwrap();
        assert_eq!(rehydrate(json!("2024-06-01T12:00:00.123456+00:00")), via_serde);
    }
}
