//! Attribute casting applied on read

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::backends::sqlite::SQLITE_DATETIME_FORMAT;
use crate::backends::DatabaseValue;

/// Semantic type an attribute is converted to when read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastType {
    Integer,
    Float,
    String,
    Boolean,
    DateTime,
    Json,
}

impl CastType {
    /// Convert `value`; values that cannot be converted are returned unchanged
    pub fn apply(&self, value: &DatabaseValue) -> DatabaseValue {
        if value.is_null() {
            return DatabaseValue::Null;
        }

        let cast = match self {
            CastType::Integer => value.as_i64().map(DatabaseValue::Int64),
            CastType::Float => value.as_f64().map(DatabaseValue::Float64),
            CastType::String => Some(DatabaseValue::String(to_text(value))),
            CastType::Boolean => to_bool(value).map(DatabaseValue::Bool),
            CastType::DateTime => to_datetime(value).map(DatabaseValue::DateTime),
            CastType::Json => match value {
                DatabaseValue::Json(_) => Some(value.clone()),
                DatabaseValue::String(s) => serde_json::from_str(s).ok().map(DatabaseValue::Json),
                other => Some(DatabaseValue::Json(other.to_json())),
            },
        };

        cast.unwrap_or_else(|| value.clone())
    }
}

fn to_text(value: &DatabaseValue) -> String {
    match value {
        DatabaseValue::String(s) => s.clone(),
        DatabaseValue::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
        DatabaseValue::DateTime(dt) => dt.format(SQLITE_DATETIME_FORMAT).to_string(),
        other => other.to_json().to_string(),
    }
}

fn to_bool(value: &DatabaseValue) -> Option<bool> {
    match value {
        DatabaseValue::Bool(b) => Some(*b),
        DatabaseValue::Int64(i) => Some(*i != 0),
        DatabaseValue::Float64(f) => Some(*f != 0.0),
        DatabaseValue::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "t" | "yes" | "on" => Some(true),
            "0" | "false" | "f" | "no" | "off" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn to_datetime(value: &DatabaseValue) -> Option<DateTime<Utc>> {
    match value {
        DatabaseValue::DateTime(dt) => Some(*dt),
        DatabaseValue::String(s) => parse_datetime(s),
        DatabaseValue::Int64(secs) => Utc.timestamp_opt(*secs, 0).single(),
        _ => None,
    }
}

/// Parse RFC 3339, `YYYY-MM-DD HH:MM:SS[.f]` (taken as UTC) or a bare date
pub fn parse_datetime(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_boolean_cast_from_storage_values() {
        assert_eq!(CastType::Boolean.apply(&DatabaseValue::Int64(1)), DatabaseValue::Bool(true));
        assert_eq!(CastType::Boolean.apply(&DatabaseValue::from("0")), DatabaseValue::Bool(false));
        assert_eq!(CastType::Boolean.apply(&DatabaseValue::Null), DatabaseValue::Null);
    }

    #[test]
    fn test_datetime_cast_accepts_sqlite_text() {
        let cast = CastType::DateTime.apply(&DatabaseValue::from("2024-03-01 12:30:00"));
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        assert_eq!(cast, DatabaseValue::DateTime(expected));

        let cast = CastType::DateTime.apply(&DatabaseValue::from("2024-03-01T12:30:00+00:00"));
        assert_eq!(cast, DatabaseValue::DateTime(expected));
    }

    #[test]
    fn test_json_cast_parses_text() {
        let cast = CastType::Json.apply(&DatabaseValue::from(r#"{"tier":"pro"}"#));
        assert_eq!(cast, DatabaseValue::Json(json!({"tier": "pro"})));
    }

    #[test]
    fn test_uncastable_value_is_kept() {
        let raw = DatabaseValue::from("n/a");
        assert_eq!(CastType::Integer.apply(&raw), raw);
        assert_eq!(CastType::Float.apply(&DatabaseValue::Int64(2)), DatabaseValue::Float64(2.0));
        assert_eq!(CastType::String.apply(&DatabaseValue::Int64(2)), DatabaseValue::from("2"));
    }
}
