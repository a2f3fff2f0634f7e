//! Permissive front-matter date parsing.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Parse a front-matter date value. Naive values are taken as UTC.
pub(crate) fn parse_date(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    let text = match value {
        serde_json::Value::String(s) => s.trim(),
        _ => return None,
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Resolve a date field: file time when absent, parsed value when valid,
/// current time (plus a warning) when present but unparseable.
pub(crate) fn resolve(
    field: &str,
    value: Option<&serde_json::Value>,
    fallback: DateTime<Utc>,
    warnings: &mut Vec<String>,
) -> DateTime<Utc> {
    let Some(value) = value else {
        return fallback;
    };

    match parse_date(value) {
        Some(date) => date,
        None => {
            warnings.push(format!(
                "unparseable `{}` date {}, using current time",
                field, value
            ));
            Utc::now()
        }
    }
}
