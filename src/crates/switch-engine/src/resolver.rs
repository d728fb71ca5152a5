//! Value resolution: turns raw per-record parameters into comparison operands

use crate::config::DataType;
use crate::value::ScalarValue;
use crate::{Result, SwitchError};
use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Layouts with a trailing `Z` or numeric offset (`+02:00`, `+0200`, `+02`)
const OFFSET_DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%#z",
    "%Y-%m-%dT%H:%M%#z",
    "%Y-%m-%d %H:%M:%S%.f%#z",
    "%Y-%m-%d %H:%M%#z",
];

/// Layouts without an offset, read as UTC
const NAIVE_DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Normalize an operand for the given data type
///
/// Date-times become epoch milliseconds; every other type passes through
/// untouched. Left and right operands go through the same path.
pub fn normalize(data_type: DataType, raw: ScalarValue) -> Result<ScalarValue> {
    match data_type {
        DataType::DateTime => parse_date_value(&raw).map(ScalarValue::Number),
        DataType::Boolean | DataType::Number | DataType::String => Ok(raw),
    }
}

/// Convert a date-time operand into epoch milliseconds
///
/// Numbers are taken as-is, strings are parsed as calendar dates, and
/// date-time values report their own timestamp.
pub fn parse_date_value(value: &ScalarValue) -> Result<f64> {
    let parsed = match value {
        ScalarValue::Number(n) => Some(*n),
        ScalarValue::String(s) => parse_date_str(s).map(|ms| ms as f64),
        ScalarValue::DateTime(_) => value.epoch_millis().map(|ms| ms as f64),
        ScalarValue::Null | ScalarValue::Bool(_) => None,
    };

    parsed.ok_or_else(|| SwitchError::InvalidDateTime(value.to_string()))
}

/// Parse a calendar date/time string into epoch milliseconds
pub fn parse_date_str(raw: &str) -> Option<i64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.timestamp_millis());
    }

    for format in OFFSET_DATE_TIME_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, format) {
            return Some(dt.timestamp_millis());
        }
    }
    for format in NAIVE_DATE_TIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc().timestamp_millis());
        }
    }

    let date = if s.len() == 4 && s.bytes().all(|b| b.is_ascii_digit()) {
        NaiveDate::from_ymd_opt(s.parse().ok()?, 1, 1)?
    } else {
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .or_else(|_| NaiveDate::parse_from_str(&format!("{}-01", s), "%Y-%m-%d"))
            .ok()?
    };
    date.and_hms_opt(0, 0, 0)
        .map(|midnight| midnight.and_utc().timestamp_millis())
}
