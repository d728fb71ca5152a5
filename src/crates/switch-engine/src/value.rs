//! Scalar operands and their coercion rules
//!
//! Hosts hand the engine loosely typed values. Comparisons need three views
//! of such a value: strict identity (for `equal`), a number (for ordering),
//! and a string (for substring and regex tests). Those views live here so
//! the operator table stays a plain `match`.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use std::fmt;

/// A single comparison operand
///
/// Equality is strict: values of different variants are never equal and
/// `NaN` is not equal to itself.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    DateTime(DateTime<Utc>),
}

impl ScalarValue {
    /// Numeric view, `NaN` when the value has no numeric reading
    pub fn to_number(&self) -> f64 {
        match self {
            ScalarValue::Null => 0.0,
            ScalarValue::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            ScalarValue::Number(n) => *n,
            ScalarValue::String(s) => parse_numeric_literal(s),
            ScalarValue::DateTime(dt) => dt.timestamp_millis() as f64,
        }
    }

    /// Numeric view used by ordering operators: anything without a numeric
    /// reading counts as zero
    pub fn coerce_number(&self) -> f64 {
        let n = self.to_number();
        if n.is_nan() {
            0.0
        } else {
            n
        }
    }

    /// String view used by substring, prefix, suffix and regex tests
    ///
    /// Same as `Display` except that null reads as the empty string.
    pub fn as_text(&self) -> String {
        match self {
            ScalarValue::Null => String::new(),
            ScalarValue::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    /// Lowercased string view
    pub fn folded(&self) -> ScalarValue {
        ScalarValue::String(self.as_text().to_lowercase())
    }

    /// Epoch milliseconds carried by a date-time value
    pub fn epoch_millis(&self) -> Option<i64> {
        match self {
            ScalarValue::DateTime(dt) => Some(dt.timestamp_millis()),
            _ => None,
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Null => write!(f, "null"),
            ScalarValue::Bool(b) => write!(f, "{}", b),
            ScalarValue::Number(n) => write!(f, "{}", format_number(*n)),
            ScalarValue::String(s) => write!(f, "{}", s),
            ScalarValue::DateTime(dt) => {
                write!(f, "{}", dt.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
        }
    }
}

impl From<&Value> for ScalarValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => ScalarValue::Null,
            Value::Bool(b) => ScalarValue::Bool(*b),
            Value::Number(n) => ScalarValue::Number(n.as_f64().unwrap_or(f64::NAN)),
            Value::String(s) => ScalarValue::String(s.clone()),
            // Nested documents compare by their compact JSON text
            Value::Array(_) | Value::Object(_) => ScalarValue::String(value.to_string()),
        }
    }
}

impl From<Value> for ScalarValue {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => ScalarValue::String(s),
            other => ScalarValue::from(&other),
        }
    }
}

impl From<bool> for ScalarValue {
    fn from(value: bool) -> Self {
        ScalarValue::Bool(value)
    }
}

impl From<f64> for ScalarValue {
    fn from(value: f64) -> Self {
        ScalarValue::Number(value)
    }
}

impl From<i64> for ScalarValue {
    fn from(value: i64) -> Self {
        ScalarValue::Number(value as f64)
    }
}

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        ScalarValue::String(value.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(value: String) -> Self {
        ScalarValue::String(value)
    }
}

impl From<DateTime<Utc>> for ScalarValue {
    fn from(value: DateTime<Utc>) -> Self {
        ScalarValue::DateTime(value)
    }
}

/// Shortest decimal rendering; exponent form outside `[1e-6, 1e21)`
pub(crate) fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }

    let magnitude = n.abs();
    if (1e-6..1e21).contains(&magnitude) {
        return format!("{}", n);
    }

    let formatted = format!("{:e}", n);
    match formatted.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{}e+{}", mantissa, exponent)
        }
        _ => formatted,
    }
}

/// Parse a string the way a loosely typed host converts text to a number
///
/// Surrounding whitespace is ignored and blank text reads as zero. Decimal
/// literals, `Infinity`, and unsigned `0x`/`0o`/`0b` integer literals are
/// accepted; everything else is `NaN`.
fn parse_numeric_literal(raw: &str) -> f64 {
    let s = raw.trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}');
    if s.is_empty() {
        return 0.0;
    }

    match s {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }

    let radix = match s.get(..2) {
        Some("0x") | Some("0X") => Some(16),
        Some("0o") | Some("0O") => Some(8),
        Some("0b") | Some("0B") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        return parse_radix_integer(&s[2..], radix);
    }

    let unsigned = s.trim_start_matches(['+', '-']);
    if s.len() - unsigned.len() > 1 {
        return f64::NAN;
    }
    // Rust also accepts "inf" and "nan" spellings, which hosts do not
    if unsigned
        .chars()
        .any(|c| c.is_alphabetic() && c != 'e' && c != 'E')
    {
        return f64::NAN;
    }

    s.parse::<f64>().unwrap_or(f64::NAN)
}

fn parse_radix_integer(digits: &str, radix: u32) -> f64 {
    if digits.is_empty() {
        return f64::NAN;
    }
    digits.chars().try_fold(0.0_f64, |acc, c| {
        c.to_digit(radix).map(|d| acc * radix as f64 + d as f64)
    })
    .unwrap_or(f64::NAN)
}
