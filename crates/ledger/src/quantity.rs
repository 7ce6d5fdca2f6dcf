//! Quantity coercion for values of unreliable type.
//!
//! Quantities arrive from hand-typed forms and loosely typed store columns:
//! numbers, strings with thousands separators, empty strings, nulls. Every
//! one of them coerces to a finite `f64`; anything unusable becomes zero.
//!
//! Only `.` is a decimal point. Commas are thousands separators, so a
//! locale-style decimal comma ("1,5") reads as 15.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A quantity as it was stored, before coercion.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum RawQuantity {
    /// Null or absent.
    #[default]
    Missing,
    Number(f64),
    Text(String),
    /// Any other JSON value, kept as its JSON text.
    Other(String),
}

impl From<Value> for RawQuantity {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Missing,
            Value::Number(n) => n.as_f64().map_or(Self::Missing, Self::Number),
            Value::String(s) => Self::Text(s),
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<RawQuantity> for Value {
    fn from(raw: RawQuantity) -> Self {
        match raw {
            RawQuantity::Missing => Value::Null,
            RawQuantity::Number(n) => {
                serde_json::Number::from_f64(n).map_or(Value::Null, Value::Number)
            }
            RawQuantity::Text(s) => Value::String(s),
            RawQuantity::Other(s) => serde_json::from_str(&s).unwrap_or(Value::String(s)),
        }
    }
}

impl From<f64> for RawQuantity {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for RawQuantity {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<&str> for RawQuantity {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for RawQuantity {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl<T: Into<RawQuantity>> From<Option<T>> for RawQuantity {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Missing, Into::into)
    }
}

impl RawQuantity {
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    /// Coerced value, see [`to_number`].
    pub fn value(&self) -> f64 {
        to_number(self)
    }
}

/// Coerce a raw quantity to a finite number. Never fails, never NaN/inf.
pub fn to_number(raw: &RawQuantity) -> f64 {
    let n = match raw {
        RawQuantity::Missing => return 0.0,
        RawQuantity::Number(n) => *n,
        RawQuantity::Text(s) | RawQuantity::Other(s) => parse_text(s),
    };
    if n.is_finite() {
        n
    } else {
        0.0
    }
}

fn parse_text(s: &str) -> f64 {
    if s.trim().is_empty() {
        return 0.0;
    }
    let cleaned: String = s
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',')
        .collect();
    leading_float(&cleaned).unwrap_or(0.0)
}

/// Parse the longest prefix of `s` that is a decimal float literal
/// (`[+-]digits[.digits][e[+-]digits]`). `"12kg"` gives 12, `"1.5.2"` gives 1.5.
fn leading_float(s: &str) -> Option<f64> {
    let bytes = s.as_bytes();
    let digits_from = |mut i: usize| {
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        i
    };

    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let int_end = digits_from(end);
    let mut digit_count = int_end - end;
    end = int_end;

    if bytes.get(end) == Some(&b'.') {
        let frac_end = digits_from(end + 1);
        digit_count += frac_end - (end + 1);
        if digit_count > 0 {
            end = frac_end;
        }
    }
    if digit_count == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_end = digits_from(exp);
        if exp_end > exp {
            end = exp_end;
        }
    }

    s[..end].parse().ok()
}
