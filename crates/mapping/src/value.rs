//! Loose-typing helpers shared by conditions and transforms.
//!
//! `None` stands for an absent value, `Some(Value::Null)` for an explicit null.

use serde_json::{Number, Value};

/// Largest integer an f64 holds exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

pub(crate) fn is_blank_string(value: &Value) -> bool {
    matches!(value, Value::String(s) if s.trim().is_empty())
}

/// Present: not absent, not null, not a blank string.
pub(crate) fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(v) => !is_blank_string(v),
    }
}

/// Empty: absent, null, blank string, or an array without elements.
pub(crate) fn is_empty_value(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::Array(items)) => items.is_empty(),
        Some(v) => is_blank_string(v),
    }
}

pub(crate) fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// Strict equality: no coercion across types, numbers by numeric value.
/// Arrays and objects never compare equal, as distinct references would not.
pub(crate) fn strict_equals(actual: Option<&Value>, expected: &Value) -> bool {
    match (actual, expected) {
        (None, _) => false,
        (Some(Value::Number(a)), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Some(Value::Array(_)), _) | (Some(Value::Object(_)), _) => false,
        (Some(a), b) => a == b,
    }
}

/// Render a number the way a browser would print it.
pub(crate) fn format_number(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        i.to_string()
    } else if let Some(u) = n.as_u64() {
        u.to_string()
    } else {
        n.as_f64().map(|f| f.to_string()).unwrap_or_default()
    }
}

/// String conversion used for lookup keys.
pub(crate) fn js_string(value: Option<&Value>) -> String {
    match value {
        None => "undefined".to_string(),
        Some(Value::Null) => "null".to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => format_number(n),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => js_string(Some(other)),
            })
            .collect::<Vec<_>>()
            .join(","),
        Some(Value::Object(_)) => "[object Object]".to_string(),
    }
}

/// Build a JSON number, preferring an integer when the value is integral.
/// Non-finite input yields `None`.
pub(crate) fn number_value(f: f64) -> Option<Value> {
    if !f.is_finite() {
        return None;
    }
    if f.fract() == 0.0 && f.abs() <= MAX_SAFE_INTEGER {
        return Some(Value::from(f as i64));
    }
    Number::from_f64(f).map(Value::Number)
}

/// Numeric coercion of a string. Blank and unparsable input yields `None`.
pub(crate) fn parse_number(raw: &str) -> Option<Value> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    let radix = [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)]
        .iter()
        .find_map(|(prefix, radix)| s.strip_prefix(prefix).map(|digits| (digits, *radix)));
    if let Some((digits, radix)) = radix {
        return u64::from_str_radix(digits, radix)
            .ok()
            .and_then(|n| number_value(n as f64));
    }

    // Rust accepts spellings like "inf" and "nan"; both end up non-finite.
    s.parse::<f64>().ok().and_then(number_value)
}
