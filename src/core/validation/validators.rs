//! Value predicates behind the standard rules
//!
//! Every predicate answers one question about a JSON value. Scalars sent as
//! strings (query strings, url-encoded and multipart bodies) are accepted
//! wherever the rule has an obvious string form, e.g. `"42"` is an integer.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use uuid::Uuid;

/// Value is present and not empty (null, blank string, empty array or object)
pub fn required(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(map)) => !map.is_empty(),
        Some(_) => true,
    }
}

pub fn string(value: &Value) -> bool {
    value.is_string()
}

/// Whole numbers, also as strings (`"-5"`, not `"5.0"`)
pub fn integer(value: &Value) -> bool {
    match value {
        Value::Number(n) => {
            n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0)
        }
        Value::String(s) => {
            let s = s.trim();
            let digits = s.strip_prefix(['-', '+']).unwrap_or(s);
            !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
        }
        _ => false,
    }
}

/// Numbers, also as strings (`"3.14"`, `"1e3"`)
pub fn numeric(value: &Value) -> bool {
    as_number(value).is_some()
}

/// `true`, `false`, `0`, `1` and their string forms
pub fn boolean(value: &Value) -> bool {
    match value {
        Value::Bool(_) => true,
        Value::Number(n) => matches!(n.as_i64(), Some(0) | Some(1)),
        Value::String(s) => matches!(s.as_str(), "0" | "1" | "true" | "false"),
        _ => false,
    }
}

/// Lists and maps both count as arrays
pub fn array(value: &Value) -> bool {
    value.is_array() || value.is_object()
}

pub fn email(value: &Value) -> bool {
    static EMAIL_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
    matches_pattern(
        &EMAIL_REGEX,
        r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$",
        value,
    )
}

pub fn url(value: &Value) -> bool {
    static URL_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
    matches_pattern(&URL_REGEX, r"^https?://[^\s/$.?#].[^\s]*$", value)
}

pub fn uuid(value: &Value) -> bool {
    value
        .as_str()
        .is_some_and(|s| Uuid::parse_str(s).is_ok())
}

pub fn regex(pattern: &Regex, value: &Value) -> bool {
    match value {
        Value::String(s) => pattern.is_match(s),
        Value::Number(n) => pattern.is_match(&n.to_string()),
        _ => false,
    }
}

/// Value, as its string form, is one of `allowed`
pub fn in_list(allowed: &[String], value: &Value) -> bool {
    match scalar_string(value) {
        Some(s) => allowed.iter().any(|a| *a == s),
        None => false,
    }
}

/// String parses as a date, datetime or time in the chrono `format`
pub fn date_format(format: &str, value: &Value) -> bool {
    let Some(s) = value.as_str() else {
        return false;
    };
    chrono::NaiveDateTime::parse_from_str(s, format).is_ok()
        || chrono::NaiveDate::parse_from_str(s, format).is_ok()
        || chrono::NaiveTime::parse_from_str(s, format).is_ok()
}

/// The measured size used by `min`, `max`, `between` and `size`
///
/// Numbers (or numeric strings when `numeric` is set) measure their value,
/// strings their character count, arrays and objects their length.
pub fn size_of(value: &Value, numeric: bool) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) if numeric => as_number(value).or(Some(s.chars().count() as f64)),
        Value::String(s) => Some(s.chars().count() as f64),
        Value::Array(items) => Some(items.len() as f64),
        Value::Object(map) => Some(map.len() as f64),
        _ => None,
    }
}

/// Loose equality used by `same`, `different` and `confirmed`
pub fn same_value(left: Option<&Value>, right: Option<&Value>) -> bool {
    match (left, right) {
        (Some(l), Some(r)) => match (scalar_string(l), scalar_string(r)) {
            (Some(a), Some(b)) => a == b,
            _ => l == r,
        },
        (None, None) => true,
        _ => false,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn matches_pattern(cell: &OnceLock<Option<Regex>>, pattern: &str, value: &Value) -> bool {
    let Some(s) = value.as_str() else {
        return false;
    };
    cell.get_or_init(|| Regex::new(pattern).ok())
        .as_ref()
        .is_some_and(|re| re.is_match(s))
}
