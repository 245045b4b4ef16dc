//! Helpers over the structural record view.
//!
//! Records are exposed to the engine as [`serde_json::Value`] trees. This
//! module holds the shared primitives every other module leans on: path
//! resolution, numeric coercion, structural equality, date parsing, and the
//! canonical encoding used for cache keys.

use std::cmp::Ordering;
use std::fmt::Write;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

/// Stand-in for a missing field.
pub(crate) static NULL: Value = Value::Null;

/// Returns a short name for the JSON type of `value`.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Extracts a number as `f64`.
pub fn as_number(value: &Value) -> Option<f64> {
    value.as_f64()
}

/// Parses a date-valued field.
///
/// Accepts RFC 3339 strings, naive `YYYY-MM-DDTHH:MM:SS[.fff]` timestamps
/// (read as UTC), and plain `YYYY-MM-DD` dates (midnight UTC). Numbers are
/// never treated as dates.
pub fn as_date(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_date(s),
        _ => None,
    }
}

/// Parses a date string in one of the formats accepted by [`as_date`].
pub fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Looks up a single value by dotted path.
///
/// An exact key (even one containing dots) wins over path splitting.
/// Arrays are not traversed; use [`any_at_path`] for matching semantics.
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if let Value::Object(map) = value {
        if let Some(found) = map.get(path) {
            return Some(found);
        }
    }
    let mut current = value;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// A field path split into segments once, at compile time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    raw: String,
    segments: Vec<String>,
}

impl FieldPath {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let segments = raw.split('.').map(str::to_string).collect();
        FieldPath { raw, segments }
    }

    /// The path as written in the expression.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl std::fmt::Display for FieldPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Runs `test` against the value(s) found at `path` and returns `true` if any
/// of them passes.
///
/// Intermediate arrays fan out: `orders.status` tests the `status` of every
/// element of `orders`. A missing key is tested as `null`.
pub fn any_at_path(subject: &Value, path: &FieldPath, test: &mut dyn FnMut(&Value) -> bool) -> bool {
    if let Value::Object(map) = subject {
        if path.segments.len() > 1 {
            if let Some(found) = map.get(&path.raw) {
                return test(found);
            }
        }
    }
    walk(subject, &path.segments, test)
}

fn walk(subject: &Value, segments: &[String], test: &mut dyn FnMut(&Value) -> bool) -> bool {
    let Some((head, rest)) = segments.split_first() else {
        return test(subject);
    };
    match subject {
        Value::Object(map) => walk(map.get(head).unwrap_or(&NULL), rest, test),
        Value::Array(items) => items.iter().any(|item| walk(item, segments, test)),
        _ => walk(&NULL, rest, test),
    }
}

/// Structural equality with numeric comparison for numbers (`1 == 1.0`).
pub fn deep_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| deep_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(key, x)| ys.get(key).is_some_and(|y| deep_equal(x, y)))
        }
        _ => a == b,
    }
}

/// Orders two numbers or two dates. Anything else is incomparable.
pub fn compare_ordered(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(_), Value::Number(_)) => as_number(a)?.partial_cmp(&as_number(b)?),
        (Value::String(_), Value::String(_)) => Some(as_date(a)?.cmp(&as_date(b)?)),
        _ => None,
    }
}

/// Encodes `value` as JSON with object keys sorted.
///
/// Two structurally equal values always encode identically, and the encoding
/// is injective, which makes it safe to use directly as a cache key.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(key, out);
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
        Value::String(s) => write_string(s, out),
        other => {
            let _ = write!(out, "{}", other);
        }
    }
}

fn write_string(s: &str, out: &mut String) {
    // Value's Display produces a correctly escaped JSON string literal.
    let _ = write!(out, "{}", Value::String(s.to_string()));
}

/// Renders a value compactly for labels and log lines.
pub fn display(value: &Value) -> String {
    value.to_string()
}
