//! Ordering of filter results.
//!
//! Provides [`Dir`] for sort direction, [`OrderBy`] for field-based ordering,
//! and [`normalize_order_by`] for the wire forms an `orderBy` option may take.

use std::cmp::Ordering;

use serde_json::Value;

use crate::error::{FilterError, Result};
use crate::traits::Seekable;
use crate::value::{as_date, lookup, NULL};

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dir {
    /// Ascending order (smallest first).
    #[default]
    Asc,
    /// Descending order (largest first).
    Desc,
}

impl Dir {
    /// Parses `asc`/`desc` in any case.
    pub fn parse(s: &str) -> Option<Dir> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Some(Dir::Asc),
            "desc" => Some(Dir::Desc),
            _ => None,
        }
    }

    pub fn is_asc(self) -> bool {
        matches!(self, Dir::Asc)
    }

    pub fn is_desc(self) -> bool {
        matches!(self, Dir::Desc)
    }

    /// Applies this direction to an ordering.
    ///
    /// For `Asc`, returns the ordering unchanged.
    /// For `Desc`, reverses the ordering.
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Dir::Asc => ordering,
            Dir::Desc => ordering.reverse(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Dir::Asc => "asc",
            Dir::Desc => "desc",
        }
    }
}

impl std::fmt::Display for Dir {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single ordering clause specifying a field path and direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    /// The (dotted) field to sort by.
    pub field: String,
    pub dir: Dir,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        OrderBy::new(field, Dir::Asc)
    }

    pub fn desc(field: impl Into<String>) -> Self {
        OrderBy::new(field, Dir::Desc)
    }

    pub fn new(field: impl Into<String>, dir: Dir) -> Self {
        OrderBy {
            field: field.into(),
            dir,
        }
    }

    /// Compares two field values according to this ordering.
    ///
    /// Missing and null values sort after all defined values whichever the
    /// direction.
    pub fn compare(&self, a: &Value, b: &Value, case_sensitive: bool) -> Ordering {
        match (a.is_null(), b.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => self.dir.apply(compare_values(a, b, case_sensitive)),
        }
    }
}

impl std::fmt::Display for OrderBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.field, self.dir)
    }
}

/// Normalizes the `orderBy` wire forms into an ordered list.
///
/// Accepts a field name, a `{field, direction}` object, or an array mixing
/// both. Directions are `asc`/`desc` in any case and default to `asc`.
pub fn normalize_order_by(raw: &Value) -> Result<Vec<OrderBy>> {
    match raw {
        Value::Null => Ok(Vec::new()),
        Value::Array(entries) => entries.iter().map(order_by_entry).collect(),
        other => Ok(vec![order_by_entry(other)?]),
    }
}

fn order_by_entry(entry: &Value) -> Result<OrderBy> {
    match entry {
        Value::String(field) if !field.is_empty() => Ok(OrderBy::asc(field.as_str())),
        Value::Object(map) => {
            let field = map
                .get("field")
                .and_then(Value::as_str)
                .filter(|f| !f.is_empty())
                .ok_or_else(|| {
                    FilterError::Configuration(format!(
                        "orderBy entry {} needs a non-empty 'field'",
                        entry
                    ))
                })?;
            let dir = match map.get("direction") {
                None | Some(Value::Null) => Dir::Asc,
                Some(Value::String(s)) => Dir::parse(s).ok_or_else(|| {
                    FilterError::Configuration(format!(
                        "orderBy direction must be 'asc' or 'desc', got '{}'",
                        s
                    ))
                })?,
                Some(other) => {
                    return Err(FilterError::Configuration(format!(
                        "orderBy direction must be a string, got {}",
                        other
                    )))
                }
            };
            Ok(OrderBy::new(field, dir))
        }
        other => Err(FilterError::Configuration(format!(
            "orderBy entries must be field names or {{field, direction}} objects, got {}",
            other
        ))),
    }
}

/// Compares two defined values.
///
/// Numbers compare numerically, booleans `false < true`, strings
/// case-insensitively unless `case_sensitive`. Two strings that both parse
/// as dates compare chronologically. Mixed types and NaN compare equal.
pub fn compare_values(a: &Value, b: &Value, case_sensitive: bool) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        },
        (Value::String(x), Value::String(y)) => {
            if let (Some(dx), Some(dy)) = (as_date(a), as_date(b)) {
                return dx.cmp(&dy);
            }
            if case_sensitive {
                x.cmp(y)
            } else {
                x.to_lowercase().cmp(&y.to_lowercase())
            }
        }
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

/// Compares two records using a list of ordering clauses.
///
/// Uses the first clause as the primary sort key, the second to break ties, etc.
/// If all clauses compare equal, returns `Equal`.
pub fn compare_by_orderings(a: &Value, b: &Value, orderings: &[OrderBy], case_sensitive: bool) -> Ordering {
    for order_by in orderings {
        let val_a = lookup(a, &order_by.field).unwrap_or(&NULL);
        let val_b = lookup(b, &order_by.field).unwrap_or(&NULL);
        let ordering = order_by.compare(val_a, val_b, case_sensitive);
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Stable-sorts record references by `orderings`.
///
/// Each record's structural view is computed once.
pub fn sort_items<T: Seekable + ?Sized>(items: &mut [&T], orderings: &[OrderBy], case_sensitive: bool) {
    if orderings.is_empty() || items.len() < 2 {
        return;
    }
    let views: Vec<_> = items.iter().map(|&item| item.seek_value()).collect();
    let mut order: Vec<usize> = (0..items.len()).collect();
    order.sort_by(|&a, &b| compare_by_orderings(&views[a], &views[b], orderings, case_sensitive));
    let sorted: Vec<&T> = order.into_iter().map(|i| items[i]).collect();
    items.copy_from_slice(&sorted);
}

/// Stable-sorts positions into `items` by `orderings`.
///
/// Every index must be in bounds.
pub fn sort_indices<T: Seekable>(items: &[T], indices: &mut [usize], orderings: &[OrderBy], case_sensitive: bool) {
    if orderings.is_empty() || indices.len() < 2 {
        return;
    }
    let views: Vec<_> = indices.iter().map(|&i| items[i].seek_value()).collect();
    let mut order: Vec<usize> = (0..indices.len()).collect();
    order.sort_by(|&a, &b| compare_by_orderings(&views[a], &views[b], orderings, case_sensitive));
    let sorted: Vec<usize> = order.into_iter().map(|k| indices[k]).collect();
    indices.copy_from_slice(&sorted);
}
