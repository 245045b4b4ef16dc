//! Comparison operators: `$gt`, `$gte`, `$lt`, `$lte`, `$eq`, `$ne`.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::{FilterError, Result};
use crate::op::Op;
use crate::value::{as_date, as_number, deep_equal, parse_date};

/// The right-hand side of an ordering comparison.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    Number(f64),
    Date(DateTime<Utc>),
}

impl Bound {
    /// Orders `actual` relative to this bound. Arrays are handled by the caller.
    pub fn compare(&self, actual: &Value) -> Option<Ordering> {
        match self {
            Bound::Number(n) => as_number(actual)?.partial_cmp(n),
            Bound::Date(d) => Some(as_date(actual)?.cmp(d)),
        }
    }
}

#[derive(Debug, Clone)]
pub enum ComparisonArgs {
    Ordered { op: Op, bound: Bound },
    Equal { negate: bool, value: Value },
}

pub fn parse(op: Op, payload: &Value) -> Result<ComparisonArgs> {
    match op {
        Op::Eq | Op::Ne => Ok(ComparisonArgs::Equal {
            negate: op == Op::Ne,
            value: payload.clone(),
        }),
        _ => {
            let bound = match payload {
                Value::Number(n) => n.as_f64().map(Bound::Number),
                Value::String(s) => parse_date(s).map(Bound::Date),
                _ => None,
            };
            bound
                .map(|bound| ComparisonArgs::Ordered { op, bound })
                .ok_or_else(|| {
                    FilterError::operator(
                        op.as_str(),
                        format!("expects a number or a date string, got {}", payload),
                    )
                })
        }
    }
}

/// Evaluates a comparison.
///
/// Ordering comparisons hold if any element of an array-valued actual
/// satisfies them. Equality is structural over the whole value.
pub fn evaluate(args: &ComparisonArgs, actual: &Value) -> bool {
    match args {
        ComparisonArgs::Ordered { op, bound } => match actual {
            Value::Array(items) => items.iter().any(|item| ordered(*op, bound, item)),
            _ => ordered(*op, bound, actual),
        },
        ComparisonArgs::Equal { negate, value } => deep_equal(actual, value) != *negate,
    }
}

fn ordered(op: Op, bound: &Bound, actual: &Value) -> bool {
    bound
        .compare(actual)
        .is_some_and(|ordering| op.eval_ordering(ordering))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn check(op: Op, payload: Value, actual: Value) -> bool {
        evaluate(&parse(op, &payload).unwrap(), &actual)
    }

    #[test]
    fn numeric_ordering() {
        assert!(check(Op::Gt, json!(18), json!(21)));
        assert!(!check(Op::Gt, json!(18), json!(18)));
        assert!(check(Op::Gte, json!(18), json!(18)));
        assert!(check(Op::Lt, json!(18), json!(17.5)));
        assert!(check(Op::Lte, json!(18), json!(18.0)));
        assert!(!check(Op::Lt, json!(18), json!("17")));
        assert!(!check(Op::Lt, json!(18), json!(null)));
    }

    #[test]
    fn date_ordering() {
        assert!(check(Op::Gt, json!("2024-01-01"), json!("2024-06-01T12:00:00Z")));
        assert!(!check(Op::Gt, json!("2024-01-01"), json!("2023-12-31")));
        assert!(!check(Op::Gt, json!("2024-01-01"), json!(1_800_000_000)));
    }

    #[test]
    fn arrays_match_any_element() {
        assert!(check(Op::Gt, json!(5), json!([1, 7])));
        assert!(!check(Op::Gt, json!(5), json!([1, 2])));
    }

    #[test]
    fn structural_equality() {
        assert!(check(Op::Eq, json!({"a": [1, 2]}), json!({"a": [1.0, 2]})));
        assert!(!check(Op::Eq, json!("Berlin"), json!("berlin")));
        assert!(check(Op::Ne, json!("Berlin"), json!("Paris")));
        assert!(check(Op::Ne, json!("Berlin"), json!(null)));
    }

    #[test]
    fn rejects_unordered_payloads() {
        let err = parse(Op::Gt, &json!("soon")).unwrap_err();
        assert!(matches!(err, FilterError::Operator { operator: "$gt", .. }));
        assert!(parse(Op::Lte, &json!([1])).is_err());
    }
}
