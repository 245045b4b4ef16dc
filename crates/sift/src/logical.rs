//! Logical combinators: `$and`, `$or`, `$not`.
//!
//! Payload shape problems fail fast with an operator error naming the
//! combinator. Nesting is unbounded: combinators re-enter the parser and the
//! compiler recursively and never count against `maxDepth`.

use serde_json::Value;

use crate::error::{FilterError, Result};
use crate::op::Op;

/// Checks the payload shape of a logical combinator and returns its operands.
pub fn operands(op: Op, payload: &Value) -> Result<Vec<&Value>> {
    match op {
        Op::And | Op::Or => match payload {
            Value::Array(items) => Ok(items.iter().collect()),
            other => Err(FilterError::operator(
                op.as_str(),
                format!(
                    "expects an array of sub-expressions, got {}",
                    crate::value::type_name(other)
                ),
            )),
        },
        Op::Not => match payload {
            Value::Array(_) => Err(FilterError::operator(
                op.as_str(),
                "expects a single sub-expression, got an array",
            )),
            other => Ok(vec![other]),
        },
        other => Err(FilterError::operator(
            other.as_str(),
            "is not a logical combinator",
        )),
    }
}

/// Combines operand outcomes, stopping at the first decisive one.
pub fn combine(op: Op, mut outcomes: impl Iterator<Item = bool>) -> bool {
    match op {
        Op::And => outcomes.all(|b| b),
        Op::Or => outcomes.any(|b| b),
        Op::Not => !outcomes.next().unwrap_or(false),
        _ => false,
    }
}

/// Combines outcomes that were all computed up front.
pub fn combine_all(op: Op, outcomes: &[bool]) -> bool {
    combine(op, outcomes.iter().copied())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn and_or_need_arrays() {
        let payload = json!([{"a": 1}, {"b": 2}]);
        assert_eq!(operands(Op::And, &payload).unwrap().len(), 2);
        assert_eq!(operands(Op::Or, &json!([])).unwrap().len(), 0);

        let err = operands(Op::And, &json!({"a": 1})).unwrap_err();
        assert!(matches!(err, FilterError::Operator { operator: "$and", .. }));
        assert!(err.to_string().contains("array"));

        let err = operands(Op::Or, &json!("x")).unwrap_err();
        assert!(matches!(err, FilterError::Operator { operator: "$or", .. }));
    }

    #[test]
    fn not_rejects_arrays() {
        assert_eq!(operands(Op::Not, &json!({"a": 1})).unwrap().len(), 1);
        assert_eq!(operands(Op::Not, &json!("x")).unwrap().len(), 1);
        let err = operands(Op::Not, &json!([{"a": 1}])).unwrap_err();
        assert!(matches!(err, FilterError::Operator { operator: "$not", .. }));
    }

    #[test]
    fn empty_operands() {
        assert!(combine(Op::And, std::iter::empty()));
        assert!(!combine(Op::Or, std::iter::empty()));
    }

    #[test]
    fn combine_short_circuits() {
        let mut seen = 0;
        let result = combine(
            Op::Or,
            [false, true, true].into_iter().inspect(|_| seen += 1),
        );
        assert!(result);
        assert_eq!(seen, 2);

        assert!(!combine_all(Op::And, &[true, false]));
        assert!(combine_all(Op::Not, &[false]));
    }
}
