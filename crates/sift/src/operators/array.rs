//! Array operators: `$in`, `$nin`, `$contains`, `$size`.

use serde_json::Value;

use crate::error::{FilterError, Result};
use crate::op::Op;
use crate::pattern::fold;
use crate::value::deep_equal;

#[derive(Debug, Clone)]
pub enum ArrayArgs {
    In { negate: bool, values: Vec<Value> },
    Contains(Value),
    Size(usize),
}

impl ArrayArgs {
    /// Membership test equivalent to `{field: [A, B]}` sugar.
    pub fn one_of(values: Vec<Value>) -> Self {
        ArrayArgs::In {
            negate: false,
            values,
        }
    }
}

pub fn parse(op: Op, payload: &Value) -> Result<ArrayArgs> {
    match op {
        Op::In | Op::Nin => Ok(ArrayArgs::In {
            negate: op == Op::Nin,
            values: super::expect_array(op, payload)?.clone(),
        }),
        Op::Contains => Ok(ArrayArgs::Contains(payload.clone())),
        _ => payload
            .as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .map(ArrayArgs::Size)
            .ok_or_else(|| {
                FilterError::operator(
                    op.as_str(),
                    format!("expects a non-negative integer, got {}", payload),
                )
            }),
    }
}

pub fn evaluate(args: &ArrayArgs, actual: &Value, case_sensitive: bool) -> bool {
    match args {
        ArrayArgs::In { negate, values } => {
            let member = |v: &Value| values.iter().any(|candidate| deep_equal(v, candidate));
            let found = match actual {
                Value::Array(items) => items.iter().any(member),
                _ => member(actual),
            };
            found != *negate
        }
        ArrayArgs::Contains(needle) => match (actual, needle) {
            (Value::String(haystack), Value::String(needle)) => {
                fold(haystack, case_sensitive).contains(&fold(needle, case_sensitive))
            }
            (Value::Array(items), _) => items.iter().any(|item| deep_equal(item, needle)),
            _ => false,
        },
        ArrayArgs::Size(n) => actual.as_array().is_some_and(|items| items.len() == *n),
    }
}
