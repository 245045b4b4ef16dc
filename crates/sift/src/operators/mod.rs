//! The operator library.
//!
//! Each family module owns its payload types, payload parsing, and
//! evaluation. Parsing happens once, during validation; evaluation takes
//! the actual field value and never fails: values of the wrong type simply
//! do not match.

pub mod array;
pub mod comparison;
pub mod datetime;
pub mod geo;
pub mod string;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::error::{FilterError, Result};
use crate::op::{Family, Op};

pub use array::ArrayArgs;
pub use comparison::{Bound, ComparisonArgs};
pub use datetime::{AgeQuery, AgeUnit, DateTimeQuery, RelativeTimeQuery, TimeOfDayQuery};
pub use geo::{BoundingBox, GeoPoint, GeoQuery, NearQuery, Polygon};
pub use string::{StringArgs, StringTest};

/// A validated operator application: the operator, its raw payload, and the
/// typed arguments parsed from it.
#[derive(Debug, Clone)]
pub struct OperatorCall {
    op: Op,
    payload: Value,
    args: OperatorArgs,
}

/// Typed operator arguments, grouped by family.
#[derive(Debug, Clone)]
pub enum OperatorArgs {
    Comparison(ComparisonArgs),
    Array(ArrayArgs),
    String(StringArgs),
    Geo(GeoQuery),
    DateTime(DateTimeQuery),
}

impl OperatorCall {
    /// Parses the payload of a non-logical operator.
    ///
    /// Shape problems are reported as [`FilterError::Operator`]; bad
    /// coordinates as [`FilterError::Geospatial`]; bad patterns as
    /// [`FilterError::InvalidRegex`].
    pub fn parse(op: Op, payload: &Value) -> Result<Self> {
        let args = match op.family() {
            Family::Comparison => OperatorArgs::Comparison(comparison::parse(op, payload)?),
            Family::Array => OperatorArgs::Array(array::parse(op, payload)?),
            Family::String => OperatorArgs::String(string::parse(op, payload)?),
            Family::Geo => OperatorArgs::Geo(geo::parse(op, payload)?),
            Family::DateTime => OperatorArgs::DateTime(datetime::parse(op, payload)?),
            Family::Logical => {
                return Err(FilterError::operator(
                    op.as_str(),
                    "logical combinators are not field operators",
                ))
            }
        };
        Ok(OperatorCall {
            op,
            payload: payload.clone(),
            args,
        })
    }

    pub(crate) fn from_parts(op: Op, payload: Value, args: OperatorArgs) -> Self {
        OperatorCall { op, payload, args }
    }

    pub fn op(&self) -> Op {
        self.op
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn args(&self) -> &OperatorArgs {
        &self.args
    }

    /// Prepares the call for evaluation under the given case sensitivity.
    pub fn compile(&self, case_sensitive: bool) -> Result<CompiledOperator> {
        Ok(match &self.args {
            OperatorArgs::Comparison(args) => CompiledOperator::Comparison(args.clone()),
            OperatorArgs::Array(args) => CompiledOperator::Array(args.clone()),
            OperatorArgs::String(args) => {
                CompiledOperator::String(string::compile(args, case_sensitive)?)
            }
            OperatorArgs::Geo(query) => CompiledOperator::Geo(query.clone()),
            OperatorArgs::DateTime(query) => CompiledOperator::DateTime(query.clone()),
        })
    }
}

/// Per-evaluation settings shared by all operators of one predicate.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext {
    pub case_sensitive: bool,
    /// Fixed reference instant; the wall clock is read when `None`.
    pub fixed_now: Option<DateTime<Utc>>,
}

impl EvalContext {
    pub fn now(&self) -> DateTime<Utc> {
        self.fixed_now.unwrap_or_else(Utc::now)
    }
}

/// An operator ready for evaluation.
#[derive(Debug, Clone)]
pub enum CompiledOperator {
    Comparison(ComparisonArgs),
    Array(ArrayArgs),
    String(StringTest),
    Geo(GeoQuery),
    DateTime(DateTimeQuery),
}

impl CompiledOperator {
    pub fn evaluate(&self, actual: &Value, ctx: &EvalContext) -> bool {
        match self {
            CompiledOperator::Comparison(args) => comparison::evaluate(args, actual),
            CompiledOperator::Array(args) => array::evaluate(args, actual, ctx.case_sensitive),
            CompiledOperator::String(test) => string::evaluate(test, actual),
            CompiledOperator::Geo(query) => geo::evaluate(query, actual),
            CompiledOperator::DateTime(query) => datetime::evaluate(query, actual, ctx),
        }
    }
}

// Payload shape helpers shared by the family parsers.

pub(crate) fn expect_object<'a>(op: Op, payload: &'a Value) -> Result<&'a Map<String, Value>> {
    payload.as_object().ok_or_else(|| {
        FilterError::operator(
            op.as_str(),
            format!("expects an object, got {}", crate::value::type_name(payload)),
        )
    })
}

pub(crate) fn expect_array<'a>(op: Op, payload: &'a Value) -> Result<&'a Vec<Value>> {
    payload.as_array().ok_or_else(|| {
        FilterError::operator(
            op.as_str(),
            format!("expects an array, got {}", crate::value::type_name(payload)),
        )
    })
}

pub(crate) fn expect_string(op: Op, payload: &Value) -> Result<String> {
    payload.as_str().map(str::to_string).ok_or_else(|| {
        FilterError::operator(
            op.as_str(),
            format!("expects a string, got {}", crate::value::type_name(payload)),
        )
    })
}

pub(crate) fn expect_bool(op: Op, payload: &Value) -> Result<bool> {
    payload.as_bool().ok_or_else(|| {
        FilterError::operator(
            op.as_str(),
            format!("expects a boolean, got {}", crate::value::type_name(payload)),
        )
    })
}

pub(crate) fn expect_date(op: Op, payload: &Value) -> Result<DateTime<Utc>> {
    crate::value::as_date(payload).ok_or_else(|| {
        FilterError::operator(
            op.as_str(),
            format!("expects a date string, got {}", payload),
        )
    })
}

/// Reads an optional non-negative number from an object payload.
pub(crate) fn optional_number(op: Op, map: &Map<String, Value>, key: &str) -> Result<Option<f64>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => match v.as_f64() {
            Some(n) if n >= 0.0 => Ok(Some(n)),
            _ => Err(FilterError::operator(
                op.as_str(),
                format!("'{}' must be a non-negative number, got {}", key, v),
            )),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_dispatches_by_family() {
        let call = OperatorCall::parse(Op::Gt, &json!(5)).unwrap();
        assert!(matches!(call.args(), OperatorArgs::Comparison(_)));
        assert_eq!(call.payload(), &json!(5));

        let call = OperatorCall::parse(Op::In, &json!([1, 2])).unwrap();
        assert!(matches!(call.args(), OperatorArgs::Array(_)));

        let call = OperatorCall::parse(Op::IsWeekend, &json!(true)).unwrap();
        assert!(matches!(call.args(), OperatorArgs::DateTime(_)));
    }

    #[test]
    fn logical_ops_are_rejected_here() {
        let err = OperatorCall::parse(Op::And, &json!([])).unwrap_err();
        assert!(matches!(err, FilterError::Operator { operator: "$and", .. }));
    }

    #[test]
    fn compiled_operator_evaluates() {
        let ctx = EvalContext {
            case_sensitive: false,
            fixed_now: None,
        };
        let op = OperatorCall::parse(Op::StartsWith, &json!("ber"))
            .unwrap()
            .compile(false)
            .unwrap();
        assert!(op.evaluate(&json!("Berlin"), &ctx));
        assert!(!op.evaluate(&json!("Paris"), &ctx));
    }
}
