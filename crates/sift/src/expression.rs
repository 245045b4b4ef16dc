//! The expression type accepted by every entry point.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::clause::Clause;
use crate::error::{FilterError, Result, Violation};
use crate::validate::parse_clause;
use crate::value::canonical_json;

/// A caller-supplied test over records.
pub type PredicateFn<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// A validated filter expression.
///
/// The shape is decided once, when the expression is built; compilation
/// dispatches on the variant and never re-inspects raw JSON.
///
/// # Example
///
/// ```
/// use serde_json::{json, Value};
/// use sift::Expression;
///
/// let by_shape: Expression<Value> = Expression::parse(&json!({"age": {"$gte": 18}})).unwrap();
/// let by_text: Expression<Value> = Expression::parse(&json!("berlin")).unwrap();
/// let by_fn: Expression<Value> = Expression::predicate(|v: &Value| v["active"] == true);
/// ```
pub enum Expression<T> {
    /// Used as-is; compilation is the identity.
    Predicate(PredicateFn<T>),
    /// Matched against the item, or against any property of an object item.
    Primitive(Value),
    /// A parsed object expression and the JSON it came from.
    Object { clause: Clause, source: Value },
}

impl<T> Expression<T> {
    /// Validates a raw JSON expression.
    pub fn parse(raw: &Value) -> Result<Self> {
        match raw {
            Value::Object(_) => Ok(Expression::Object {
                clause: parse_clause(raw)?,
                source: raw.clone(),
            }),
            Value::Array(_) => Err(FilterError::InvalidExpression {
                violations: vec![Violation::new(
                    "$root",
                    "expected a primitive or an object expression, got array",
                )],
            }),
            primitive => Ok(Expression::Primitive(primitive.clone())),
        }
    }

    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Expression::Predicate(Arc::new(f))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Expression::Predicate(_) => "predicate",
            Expression::Primitive(_) => "primitive",
            Expression::Object { .. } => "object",
        }
    }

    pub fn clause(&self) -> Option<&Clause> {
        match self {
            Expression::Object { clause, .. } => Some(clause),
            _ => None,
        }
    }

    /// Deterministic identity of the expression's shape.
    ///
    /// Object and primitive expressions are keyed by their canonical JSON, so
    /// structurally equal expressions share a key. Predicates are keyed by
    /// the address of their shared closure.
    pub fn cache_key(&self) -> String {
        match self {
            Expression::Predicate(f) => format!("fn:{:p}", Arc::as_ptr(f) as *const ()),
            Expression::Primitive(value) => format!("prim:{}", canonical_json(value)),
            Expression::Object { source, .. } => format!("expr:{}", canonical_json(source)),
        }
    }

    /// Whether matching depends on the current time.
    pub fn reads_clock(&self) -> bool {
        self.clause().is_some_and(Clause::reads_clock)
    }
}

impl<T> Clone for Expression<T> {
    fn clone(&self) -> Self {
        match self {
            Expression::Predicate(f) => Expression::Predicate(Arc::clone(f)),
            Expression::Primitive(value) => Expression::Primitive(value.clone()),
            Expression::Object { clause, source } => Expression::Object {
                clause: clause.clone(),
                source: source.clone(),
            },
        }
    }
}

impl<T> fmt::Debug for Expression<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Predicate(_) => f.write_str("Expression::Predicate(..)"),
            Expression::Primitive(value) => write!(f, "Expression::Primitive({})", value),
            Expression::Object { clause, .. } => write!(f, "Expression::Object({})", clause),
        }
    }
}

/// Conversion into a validated [`Expression`].
///
/// Lets entry points take JSON values, string literals, and prebuilt
/// expressions alike.
pub trait IntoExpression<T> {
    fn into_expression(self) -> Result<Expression<T>>;
}

impl<T> IntoExpression<T> for Expression<T> {
    fn into_expression(self) -> Result<Expression<T>> {
        Ok(self)
    }
}

impl<T> IntoExpression<T> for &Expression<T> {
    fn into_expression(self) -> Result<Expression<T>> {
        Ok(self.clone())
    }
}

impl<T> IntoExpression<T> for Value {
    fn into_expression(self) -> Result<Expression<T>> {
        Expression::parse(&self)
    }
}

impl<T> IntoExpression<T> for &Value {
    fn into_expression(self) -> Result<Expression<T>> {
        Expression::parse(self)
    }
}

/// A bare string is a primitive expression (searched across properties).
impl<T> IntoExpression<T> for &str {
    fn into_expression(self) -> Result<Expression<T>> {
        Ok(Expression::Primitive(Value::String(self.to_string())))
    }
}

impl<T> IntoExpression<T> for bool {
    fn into_expression(self) -> Result<Expression<T>> {
        Ok(Expression::Primitive(Value::Bool(self)))
    }
}

impl<T> IntoExpression<T> for i64 {
    fn into_expression(self) -> Result<Expression<T>> {
        Ok(Expression::Primitive(Value::from(self)))
    }
}
