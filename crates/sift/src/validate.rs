//! Expression validation.
//!
//! [`parse_clause`] walks a raw JSON expression once, classifying every key
//! and parsing every operator payload into a typed [`Clause`] tree.
//! Structural problems (unknown operators, wrong payload types, mixed keys)
//! are collected across the whole expression and reported together as
//! [`FilterError::InvalidExpression`]. Logical combinator shape errors,
//! coordinate errors, and invalid patterns fail immediately.

use serde_json::{Map, Value};

use crate::clause::Clause;
use crate::error::{FilterError, Result, Violation};
use crate::logical;
use crate::op::Op;
use crate::operators::{ArrayArgs, OperatorArgs, OperatorCall};

/// What a clause is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    /// The whole record.
    Item,
    /// The value of a field.
    Field,
}

/// Parses an object expression into a clause tree.
///
/// The top level must be an object: primitives are handled by
/// [`crate::Expression`] directly.
pub fn parse_clause(raw: &Value) -> Result<Clause> {
    let mut validator = Validator::default();
    let clause = match raw {
        Value::Object(map) => validator.object(map, Scope::Item, "")?,
        other => {
            validator.violation(
                "",
                format!("expected an object expression, got {}", crate::value::type_name(other)),
            );
            None
        }
    };
    match clause {
        Some(clause) if validator.violations.is_empty() => Ok(clause),
        _ => {
            tracing::debug!(
                violations = validator.violations.len(),
                "expression rejected"
            );
            Err(FilterError::InvalidExpression {
                violations: validator.violations,
            })
        }
    }
}

#[derive(Default)]
struct Validator {
    violations: Vec<Violation>,
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

impl Validator {
    fn violation(&mut self, path: &str, message: impl Into<String>) {
        let path = if path.is_empty() { "$root" } else { path };
        self.violations.push(Violation::new(path, message));
    }

    /// Parses any value appearing as an expression in `scope`.
    fn node(&mut self, value: &Value, scope: Scope, path: &str) -> Result<Option<Clause>> {
        match (value, scope) {
            (Value::Object(map), _) => self.object(map, scope, path),
            (Value::Array(items), Scope::Field) => Ok(Some(Clause::Operator(membership(items)))),
            (Value::Array(_), Scope::Item) => {
                self.violation(path, "an array is not a valid item expression");
                Ok(None)
            }
            (primitive, Scope::Field) => Ok(Some(Clause::Literal(primitive.clone()))),
            (primitive, Scope::Item) => Ok(Some(Clause::Search(primitive.clone()))),
        }
    }

    fn object(&mut self, map: &Map<String, Value>, scope: Scope, path: &str) -> Result<Option<Clause>> {
        let has_plain = map.keys().any(|k| !k.starts_with('$'));
        let has_dollar = map.keys().any(|k| k.starts_with('$'));
        let has_operator = map
            .keys()
            .any(|k| k.starts_with('$') && !Op::from_key(k).is_some_and(Op::is_logical));

        // Fields may sit next to combinators at item scope, but never next
        // to field operators, and nested values must be one or the other.
        let mixed = match scope {
            Scope::Item => has_plain && has_operator,
            Scope::Field => has_plain && has_dollar,
        };
        if mixed {
            self.violation(path, "mixes `$` operators and field names in one object");
        }

        let mut children = Vec::with_capacity(map.len());
        let mut complete = true;
        for (key, value) in map {
            let child_path = join(path, key);
            let child = if key.starts_with('$') {
                self.operator(key, value, scope, &child_path)?
            } else {
                self.node(value, Scope::Field, &child_path)?
                    .map(|clause| Clause::field(key.as_str(), clause))
            };
            match child {
                Some(child) => children.push(child),
                None => complete = false,
            }
        }
        Ok(complete.then(|| Clause::all(children)))
    }

    fn operator(&mut self, key: &str, payload: &Value, scope: Scope, path: &str) -> Result<Option<Clause>> {
        let Some(op) = Op::from_key(key) else {
            self.violation(path, format!("unknown operator `{}`", key));
            return Ok(None);
        };
        if op.is_logical() {
            return self.logical(op, payload, scope, path);
        }
        match OperatorCall::parse(op, payload) {
            Ok(call) => Ok(Some(Clause::Operator(call))),
            Err(FilterError::Operator { message, .. }) => {
                self.violation(path, format!("`{}` {}", key, message));
                Ok(None)
            }
            Err(other) => Err(other),
        }
    }

    fn logical(&mut self, op: Op, payload: &Value, scope: Scope, path: &str) -> Result<Option<Clause>> {
        let operands = logical::operands(op, payload)?;
        let mut children = Vec::with_capacity(operands.len());
        let mut complete = true;
        for (i, operand) in operands.into_iter().enumerate() {
            let operand_path = if op == Op::Not {
                path.to_string()
            } else {
                format!("{}[{}]", path, i)
            };
            match self.node(operand, scope, &operand_path)? {
                Some(child) => children.push(child),
                None => complete = false,
            }
        }
        if !complete {
            return Ok(None);
        }
        Ok(Some(match op {
            Op::And => Clause::And(children),
            Op::Or => Clause::Or(children),
            _ => match children.pop() {
                Some(child) => Clause::Not(Box::new(child)),
                None => return Ok(None),
            },
        }))
    }
}

/// `{field: [a, b]}` is `{field: {$in: [a, b]}}`.
fn membership(items: &[Value]) -> OperatorCall {
    OperatorCall::from_parts(
        Op::In,
        Value::Array(items.to_vec()),
        OperatorArgs::Array(ArrayArgs::one_of(items.to_vec())),
    )
}
