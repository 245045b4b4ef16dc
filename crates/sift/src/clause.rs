//! The typed clause tree an object expression is parsed into.
//!
//! A [`Clause`] is evaluated against a *subject*: the whole record at the top
//! of the tree, or the value of a field below a [`Clause::Field`]. Every raw
//! JSON shape is resolved into one of these variants once, by the validator,
//! so evaluation never re-inspects the expression.

use std::fmt;

use serde_json::Value;

use crate::op::Op;
use crate::operators::OperatorCall;
use crate::value::{display, FieldPath};

/// A node of a parsed object expression.
#[derive(Debug, Clone)]
pub enum Clause {
    /// All children must hold. An empty list holds trivially.
    And(Vec<Clause>),
    /// At least one child must hold. An empty list never holds.
    Or(Vec<Clause>),
    /// The child must not hold.
    Not(Box<Clause>),
    /// Resolves `path` in the subject and evaluates `clause` against the
    /// value(s) found there.
    Field { path: FieldPath, clause: Box<Clause> },
    /// A `$`-operator applied to the subject.
    Operator(OperatorCall),
    /// A primitive matched against the subject by the deep comparator.
    Literal(Value),
    /// A primitive matched against any property of the subject.
    Search(Value),
}

impl Clause {
    /// Builds an implicit conjunction, collapsing the single-child case.
    pub fn all(mut children: Vec<Clause>) -> Clause {
        if children.len() == 1 {
            children.remove(0)
        } else {
            Clause::And(children)
        }
    }

    pub fn field(path: impl Into<String>, clause: Clause) -> Clause {
        Clause::Field {
            path: FieldPath::new(path),
            clause: Box::new(clause),
        }
    }

    /// The logical operator this node represents, if any.
    pub fn logical_op(&self) -> Option<Op> {
        match self {
            Clause::And(_) => Some(Op::And),
            Clause::Or(_) => Some(Op::Or),
            Clause::Not(_) => Some(Op::Not),
            _ => None,
        }
    }

    pub fn children(&self) -> &[Clause] {
        match self {
            Clause::And(children) | Clause::Or(children) => children,
            Clause::Not(child) => std::slice::from_ref(child.as_ref()),
            Clause::Field { clause, .. } => std::slice::from_ref(clause.as_ref()),
            _ => &[],
        }
    }

    /// Whether evaluation depends on the current time.
    pub fn reads_clock(&self) -> bool {
        match self {
            Clause::Operator(call) => matches!(call.op(), Op::Recent | Op::Upcoming | Op::Age),
            _ => self.children().iter().any(Clause::reads_clock),
        }
    }

    /// Number of nested field levels below this node.
    ///
    /// Logical combinators do not add depth.
    pub fn field_depth(&self) -> usize {
        let below = self
            .children()
            .iter()
            .map(Clause::field_depth)
            .max()
            .unwrap_or(0);
        match self {
            Clause::Field { .. } => below + 1,
            _ => below,
        }
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Clause::And(children) | Clause::Or(children) => {
                let sep = if matches!(self, Clause::And(_)) { " AND " } else { " OR " };
                f.write_str("(")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(sep)?;
                    }
                    write!(f, "{}", child)?;
                }
                f.write_str(")")
            }
            Clause::Not(child) => write!(f, "NOT {}", child),
            Clause::Field { path, clause } => write!(f, "{}: {}", path, clause),
            Clause::Operator(call) => write!(f, "{} {}", call.op(), display(call.payload())),
            Clause::Literal(value) => f.write_str(&display(value)),
            Clause::Search(value) => write!(f, "any ~ {}", display(value)),
        }
    }
}
