//! The predicate compiler.
//!
//! Compilation dispatches once on the [`Expression`] variant and lowers a
//! clause tree into a [`Matcher`] tree with every pattern, regex, and
//! operator payload prepared up front. The result is a [`CompiledPredicate`]:
//! an immutable, thread-safe `(&T) -> bool`.
//!
//! Nested field clauses count against `maxDepth`; logical combinators do
//! not. A field clause beyond the bound compiles to [`Matcher::Never`].

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::clause::Clause;
use crate::comparator::{Comparator, Expected};
use crate::config::FilterConfig;
use crate::error::Result;
use crate::expression::{Expression, PredicateFn};
use crate::logical;
use crate::op::Op;
use crate::operators::{CompiledOperator, EvalContext};
use crate::traits::Seekable;
use crate::value::{any_at_path, FieldPath};

/// A compiled clause, evaluated against a subject value.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Holds for every subject.
    Always,
    /// Holds for no subject (a field nested beyond `maxDepth`).
    Never,
    And(Vec<Matcher>),
    Or(Vec<Matcher>),
    Not(Box<Matcher>),
    Field {
        path: FieldPath,
        inner: Box<Matcher>,
    },
    Operator {
        op: Op,
        payload: Value,
        test: CompiledOperator,
    },
    /// Deep-comparator match against the subject.
    Leaf { raw: Value, expected: Expected },
    /// Deep-comparator match against any property of the subject.
    Search { raw: Value, expected: Expected },
}

impl Matcher {
    pub fn test(&self, subject: &Value, program: &Program) -> bool {
        match self {
            Matcher::Always => true,
            Matcher::Never => false,
            Matcher::And(children) => logical::combine(
                Op::And,
                children.iter().map(|child| child.test(subject, program)),
            ),
            Matcher::Or(children) => logical::combine(
                Op::Or,
                children.iter().map(|child| child.test(subject, program)),
            ),
            Matcher::Not(child) => !child.test(subject, program),
            Matcher::Field { path, inner } => any_at_path(subject, path, &mut |value| {
                inner
                    .field_targets(value)
                    .iter()
                    .any(|target| inner.test(target, program))
            }),
            Matcher::Operator { test, .. } => test.evaluate(subject, &program.context),
            Matcher::Leaf { expected, .. } => program.comparator.matches(subject, expected),
            Matcher::Search { expected, .. } => program.comparator.search(subject, expected),
        }
    }

    pub fn children(&self) -> &[Matcher] {
        match self {
            Matcher::And(children) | Matcher::Or(children) => children,
            Matcher::Not(child) => std::slice::from_ref(child.as_ref()),
            Matcher::Field { inner, .. } => std::slice::from_ref(inner.as_ref()),
            _ => &[],
        }
    }

    /// The values this matcher is tested against when it sits under a field
    /// that resolved to `value`.
    ///
    /// A nested object expectation must hold within a single element of an
    /// array-valued field. Everything else sees the array whole, so `$size`
    /// and `$eq` still apply to it.
    pub(crate) fn field_targets<'v>(&self, value: &'v Value) -> &'v [Value] {
        match value {
            Value::Array(items) if self.is_object_expectation() => items,
            _ => std::slice::from_ref(value),
        }
    }

    fn is_object_expectation(&self) -> bool {
        match self {
            Matcher::Field { .. } => true,
            Matcher::And(children) => {
                !children.is_empty() && children.iter().all(Matcher::is_object_expectation)
            }
            _ => false,
        }
    }
}

/// A compiled matcher plus the comparator and clock it evaluates with.
#[derive(Debug, Clone)]
pub struct Program {
    root: Matcher,
    comparator: Comparator,
    context: EvalContext,
}

impl Program {
    pub fn root(&self) -> &Matcher {
        &self.root
    }

    pub fn matches(&self, subject: &Value) -> bool {
        self.root.test(subject, self)
    }
}

/// An immutable, reusable `(&T) -> bool`.
///
/// Cloning is cheap and clones share the same underlying test.
pub struct CompiledPredicate<T> {
    test: PredicateFn<T>,
    program: Option<Arc<Program>>,
}

impl<T> CompiledPredicate<T> {
    pub fn test(&self, item: &T) -> bool {
        (self.test)(item)
    }

    /// The compiled matcher tree; `None` for caller-supplied predicates.
    pub fn program(&self) -> Option<&Program> {
        self.program.as_deref()
    }

    /// Returns `true` if both handles share one compiled test.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.test, &other.test)
    }

    pub fn as_fn(&self) -> PredicateFn<T> {
        Arc::clone(&self.test)
    }
}

impl<T> Clone for CompiledPredicate<T> {
    fn clone(&self) -> Self {
        CompiledPredicate {
            test: Arc::clone(&self.test),
            program: self.program.clone(),
        }
    }
}

impl<T> fmt::Debug for CompiledPredicate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledPredicate")
            .field("program", &self.program)
            .finish_non_exhaustive()
    }
}

/// Compiles an expression under `config`.
///
/// Predicate expressions are returned unchanged.
pub fn compile<T: Seekable + 'static>(expr: &Expression<T>, config: &FilterConfig) -> Result<CompiledPredicate<T>> {
    let comparator = config.comparator();
    let root = match expr {
        Expression::Predicate(f) => {
            tracing::debug!("using caller predicate");
            return Ok(CompiledPredicate {
                test: Arc::clone(f),
                program: None,
            });
        }
        Expression::Primitive(value) => Matcher::Search {
            raw: value.clone(),
            expected: Expected::compile(value, &comparator)?,
        },
        Expression::Object { clause, .. } => lower(clause, 0, &comparator)?,
    };
    tracing::debug!(
        kind = expr.kind(),
        case_sensitive = config.case_sensitive,
        max_depth = config.max_depth,
        "compiled predicate"
    );
    let program = Arc::new(Program {
        root,
        comparator,
        context: config.eval_context(),
    });
    let shared = Arc::clone(&program);
    Ok(CompiledPredicate {
        test: Arc::new(move |item: &T| shared.matches(&item.seek_value())),
        program: Some(program),
    })
}

fn lower(clause: &Clause, depth: usize, comparator: &Comparator) -> Result<Matcher> {
    Ok(match clause {
        Clause::And(children) if children.is_empty() => Matcher::Always,
        Clause::And(children) => Matcher::And(lower_all(children, depth, comparator)?),
        Clause::Or(children) => Matcher::Or(lower_all(children, depth, comparator)?),
        Clause::Not(child) => Matcher::Not(Box::new(lower(child, depth, comparator)?)),
        Clause::Field { path, clause } => {
            if depth >= comparator.max_depth() {
                tracing::trace!(field = %path, depth, "field beyond maxDepth never matches");
                Matcher::Never
            } else {
                Matcher::Field {
                    path: path.clone(),
                    inner: Box::new(lower(clause, depth + 1, comparator)?),
                }
            }
        }
        Clause::Operator(call) => Matcher::Operator {
            op: call.op(),
            payload: call.payload().clone(),
            test: call.compile(comparator.case_sensitive())?,
        },
        Clause::Literal(value) => Matcher::Leaf {
            raw: value.clone(),
            expected: Expected::compile(value, comparator)?,
        },
        Clause::Search(value) => Matcher::Search {
            raw: value.clone(),
            expected: Expected::compile(value, comparator)?,
        },
    })
}

fn lower_all(children: &[Clause], depth: usize, comparator: &Comparator) -> Result<Vec<Matcher>> {
    children
        .iter()
        .map(|child| lower(child, depth, comparator))
        .collect()
}
