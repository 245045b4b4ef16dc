//! Debug instrumentation.
//!
//! A debug pass builds a [`DebugNode`] tree mirroring the compiled
//! expression before any item is seen, then evaluates every item through the
//! tree, counting per node how often it was reached and how often it held.
//! Logical nodes evaluate all of their children so the counts are complete;
//! the outcome per item is the same as a normal pass because clauses are pure.

mod render;

use std::time::{Duration, Instant};

use serde_json::Value;

pub use render::RenderOptions;

use crate::compile::{CompiledPredicate, Matcher, Program};
use crate::config::FilterConfig;
use crate::logical;
use crate::op::{Family, Op};
use crate::ordering::sort_items;
use crate::traits::Seekable;
use crate::value::any_at_path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugKind {
    /// `AND`, `OR`, `NOT`.
    Logical,
    /// `$gt`..`$ne` and literal leaves.
    Comparison,
    /// Descent into a field path.
    Field,
    /// Every other `$` operator, and caller predicates.
    Operator,
    /// A primitive searched across properties.
    Primitive,
}

impl DebugKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DebugKind::Logical => "logical",
            DebugKind::Comparison => "comparison",
            DebugKind::Field => "field",
            DebugKind::Operator => "operator",
            DebugKind::Primitive => "primitive",
        }
    }
}

/// One node of the annotated expression tree.
#[derive(Debug, Clone)]
pub struct DebugNode {
    pub kind: DebugKind,
    pub label: String,
    pub field: Option<String>,
    pub value: Option<Value>,
    pub children: Vec<DebugNode>,
    /// Evaluations of this node that held.
    pub matched: usize,
    /// Evaluations of this node. Below a field that resolves to several
    /// values this can exceed the number of items.
    pub total: usize,
    pub elapsed: Duration,
}

impl DebugNode {
    fn new(kind: DebugKind, label: impl Into<String>) -> Self {
        DebugNode {
            kind,
            label: label.into(),
            field: None,
            value: None,
            children: Vec::new(),
            matched: 0,
            total: 0,
            elapsed: Duration::ZERO,
        }
    }

    fn with_value(mut self, value: &Value) -> Self {
        self.value = Some(value.clone());
        self
    }

    /// Builds the (zeroed) tree for a compiled matcher.
    pub fn from_matcher(matcher: &Matcher) -> Self {
        let node = match matcher {
            Matcher::Always => DebugNode::new(DebugKind::Logical, "AND"),
            Matcher::Never => DebugNode::new(DebugKind::Comparison, "beyond maxDepth"),
            Matcher::And(_) => DebugNode::new(DebugKind::Logical, "AND"),
            Matcher::Or(_) => DebugNode::new(DebugKind::Logical, "OR"),
            Matcher::Not(_) => DebugNode::new(DebugKind::Logical, "NOT"),
            Matcher::Field { path, .. } => {
                let mut node = DebugNode::new(DebugKind::Field, path.as_str());
                node.field = Some(path.as_str().to_string());
                node
            }
            Matcher::Operator { op, payload, .. } => {
                let kind = match op.family() {
                    Family::Comparison => DebugKind::Comparison,
                    _ => DebugKind::Operator,
                };
                DebugNode::new(kind, op.as_str()).with_value(payload)
            }
            Matcher::Leaf { raw, .. } => DebugNode::new(DebugKind::Comparison, "matches").with_value(raw),
            Matcher::Search { raw, .. } => DebugNode::new(DebugKind::Primitive, "any property").with_value(raw),
        };
        DebugNode {
            children: matcher.children().iter().map(DebugNode::from_matcher).collect(),
            ..node
        }
    }

    /// Number of nodes in this subtree, including itself.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(DebugNode::size).sum::<usize>()
    }

    fn record(&mut self, held: bool, started: Instant) {
        self.total += 1;
        if held {
            self.matched += 1;
        }
        self.elapsed += started.elapsed();
    }
}

/// Aggregate numbers for one debug pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebugStats {
    /// Items that matched (before any limit).
    pub matched: usize,
    pub total: usize,
    pub percentage: f64,
    pub elapsed: Duration,
    /// Leaf conditions evaluated across all items.
    pub conditions_evaluated: usize,
}

/// Filtered items together with the populated tree and statistics.
#[derive(Debug, Clone)]
pub struct DebugResult<'a, T> {
    pub items: Vec<&'a T>,
    pub tree: DebugNode,
    pub stats: DebugStats,
}

impl<T> DebugResult<'_, T> {
    /// Renders the tree and summary as indented text.
    pub fn render(&self, options: &RenderOptions) -> String {
        render::render(&self.tree, &self.stats, options)
    }
}

/// Runs an instrumented pass over `items`.
///
/// Ordering and limit from `config` are applied to the returned items, so
/// they equal what a normal pass returns.
pub fn run<'a, T: Seekable>(items: &'a [T], predicate: &CompiledPredicate<T>, config: &FilterConfig) -> DebugResult<'a, T> {
    let started = Instant::now();
    let mut conditions = 0;
    let mut matched = Vec::new();

    let tree = match predicate.program() {
        Some(program) => {
            let mut tree = DebugNode::from_matcher(program.root());
            for item in items {
                let view = item.seek_value();
                if evaluate(program.root(), &mut tree, &view, program, &mut conditions) {
                    matched.push(item);
                }
            }
            tree
        }
        None => {
            let mut tree = DebugNode::new(DebugKind::Operator, "predicate");
            for item in items {
                let node_started = Instant::now();
                let held = predicate.test(item);
                conditions += 1;
                tree.record(held, node_started);
                if held {
                    matched.push(item);
                }
            }
            tree
        }
    };

    let matched_count = matched.len();
    sort_items(&mut matched, &config.order_by, config.case_sensitive);
    if let Some(limit) = config.limit {
        matched.truncate(limit);
    }

    let total = items.len();
    let stats = DebugStats {
        matched: matched_count,
        total,
        percentage: if total == 0 {
            0.0
        } else {
            matched_count as f64 * 100.0 / total as f64
        },
        elapsed: started.elapsed(),
        conditions_evaluated: conditions,
    };
    tracing::debug!(
        matched = stats.matched,
        total = stats.total,
        conditions = stats.conditions_evaluated,
        "debug pass complete"
    );
    DebugResult {
        items: matched,
        tree,
        stats,
    }
}

fn evaluate(matcher: &Matcher, node: &mut DebugNode, subject: &Value, program: &Program, conditions: &mut usize) -> bool {
    let started = Instant::now();
    let held = match matcher {
        Matcher::And(children) | Matcher::Or(children) => {
            let op = if matches!(matcher, Matcher::And(_)) { Op::And } else { Op::Or };
            let outcomes: Vec<bool> = children
                .iter()
                .zip(node.children.iter_mut())
                .map(|(child, child_node)| evaluate(child, child_node, subject, program, conditions))
                .collect();
            logical::combine_all(op, &outcomes)
        }
        Matcher::Not(child) => match node.children.first_mut() {
            Some(child_node) => !evaluate(child, child_node, subject, program, conditions),
            None => !child.test(subject, program),
        },
        Matcher::Field { path, inner } => match node.children.first_mut() {
            Some(child_node) => any_at_path(subject, path, &mut |value| {
                inner
                    .field_targets(value)
                    .iter()
                    .any(|target| evaluate(inner, child_node, target, program, conditions))
            }),
            None => matcher.test(subject, program),
        },
        leaf => {
            *conditions += 1;
            leaf.test(subject, program)
        }
    };
    node.record(held, started);
    held
}
