//! Sift - declarative expression filtering for in-memory collections.
//!
//! Sift filters slices, iterators, and streams of records with MongoDB-style
//! expressions: plain JSON objects whose keys are field paths, `$`-prefixed
//! operators, or logical combinators. It supports:
//!
//! - Deep matching: nested objects, dotted paths, arrays matched per element
//! - Wildcard (`%`, `_`) and negated (`!`) string literals
//! - Comparison, array, string, geospatial, and date/time operators
//! - `$and`, `$or`, `$not` at any level
//! - Ordering and limits on the result
//! - Lazy, chunked, short-circuiting, and asynchronous drivers
//! - Predicate and result caching
//! - Instrumented debug passes with a rendered match tree
//!
//! # Quick Start
//!
//! ```rust
//! use serde_json::json;
//! use sift::{filter, FilterOptions};
//!
//! let users = vec![
//!     json!({"name": "Alice", "age": 30, "city": "Berlin"}),
//!     json!({"name": "Bob", "age": 25, "city": "Paris"}),
//!     json!({"name": "Carol", "age": 35, "city": "Berlin"}),
//! ];
//!
//! let berliners = filter(
//!     &users,
//!     json!({"city": "Berlin", "age": {"$gte": 31}}),
//!     &FilterOptions::default(),
//! )
//! .unwrap();
//! assert_eq!(berliners, vec![&users[2]]);
//!
//! // A bare primitive searches every property.
//! let hits = filter(&users, "paris", &FilterOptions::default()).unwrap();
//! assert_eq!(hits.len(), 1);
//! ```
//!
//! # Records
//!
//! Anything implementing [`Seekable`] can be filtered. `serde_json::Value`
//! is supported out of the box; `Serialize` types opt in with
//! [`seekable_via_serde!`]:
//!
//! ```rust
//! use serde::Serialize;
//! use serde_json::json;
//! use sift::{filter, seekable_via_serde, FilterOptions};
//!
//! #[derive(Serialize)]
//! struct Task {
//!     title: String,
//!     priority: u8,
//!     tags: Vec<String>,
//! }
//!
//! seekable_via_serde!(Task);
//!
//! let tasks = vec![
//!     Task { title: "Write docs".into(), priority: 2, tags: vec!["docs".into()] },
//!     Task { title: "Fix bug".into(), priority: 5, tags: vec!["bug".into(), "urgent".into()] },
//! ];
//!
//! let urgent = filter(
//!     &tasks,
//!     json!({"tags": {"$contains": "urgent"}}),
//!     &FilterOptions::new().order_desc("priority"),
//! )
//! .unwrap();
//! assert_eq!(urgent[0].title, "Fix bug");
//! ```
//!
//! # Expression Shapes
//!
//! | Value at a key | Meaning |
//! |----------------|---------|
//! | `{"$op": payload, ...}` | every operator must hold for the field value |
//! | `{"key": ..., ...}` | nested expression against the field value |
//! | `[a, b]` | membership, same as `{"$in": [a, b]}` |
//! | primitive | deep comparison (substring, wildcard, negation, equality) |
//!
//! Nested field clauses are bounded by `maxDepth` (default 3); fields nested
//! deeper never match. Logical combinators do not count toward the bound.

pub mod cache;
mod clause;
mod comparator;
mod compile;
mod config;
pub mod debug;
mod engine;
mod error;
mod expression;
pub mod lazy;
mod logical;
mod op;
pub mod operators;
pub mod ordering;
mod pattern;
mod query;
mod traits;
mod validate;
pub mod value;

use std::borrow::Borrow;

use futures_util::Stream;
use serde_json::Value;

// Re-export public API
pub use cache::{global_cache, CacheStats, FilterCache};
pub use clause::Clause;
pub use comparator::CustomComparator;
pub use compile::{compile, CompiledPredicate, Matcher, Program};
pub use config::{FilterConfig, FilterOptions, DEFAULT_MAX_DEPTH, MAX_DEPTH_LIMIT};
pub use debug::{DebugKind, DebugNode, DebugResult, DebugStats, RenderOptions};
pub use engine::Sift;
pub use error::{FilterError, Result, Violation};
pub use expression::{Expression, IntoExpression, PredicateFn};
pub use lazy::{ChunkIter, FilterIter};
pub use op::{Family, Op};
pub use ordering::{Dir, OrderBy};
pub use query::Query;
pub use traits::Seekable;
pub use validate::parse_clause;

#[doc(hidden)]
pub mod __private {
    pub use serde_json::{to_value, Value};
}

/// Filters `items`, returning references to the matches.
///
/// Uses the process-wide cache when `enable_cache` is set.
pub fn filter<'a, T: Seekable + 'static>(
    items: &'a [T],
    expression: impl IntoExpression<T>,
    options: &FilterOptions,
) -> Result<Vec<&'a T>> {
    Sift::global().filter(items, expression, options)
}

/// Filters a JSON document that must be an array.
///
/// Fails with [`FilterError::TypeMismatch`] for any other JSON type.
pub fn filter_json(
    collection: &Value,
    expression: impl IntoExpression<Value>,
    options: &FilterOptions,
) -> Result<Vec<Value>> {
    Sift::global().filter_json(collection, expression, options)
}

/// Filters with an instrumented pass.
///
/// ```rust
/// use serde_json::json;
/// use sift::{filter_debug, FilterOptions, RenderOptions};
///
/// let items = vec![json!({"n": 1}), json!({"n": 5})];
/// let result = filter_debug(&items, json!({"n": {"$gt": 2}}), &FilterOptions::default()).unwrap();
/// assert_eq!(result.stats.matched, 1);
/// println!("{}", result.render(&RenderOptions::default()));
/// ```
pub fn filter_debug<'a, T: Seekable + 'static>(
    items: &'a [T],
    expression: impl IntoExpression<T>,
    options: &FilterOptions,
) -> Result<DebugResult<'a, T>> {
    Sift::global().filter_debug(items, expression, options)
}

/// Lazily filters any iterable source.
///
/// ```rust
/// use serde_json::{json, Value};
/// use sift::{filter_lazy, FilterOptions};
///
/// let naturals = (0..).map(|n| json!({"n": n}));
/// let firsts: Vec<Value> = filter_lazy::<Value, _, _>(naturals, json!({"n": {"$gt": 10}}), &FilterOptions::default())
///     .unwrap()
///     .take(2)
///     .collect();
/// assert_eq!(firsts, vec![json!({"n": 11}), json!({"n": 12})]);
/// ```
pub fn filter_lazy<T, I, E>(source: I, expression: E, options: &FilterOptions) -> Result<FilterIter<I::IntoIter, T>>
where
    T: Seekable + 'static,
    I: IntoIterator,
    I::Item: Borrow<T>,
    E: IntoExpression<T>,
{
    Sift::global().filter_lazy(source, expression, options)
}

/// Lazily filters an asynchronous source.
pub fn filter_lazy_async<T, S, E>(source: S, expression: E, options: &FilterOptions) -> Result<impl Stream<Item = S::Item>>
where
    T: Seekable + 'static,
    S: Stream,
    S::Item: Borrow<T>,
    E: IntoExpression<T>,
{
    Sift::global().filter_lazy_async(source, expression, options)
}

/// Lazily filters a source, yielding batches of `size` matches.
pub fn filter_lazy_chunked<T, I, E>(
    source: I,
    expression: E,
    size: usize,
    options: &FilterOptions,
) -> Result<ChunkIter<I::IntoIter, T>>
where
    T: Seekable + 'static,
    I: IntoIterator,
    I::Item: Borrow<T>,
    E: IntoExpression<T>,
{
    Sift::global().filter_lazy_chunked(source, expression, size, options)
}

pub fn filter_chunked<'a, T: Seekable + 'static>(
    items: &'a [T],
    expression: impl IntoExpression<T>,
    size: usize,
    options: &FilterOptions,
) -> Result<Vec<Vec<&'a T>>> {
    Sift::global().filter_chunked(items, expression, size, options)
}

/// The first `n` matches, visiting no more items than needed.
pub fn filter_first<'a, T: Seekable + 'static>(
    items: &'a [T],
    expression: impl IntoExpression<T>,
    n: usize,
    options: &FilterOptions,
) -> Result<Vec<&'a T>> {
    Sift::global().filter_first(items, expression, n, options)
}

pub fn filter_exists<T: Seekable + 'static>(
    items: &[T],
    expression: impl IntoExpression<T>,
    options: &FilterOptions,
) -> Result<bool> {
    Sift::global().filter_exists(items, expression, options)
}

pub fn filter_count<T: Seekable + 'static>(
    items: &[T],
    expression: impl IntoExpression<T>,
    options: &FilterOptions,
) -> Result<usize> {
    Sift::global().filter_count(items, expression, options)
}

/// Empties the process-wide cache.
pub fn clear_filter_cache() {
    global_cache().clear();
}

/// Sizes and counters of the process-wide cache.
pub fn filter_cache_stats() -> CacheStats {
    global_cache().stats()
}
