//! The engine: entry points bound to one cache.

use std::borrow::Borrow;
use std::sync::Arc;

use futures_util::Stream;
use serde_json::Value;

use crate::cache::{global_cache, FilterCache};
use crate::config::{FilterConfig, FilterOptions};
use crate::debug::DebugResult;
use crate::error::{FilterError, Result};
use crate::expression::IntoExpression;
use crate::lazy::{ChunkIter, FilterIter};
use crate::query::Query;
use crate::traits::Seekable;
use crate::value::type_name;

/// Runs filters against an injected [`FilterCache`].
///
/// The crate-level free functions use [`Sift::global`]. Build an engine
/// with its own cache to keep tests or subsystems isolated:
///
/// ```
/// use serde_json::json;
/// use sift::{FilterOptions, Sift};
///
/// let engine = Sift::new();
/// let items = vec![json!({"n": 1}), json!({"n": 2})];
/// let options = FilterOptions::new().enable_cache(true);
///
/// let hits = engine.filter(&items, json!({"n": {"$gt": 1}}), &options).unwrap();
/// assert_eq!(hits, vec![&items[1]]);
/// assert_eq!(engine.cache().stats().predicates, 1);
/// ```
#[derive(Debug, Clone)]
pub struct Sift {
    cache: Arc<FilterCache>,
}

impl Default for Sift {
    fn default() -> Self {
        Sift::new()
    }
}

impl Sift {
    /// An engine with a fresh, private cache.
    pub fn new() -> Self {
        Sift::with_cache(Arc::new(FilterCache::new()))
    }

    pub fn with_cache(cache: Arc<FilterCache>) -> Self {
        Sift { cache }
    }

    /// An engine sharing the process-wide cache.
    pub fn global() -> Self {
        Sift::with_cache(global_cache())
    }

    pub fn cache(&self) -> &Arc<FilterCache> {
        &self.cache
    }

    /// Validates, configures, and compiles. Every other entry point starts
    /// here, so a malformed expression fails before any item is visited.
    pub fn query<T: Seekable + 'static>(
        &self,
        expression: impl IntoExpression<T>,
        options: &FilterOptions,
    ) -> Result<Query<T>> {
        let expression = expression.into_expression()?;
        let config = FilterConfig::merge(options)?;
        Query::prepare(expression, config, &self.cache)
    }

    pub fn filter<'a, T: Seekable + 'static>(
        &self,
        items: &'a [T],
        expression: impl IntoExpression<T>,
        options: &FilterOptions,
    ) -> Result<Vec<&'a T>> {
        Ok(self.query(expression, options)?.filter(items))
    }

    /// Filters a JSON array document, cloning the matches.
    pub fn filter_json(
        &self,
        collection: &Value,
        expression: impl IntoExpression<Value>,
        options: &FilterOptions,
    ) -> Result<Vec<Value>> {
        let Value::Array(items) = collection else {
            return Err(FilterError::TypeMismatch {
                expected: "array",
                actual: type_name(collection),
                field: None,
            });
        };
        Ok(self.query(expression, options)?.filter_cloned(items))
    }

    /// Filters with an instrumented pass, whatever the `debug` option says.
    pub fn filter_debug<'a, T: Seekable + 'static>(
        &self,
        items: &'a [T],
        expression: impl IntoExpression<T>,
        options: &FilterOptions,
    ) -> Result<DebugResult<'a, T>> {
        Ok(self.query(expression, options)?.debug(items))
    }

    pub fn filter_lazy<T, I, E>(
        &self,
        source: I,
        expression: E,
        options: &FilterOptions,
    ) -> Result<FilterIter<I::IntoIter, T>>
    where
        T: Seekable + 'static,
        I: IntoIterator,
        I::Item: Borrow<T>,
        E: IntoExpression<T>,
    {
        Ok(self.query(expression, options)?.lazy(source))
    }

    pub fn filter_lazy_async<T, S, E>(
        &self,
        source: S,
        expression: E,
        options: &FilterOptions,
    ) -> Result<impl Stream<Item = S::Item>>
    where
        T: Seekable + 'static,
        S: Stream,
        S::Item: Borrow<T>,
        E: IntoExpression<T>,
    {
        Ok(self.query(expression, options)?.lazy_async(source))
    }

    pub fn filter_lazy_chunked<T, I, E>(
        &self,
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
        self.query(expression, options)?.lazy_chunked(source, size)
    }

    pub fn filter_chunked<'a, T: Seekable + 'static>(
        &self,
        items: &'a [T],
        expression: impl IntoExpression<T>,
        size: usize,
        options: &FilterOptions,
    ) -> Result<Vec<Vec<&'a T>>> {
        self.query(expression, options)?.chunked(items, size)
    }

    pub fn filter_first<'a, T: Seekable + 'static>(
        &self,
        items: &'a [T],
        expression: impl IntoExpression<T>,
        n: usize,
        options: &FilterOptions,
    ) -> Result<Vec<&'a T>> {
        self.query(expression, options)?.first(items, n)
    }

    pub fn filter_exists<T: Seekable + 'static>(
        &self,
        items: &[T],
        expression: impl IntoExpression<T>,
        options: &FilterOptions,
    ) -> Result<bool> {
        Ok(self.query(expression, options)?.exists(items))
    }

    pub fn filter_count<T: Seekable + 'static>(
        &self,
        items: &[T],
        expression: impl IntoExpression<T>,
        options: &FilterOptions,
    ) -> Result<usize> {
        Ok(self.query(expression, options)?.count(items))
    }
}
