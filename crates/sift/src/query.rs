//! Prepared queries.
//!
//! A [`Query`] bundles a validated expression, its merged configuration,
//! and the compiled predicate, and offers every way of running it. Building
//! one does all the fallible work; running it only fails where a size or
//! count argument is invalid.

use std::borrow::Borrow;
use std::sync::Arc;

use futures_util::Stream;

use crate::cache::{fingerprint, FilterCache};
use crate::compile::{compile, CompiledPredicate};
use crate::config::{FilterConfig, FilterOptions};
use crate::debug::{self, DebugResult, RenderOptions};
use crate::error::Result;
use crate::expression::{Expression, IntoExpression};
use crate::lazy::{self, ChunkIter, FilterIter};
use crate::ordering::sort_indices;
use crate::traits::Seekable;

/// A validated, compiled filter ready to run against collections.
///
/// # Example
///
/// ```
/// use serde_json::{json, Value};
/// use sift::{FilterOptions, Query};
///
/// let people = vec![
///     json!({"name": "Ada", "age": 36}),
///     json!({"name": "Linus", "age": 28}),
///     json!({"name": "Grace", "age": 45}),
/// ];
///
/// let query = Query::<Value>::new(
///     json!({"age": {"$gte": 30}}),
///     &FilterOptions::new().order_desc("age"),
/// )
/// .unwrap();
///
/// let names: Vec<&str> = query
///     .filter(&people)
///     .iter()
///     .filter_map(|p| p["name"].as_str())
///     .collect();
/// assert_eq!(names, vec!["Grace", "Ada"]);
/// ```
pub struct Query<T> {
    expression: Expression<T>,
    config: Arc<FilterConfig>,
    predicate: CompiledPredicate<T>,
    cache: Option<Arc<FilterCache>>,
}

impl<T: Seekable + 'static> Query<T> {
    /// Validates and compiles without touching any cache.
    pub fn new(expression: impl IntoExpression<T>, options: &FilterOptions) -> Result<Self> {
        let expression = expression.into_expression()?;
        let config = FilterConfig::merge(options)?;
        let predicate = compile(&expression, &config)?;
        Ok(Query {
            expression,
            config,
            predicate,
            cache: None,
        })
    }

    /// Builds a query whose predicate (and, with `enableCache`, whose
    /// results) come from `cache`.
    pub(crate) fn prepare(expression: Expression<T>, config: Arc<FilterConfig>, cache: &Arc<FilterCache>) -> Result<Self> {
        if !config.enable_cache {
            let predicate = compile(&expression, &config)?;
            return Ok(Query {
                expression,
                config,
                predicate,
                cache: None,
            });
        }
        let predicate = cache.get_or_compile(&expression, &config)?;
        Ok(Query {
            expression,
            config,
            predicate,
            cache: Some(Arc::clone(cache)),
        })
    }

    /// Filters `items`, then applies ordering and limit.
    ///
    /// With `debug` enabled the pass is instrumented and the rendered tree is
    /// logged at info level under the `sift::debug` target.
    pub fn filter<'a>(&self, items: &'a [T]) -> Vec<&'a T> {
        if self.config.debug {
            let result = self.debug(items);
            tracing::info!(
                target: "sift::debug",
                matched = result.stats.matched,
                total = result.stats.total,
                "\n{}",
                result.render(&RenderOptions::from_config(&self.config))
            );
            return result.items;
        }
        self.select(items)
            .iter()
            .filter_map(|&i| items.get(i))
            .collect()
    }

    /// Like [`Query::filter`], cloning the matches.
    pub fn filter_cloned(&self, items: &[T]) -> Vec<T>
    where
        T: Clone,
    {
        self.filter(items).into_iter().cloned().collect()
    }

    /// Positions of the result items in `items`, in result order.
    fn select(&self, items: &[T]) -> Arc<Vec<usize>> {
        let key = self.result_key(items);
        if let (Some(cache), Some(key)) = (&self.cache, &key) {
            if let Some(hit) = cache.get_result(key) {
                return hit;
            }
        }

        let mut indices: Vec<usize> = items
            .iter()
            .enumerate()
            .filter(|(_, item)| self.predicate.test(item))
            .map(|(i, _)| i)
            .collect();
        sort_indices(items, &mut indices, &self.config.order_by, self.config.case_sensitive);
        if let Some(limit) = self.config.limit {
            indices.truncate(limit);
        }
        let indices = Arc::new(indices);

        if let (Some(cache), Some(key)) = (&self.cache, key) {
            cache.set_result(key, Arc::clone(&indices));
        }
        indices
    }

    /// Results that depend on the wall clock are never cached, and neither
    /// are caller predicates: they read `&T` directly, which the content
    /// fingerprint does not see.
    fn result_key(&self, items: &[T]) -> Option<String> {
        self.cache.as_ref()?;
        if matches!(self.expression, Expression::Predicate(_)) {
            return None;
        }
        if self.expression.reads_clock() && self.config.reads_clock() {
            return None;
        }
        Some(FilterCache::result_key(
            &self.expression,
            &self.config,
            &fingerprint(items),
        ))
    }

    /// Runs an instrumented pass.
    pub fn debug<'a>(&self, items: &'a [T]) -> DebugResult<'a, T> {
        debug::run(items, &self.predicate, &self.config)
    }

    /// Filters a lazily consumed source. Ordering and limit are not applied.
    pub fn lazy<I>(&self, source: I) -> FilterIter<I::IntoIter, T>
    where
        I: IntoIterator,
        I::Item: Borrow<T>,
    {
        FilterIter::new(source.into_iter(), self.predicate.clone())
    }

    /// Filters an asynchronous source. Ordering and limit are not applied.
    pub fn lazy_async<S>(&self, source: S) -> impl Stream<Item = S::Item>
    where
        S: Stream,
        S::Item: Borrow<T>,
    {
        lazy::filter_stream(source, self.predicate.clone())
    }

    /// Yields batches of `size` matches as each fills.
    pub fn lazy_chunked<I>(&self, source: I, size: usize) -> Result<ChunkIter<I::IntoIter, T>>
    where
        I: IntoIterator,
        I::Item: Borrow<T>,
    {
        ChunkIter::new(source.into_iter(), self.predicate.clone(), size)
    }

    /// Collects all matches into batches of `size`.
    pub fn chunked<'a>(&self, items: &'a [T], size: usize) -> Result<Vec<Vec<&'a T>>> {
        lazy::chunked(items, &self.predicate, size)
    }

    /// The first `n` matches in source order.
    pub fn first<'a>(&self, items: &'a [T], n: usize) -> Result<Vec<&'a T>> {
        lazy::first(items, &self.predicate, n)
    }

    pub fn exists(&self, items: &[T]) -> bool {
        lazy::exists(items, &self.predicate)
    }

    pub fn count(&self, items: &[T]) -> usize {
        lazy::count(items, &self.predicate)
    }
}

impl<T> Query<T> {
    /// Tests a single item.
    pub fn matches(&self, item: &T) -> bool {
        self.predicate.test(item)
    }

    pub fn predicate(&self) -> &CompiledPredicate<T> {
        &self.predicate
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    pub fn expression(&self) -> &Expression<T> {
        &self.expression
    }
}

impl<T> Clone for Query<T> {
    fn clone(&self) -> Self {
        Query {
            expression: self.expression.clone(),
            config: Arc::clone(&self.config),
            predicate: self.predicate.clone(),
            cache: self.cache.clone(),
        }
    }
}

impl<T> std::fmt::Debug for Query<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("expression", &self.expression)
            .field("config", &self.config)
            .field("cached", &self.cache.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn people() -> Vec<Value> {
        vec![
            json!({"name": "Ada", "age": 36, "city": "London"}),
            json!({"name": "Linus", "age": 28, "city": "Helsinki"}),
            json!({"name": "Grace", "age": null, "city": "New York"}),
            json!({"name": "Alan", "age": 41, "city": "London"}),
        ]
    }

    fn names(items: &[&Value]) -> Vec<String> {
        items
            .iter()
            .filter_map(|p| p["name"].as_str().map(str::to_string))
            .collect()
    }

    #[test]
    fn filter_preserves_source_order() {
        let data = people();
        let query = Query::<Value>::new(json!({"city": "london"}), &FilterOptions::new()).unwrap();
        assert_eq!(names(&query.filter(&data)), vec!["Ada", "Alan"]);
    }

    #[test]
    fn order_then_limit() {
        let data = people();
        let query = Query::<Value>::new(json!({}), &FilterOptions::new().order_asc("age").limit(3)).unwrap();
        assert_eq!(names(&query.filter(&data)), vec!["Linus", "Ada", "Alan"]);

        let all = Query::<Value>::new(json!({}), &FilterOptions::new().order_asc("age").limit(0)).unwrap();
        assert_eq!(names(&all.filter(&data)), vec!["Linus", "Ada", "Alan", "Grace"]);
    }

    #[test]
    fn debug_option_returns_the_same_items() {
        let data = people();
        let plain = Query::<Value>::new(json!({"age": {"$gt": 30}}), &FilterOptions::new()).unwrap();
        let traced = Query::<Value>::new(json!({"age": {"$gt": 30}}), &FilterOptions::new().debug(true)).unwrap();
        assert_eq!(plain.filter(&data), traced.filter(&data));
    }

    #[test]
    fn cached_results_track_content() {
        let cache = Arc::new(FilterCache::new());
        let config = FilterConfig::merge(&FilterOptions::new().enable_cache(true)).unwrap();
        let expr = Expression::parse(&json!({"city": "London"})).unwrap();
        let query = Query::<Value>::prepare(expr, config, &cache).unwrap();

        let mut data = people();
        assert_eq!(query.filter(&data).len(), 2);
        assert_eq!(query.filter(&data).len(), 2);
        assert_eq!(cache.stats().results, 1);

        data[1]["city"] = json!("London");
        assert_eq!(query.filter(&data).len(), 3);
        assert_eq!(cache.stats().results, 2);
    }

    #[test]
    fn clock_dependent_results_are_not_cached() {
        let cache = Arc::new(FilterCache::new());
        let config = FilterConfig::merge(&FilterOptions::new().enable_cache(true)).unwrap();
        let expr = Expression::parse(&json!({"at": {"$recent": {"days": 1}}})).unwrap();
        let query = Query::<Value>::prepare(expr, config, &cache).unwrap();
        query.filter(&people());
        assert_eq!(cache.stats().results, 0);
        assert_eq!(cache.stats().predicates, 1);
    }

    #[test]
    fn caller_predicates_skip_the_result_cache() {
        let cache = Arc::new(FilterCache::new());
        let config = FilterConfig::merge(&FilterOptions::new().enable_cache(true)).unwrap();
        let expr: Expression<Value> = Expression::predicate(|v: &Value| v["age"].as_i64().is_some_and(|age| age < 40));
        let query = Query::prepare(expr, config, &cache).unwrap();
        let data = people();
        assert_eq!(query.filter(&data).len(), 2);
        assert_eq!(query.filter(&data).len(), 2);
        assert_eq!(cache.stats().results, 0);
    }

    #[test]
    fn drivers_share_the_predicate() {
        let data = people();
        let query = Query::<Value>::new(json!({"age": {"$lt": 40}}), &FilterOptions::new()).unwrap();
        assert!(query.matches(&data[0]));
        assert_eq!(query.count(&data), 2);
        assert!(query.exists(&data));
        assert_eq!(names(&query.first(&data, 1).unwrap()), vec!["Ada"]);
        assert_eq!(query.chunked(&data, 1).unwrap().len(), 2);
        assert_eq!(query.lazy(&data).count(), 2);
        assert_eq!(query.lazy_chunked(data.iter(), 5).unwrap().count(), 1);
    }
}
