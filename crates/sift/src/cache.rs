//! Predicate and result caches.
//!
//! A [`FilterCache`] is an ordinary value: construct one per test, share one
//! through an [`Arc`], or use the process-wide default behind the free
//! functions. Both maps sit behind `RwLock`s; racing writers for one key keep
//! whichever entry landed first, and every reader gets that same entry.
//!
//! Predicate keys are the full canonical strings of (expression, relevant
//! config, item type), so distinct expressions cannot collide. Result keys
//! add ordering, limit, and a SHA-256 fingerprint of the collection content:
//! a collection mutated in place hashes differently and misses.
//!
//! Computing that fingerprint serializes and hashes every item on every
//! cached call, hits included, so a result hit costs about as much as a
//! plain pass. The result cache pays off when ordering dominates, or when
//! the predicate is far more expensive than serializing an item. Caller
//! predicates never use it.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use once_cell::sync::Lazy;
use sha2::{Digest, Sha256};

use crate::compile::{compile, CompiledPredicate};
use crate::config::FilterConfig;
use crate::error::Result;
use crate::expression::Expression;
use crate::traits::Seekable;
use crate::value::canonical_json;

static GLOBAL: Lazy<Arc<FilterCache>> = Lazy::new(|| Arc::new(FilterCache::new()));

/// The process-wide cache used by the free functions.
pub fn global_cache() -> Arc<FilterCache> {
    Arc::clone(&GLOBAL)
}

/// Cache sizes and counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    /// Compiled predicates held.
    pub predicates: usize,
    /// Whole results held.
    pub results: usize,
    pub hits: u64,
    pub misses: u64,
}

type AnyPredicate = Arc<dyn Any + Send + Sync>;

#[derive(Default)]
pub struct FilterCache {
    predicates: RwLock<HashMap<String, AnyPredicate>>,
    results: RwLock<HashMap<String, Arc<Vec<usize>>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl FilterCache {
    pub fn new() -> Self {
        FilterCache::default()
    }

    /// The key a predicate for `expr` under `config` is cached under.
    pub fn predicate_key<T: 'static>(expr: &Expression<T>, config: &FilterConfig) -> String {
        format!(
            "{}|{}|{:?}",
            expr.cache_key(),
            config.predicate_key(),
            TypeId::of::<T>()
        )
    }

    /// The key a whole result is cached under.
    pub fn result_key<T: 'static>(expr: &Expression<T>, config: &FilterConfig, fingerprint: &str) -> String {
        format!(
            "{}|{}|{}|{:?}",
            expr.cache_key(),
            config.result_key(),
            fingerprint,
            TypeId::of::<T>()
        )
    }

    /// Returns the cached predicate for `(expr, config)`, compiling it on
    /// the first request.
    ///
    /// Every caller asking for one key receives the same predicate object.
    pub fn get_or_compile<T: Seekable + 'static>(
        &self,
        expr: &Expression<T>,
        config: &FilterConfig,
    ) -> Result<CompiledPredicate<T>> {
        let key = Self::predicate_key(expr, config);
        if let Some(found) = self.lookup_predicate::<T>(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(kind = expr.kind(), "predicate cache hit");
            return Ok(found);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(kind = expr.kind(), "predicate cache miss");

        let compiled = compile(expr, config)?;
        let mut map = self.predicates.write().unwrap_or_else(PoisonError::into_inner);
        let entry = map
            .entry(key)
            .or_insert_with(|| Arc::new(compiled.clone()) as AnyPredicate);
        Ok(entry
            .downcast_ref::<CompiledPredicate<T>>()
            .cloned()
            .unwrap_or(compiled))
    }

    fn lookup_predicate<T: 'static>(&self, key: &str) -> Option<CompiledPredicate<T>> {
        let map = self.predicates.read().unwrap_or_else(PoisonError::into_inner);
        map.get(key)?.downcast_ref::<CompiledPredicate<T>>().cloned()
    }

    /// Returns the matching indices cached under `key`.
    pub fn get_result(&self, key: &str) -> Option<Arc<Vec<usize>>> {
        let map = self.results.read().unwrap_or_else(PoisonError::into_inner);
        let found = map.get(key).cloned();
        match found {
            Some(_) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                tracing::trace!("result cache hit");
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                tracing::trace!("result cache miss");
            }
        }
        found
    }

    pub fn set_result(&self, key: String, indices: Arc<Vec<usize>>) {
        let mut map = self.results.write().unwrap_or_else(PoisonError::into_inner);
        map.insert(key, indices);
    }

    /// Drops every cached predicate and result and resets the counters.
    pub fn clear(&self) {
        self.predicates
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.results
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        tracing::debug!("filter cache cleared");
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            predicates: self
                .predicates
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .len(),
            results: self
                .results
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for FilterCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterCache")
            .field("stats", &self.stats())
            .finish()
    }
}

/// SHA-256 over the canonical JSON of every item, in order.
///
/// Linear in the serialized size of the collection.
pub fn fingerprint<T: Seekable>(items: &[T]) -> String {
    let mut hasher = Sha256::new();
    hasher.update((items.len() as u64).to_le_bytes());
    for item in items {
        let encoded = canonical_json(&item.seek_value());
        hasher.update((encoded.len() as u64).to_le_bytes());
        hasher.update(encoded.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}
