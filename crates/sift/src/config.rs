//! Filter options and the merged, validated configuration.
//!
//! [`FilterOptions`] is what callers build (fluently, or from the JSON wire
//! form). [`FilterConfig::merge`] applies defaults, validates, and freezes the
//! result behind an [`Arc`] for one call.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::comparator::{Comparator, CustomComparator};
use crate::error::{FilterError, Result};
use crate::operators::EvalContext;
use crate::ordering::{normalize_order_by, Dir, OrderBy};

pub const DEFAULT_MAX_DEPTH: usize = 3;
pub const MAX_DEPTH_LIMIT: usize = 10;

/// Caller-supplied options. Unset fields take their defaults on merge.
///
/// # Example
///
/// ```
/// use sift::FilterOptions;
///
/// let options = FilterOptions::new()
///     .case_sensitive(true)
///     .order_desc("age")
///     .limit(10);
/// ```
#[derive(Clone, Default)]
pub struct FilterOptions {
    case_sensitive: Option<bool>,
    max_depth: Option<i64>,
    custom_comparator: Option<CustomComparator>,
    enable_cache: Option<bool>,
    debug: Option<bool>,
    verbose: Option<bool>,
    show_timings: Option<bool>,
    colorize: Option<bool>,
    order_by: Vec<OrderBy>,
    order_by_raw: Option<Value>,
    limit: Option<i64>,
    now: Option<DateTime<Utc>>,
}

/// The JSON wire form of the options.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct WireOptions {
    case_sensitive: Option<bool>,
    max_depth: Option<i64>,
    enable_cache: Option<bool>,
    debug: Option<bool>,
    verbose: Option<bool>,
    show_timings: Option<bool>,
    colorize: Option<bool>,
    order_by: Option<Value>,
    limit: Option<i64>,
}

impl FilterOptions {
    pub fn new() -> Self {
        FilterOptions::default()
    }

    /// Reads options from their wire names (`caseSensitive`, `maxDepth`,
    /// `enableCache`, `debug`, `verbose`, `showTimings`, `colorize`,
    /// `orderBy`, `limit`).
    pub fn from_json(raw: &Value) -> Result<Self> {
        let wire = WireOptions::deserialize(raw)
            .map_err(|e| FilterError::Configuration(e.to_string()))?;
        let order_by = match &wire.order_by {
            Some(raw) => normalize_order_by(raw)?,
            None => Vec::new(),
        };
        Ok(FilterOptions {
            case_sensitive: wire.case_sensitive,
            max_depth: wire.max_depth,
            enable_cache: wire.enable_cache,
            debug: wire.debug,
            verbose: wire.verbose,
            show_timings: wire.show_timings,
            colorize: wire.colorize,
            order_by,
            limit: wire.limit,
            ..FilterOptions::default()
        })
    }

    pub fn case_sensitive(mut self, on: bool) -> Self {
        self.case_sensitive = Some(on);
        self
    }

    /// Sets the nested-object depth bound (valid range `1..=10`).
    pub fn max_depth(mut self, depth: i64) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Replaces leaf matching with `f(actual, expected)`.
    pub fn custom_comparator<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value, &Value) -> bool + Send + Sync + 'static,
    {
        self.custom_comparator = Some(Arc::new(f));
        self
    }

    pub fn enable_cache(mut self, on: bool) -> Self {
        self.enable_cache = Some(on);
        self
    }

    pub fn debug(mut self, on: bool) -> Self {
        self.debug = Some(on);
        self
    }

    pub fn verbose(mut self, on: bool) -> Self {
        self.verbose = Some(on);
        self
    }

    pub fn show_timings(mut self, on: bool) -> Self {
        self.show_timings = Some(on);
        self
    }

    pub fn colorize(mut self, on: bool) -> Self {
        self.colorize = Some(on);
        self
    }

    // ========================================================================
    // Ordering
    // ========================================================================

    /// Adds an ordering clause.
    pub fn order_by(mut self, field: &str, dir: Dir) -> Self {
        self.order_by.push(OrderBy::new(field, dir));
        self
    }

    pub fn order_asc(self, field: &str) -> Self {
        self.order_by(field, Dir::Asc)
    }

    pub fn order_desc(self, field: &str) -> Self {
        self.order_by(field, Dir::Desc)
    }

    /// Sets ordering from its wire form: a field name, a `{field, direction}`
    /// object, or an array of those. Normalized (and validated) on merge.
    pub fn order_by_value(mut self, raw: Value) -> Self {
        self.order_by_raw = Some(raw);
        self
    }

    /// Truncates results after ordering. Zero or negative means no limit.
    pub fn limit(mut self, n: i64) -> Self {
        self.limit = Some(n);
        self
    }

    /// Fixes the reference instant used by the datetime operators.
    pub fn now(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }
}

impl fmt::Debug for FilterOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterOptions")
            .field("case_sensitive", &self.case_sensitive)
            .field("max_depth", &self.max_depth)
            .field("custom_comparator", &self.custom_comparator.is_some())
            .field("enable_cache", &self.enable_cache)
            .field("debug", &self.debug)
            .field("order_by", &self.order_by)
            .field("order_by_raw", &self.order_by_raw)
            .field("limit", &self.limit)
            .field("now", &self.now)
            .finish_non_exhaustive()
    }
}

/// Fully resolved configuration for one filter call.
#[derive(Clone)]
pub struct FilterConfig {
    pub case_sensitive: bool,
    pub max_depth: usize,
    pub custom_comparator: Option<CustomComparator>,
    pub enable_cache: bool,
    pub debug: bool,
    pub verbose: bool,
    pub show_timings: bool,
    pub colorize: bool,
    pub order_by: Vec<OrderBy>,
    /// `None` means no limit.
    pub limit: Option<usize>,
    pub now: Option<DateTime<Utc>>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        FilterConfig {
            case_sensitive: false,
            max_depth: DEFAULT_MAX_DEPTH,
            custom_comparator: None,
            enable_cache: false,
            debug: false,
            verbose: false,
            show_timings: false,
            colorize: false,
            order_by: Vec::new(),
            limit: None,
            now: None,
        }
    }
}

impl FilterConfig {
    /// Applies defaults to `options` and validates the result.
    pub fn merge(options: &FilterOptions) -> Result<Arc<FilterConfig>> {
        let defaults = FilterConfig::default();

        let max_depth = match options.max_depth {
            None => defaults.max_depth,
            Some(depth) if (1..=MAX_DEPTH_LIMIT as i64).contains(&depth) => depth as usize,
            Some(depth) => {
                return Err(FilterError::Configuration(format!(
                    "maxDepth must be between 1 and {}, got {}",
                    MAX_DEPTH_LIMIT, depth
                )))
            }
        };

        let mut order_by = match &options.order_by_raw {
            Some(raw) => normalize_order_by(raw)?,
            None => Vec::new(),
        };
        order_by.extend(options.order_by.iter().cloned());
        if let Some(bad) = order_by.iter().find(|o| o.field.is_empty()) {
            return Err(FilterError::Configuration(format!(
                "orderBy field must not be empty ({})",
                bad
            )));
        }

        let limit = options
            .limit
            .filter(|n| *n > 0)
            .map(|n| usize::try_from(n).unwrap_or(usize::MAX));

        Ok(Arc::new(FilterConfig {
            case_sensitive: options.case_sensitive.unwrap_or(defaults.case_sensitive),
            max_depth,
            custom_comparator: options.custom_comparator.clone(),
            enable_cache: options.enable_cache.unwrap_or(defaults.enable_cache),
            debug: options.debug.unwrap_or(defaults.debug),
            verbose: options.verbose.unwrap_or(defaults.verbose),
            show_timings: options.show_timings.unwrap_or(defaults.show_timings),
            colorize: options.colorize.unwrap_or(defaults.colorize),
            order_by,
            limit,
            now: options.now,
        }))
    }

    /// The leaf comparator for predicates compiled under this config.
    pub fn comparator(&self) -> Comparator {
        Comparator::new(
            self.case_sensitive,
            self.max_depth,
            self.custom_comparator.clone(),
        )
    }

    pub fn eval_context(&self) -> EvalContext {
        EvalContext {
            case_sensitive: self.case_sensitive,
            fixed_now: self.now,
        }
    }

    /// The config fields that change what a predicate matches.
    pub fn predicate_key(&self) -> String {
        let comparator = match &self.custom_comparator {
            Some(f) => format!("{:p}", Arc::as_ptr(f) as *const ()),
            None => "-".to_string(),
        };
        let now = match &self.now {
            Some(now) => now.to_rfc3339(),
            None => "-".to_string(),
        };
        format!(
            "cs={};depth={};cmp={};now={}",
            self.case_sensitive, self.max_depth, comparator, now
        )
    }

    /// The config fields that change a whole filter result.
    pub fn result_key(&self) -> String {
        let order: Vec<String> = self.order_by.iter().map(OrderBy::to_string).collect();
        let limit = self.limit.map_or_else(|| "-".to_string(), |n| n.to_string());
        format!(
            "{};order={};limit={}",
            self.predicate_key(),
            order.join(","),
            limit
        )
    }

    /// Whether results depend on the wall clock, which makes them uncacheable.
    pub fn reads_clock(&self) -> bool {
        self.now.is_none()
    }
}

impl fmt::Debug for FilterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterConfig")
            .field("case_sensitive", &self.case_sensitive)
            .field("max_depth", &self.max_depth)
            .field("custom_comparator", &self.custom_comparator.is_some())
            .field("enable_cache", &self.enable_cache)
            .field("debug", &self.debug)
            .field("verbose", &self.verbose)
            .field("show_timings", &self.show_timings)
            .field("colorize", &self.colorize)
            .field("order_by", &self.order_by)
            .field("limit", &self.limit)
            .field("now", &self.now)
            .finish()
    }
}
