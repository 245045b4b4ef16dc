//! The deep comparator.
//!
//! Leaf matching follows a fixed rule order:
//!
//! 1. An expected string starting with `!` negates the match of the remainder.
//! 2. An array-valued actual matches if any element matches.
//! 3. Strings with `%`/`_` are wildcard patterns matched against the whole
//!    actual string; other strings match as substrings; everything else
//!    matches by structural equality. A custom comparator replaces this rule.
//!
//! Nested object expectations are compiled into field clauses by the
//! predicate compiler, which is where the `maxDepth` bound applies.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::Result;
use crate::pattern::{fold, has_wildcards, WildcardPattern};
use crate::value::deep_equal;

/// Caller-supplied leaf comparison `(actual, expected) -> bool`.
pub type CustomComparator = Arc<dyn Fn(&Value, &Value) -> bool + Send + Sync>;

/// A compiled expected leaf value.
#[derive(Clone)]
pub enum Expected {
    /// `!value`: matches when the inner value does not.
    Negated(Box<Expected>),
    /// `%`/`_` pattern matched against the whole string.
    Wildcard(WildcardPattern),
    /// Plain string matched as a substring (pre-folded when case-insensitive).
    Text(String),
    /// Number, boolean, or null matched by equality.
    Exact(Value),
    /// Leaf handed to the custom comparator untouched.
    Custom(Value),
}

impl Expected {
    /// Compiles a primitive expected value.
    pub fn compile(expected: &Value, comparator: &Comparator) -> Result<Self> {
        if let Value::String(s) = expected {
            if let Some(rest) = s.strip_prefix('!') {
                let inner = Expected::compile(&Value::String(rest.to_string()), comparator)?;
                return Ok(Expected::Negated(Box::new(inner)));
            }
        }
        if comparator.custom.is_some() {
            return Ok(Expected::Custom(expected.clone()));
        }
        Ok(match expected {
            Value::String(s) if has_wildcards(s) => {
                Expected::Wildcard(WildcardPattern::compile(s, comparator.case_sensitive)?)
            }
            Value::String(s) => Expected::Text(fold(s, comparator.case_sensitive)),
            other => Expected::Exact(other.clone()),
        })
    }
}

impl fmt::Debug for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expected::Negated(inner) => write!(f, "!{:?}", inner),
            Expected::Wildcard(p) => write!(f, "Wildcard({:?})", p.as_str()),
            Expected::Text(s) => write!(f, "Text({:?})", s),
            Expected::Exact(v) => write!(f, "Exact({})", v),
            Expected::Custom(v) => write!(f, "Custom({})", v),
        }
    }
}

/// Leaf matcher configured once per compiled predicate.
#[derive(Clone)]
pub struct Comparator {
    case_sensitive: bool,
    max_depth: usize,
    custom: Option<CustomComparator>,
}

impl Comparator {
    pub fn new(case_sensitive: bool, max_depth: usize, custom: Option<CustomComparator>) -> Self {
        Comparator {
            case_sensitive,
            max_depth,
            custom,
        }
    }

    pub fn case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Matches `actual` against a compiled leaf.
    pub fn matches(&self, actual: &Value, expected: &Expected) -> bool {
        match expected {
            Expected::Negated(inner) => !self.matches(actual, inner),
            _ => match actual {
                Value::Array(items) => items.iter().any(|item| self.matches(item, expected)),
                _ => self.matches_scalar(actual, expected),
            },
        }
    }

    /// Searches every property of `actual` for a match.
    ///
    /// Primitives are matched directly. Objects match if any property value
    /// matches, descending into nested objects while the depth stays within
    /// `max_depth`.
    pub fn search(&self, actual: &Value, expected: &Expected) -> bool {
        match expected {
            Expected::Negated(inner) => !self.search(actual, inner),
            _ => match actual {
                Value::Object(map) => map.values().any(|v| self.search_at(v, expected, 1)),
                _ => self.matches(actual, expected),
            },
        }
    }

    fn search_at(&self, actual: &Value, expected: &Expected, depth: usize) -> bool {
        match actual {
            Value::Object(map) => {
                depth < self.max_depth && map.values().any(|v| self.search_at(v, expected, depth + 1))
            }
            Value::Array(items) => items.iter().any(|v| self.search_at(v, expected, depth)),
            _ => self.matches_scalar(actual, expected),
        }
    }

    fn matches_scalar(&self, actual: &Value, expected: &Expected) -> bool {
        match expected {
            Expected::Negated(inner) => !self.matches(actual, inner),
            Expected::Custom(raw) => match &self.custom {
                Some(custom) => custom(actual, raw),
                None => deep_equal(actual, raw),
            },
            Expected::Wildcard(pattern) => match actual {
                Value::String(s) => pattern.is_match(s),
                Value::Number(n) => pattern.is_match(&n.to_string()),
                _ => false,
            },
            Expected::Text(needle) => match actual {
                Value::String(s) => fold(s, self.case_sensitive).contains(needle.as_str()),
                _ => false,
            },
            Expected::Exact(v) => deep_equal(actual, v),
        }
    }
}

impl fmt::Debug for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Comparator")
            .field("case_sensitive", &self.case_sensitive)
            .field("max_depth", &self.max_depth)
            .field("custom", &self.custom.is_some())
            .finish()
    }
}
