//! Wildcard patterns.
//!
//! Expected strings containing `%` (zero or more characters) or `_` (exactly
//! one character) are compiled into anchored regular expressions and matched
//! against the whole actual string.

use regex::{Regex, RegexBuilder};

use crate::error::{FilterError, Result};

/// Returns `true` if `s` contains a wildcard placeholder.
pub fn has_wildcards(s: &str) -> bool {
    s.contains(['%', '_'])
}

/// Translates a wildcard pattern into an anchored regex source string.
pub fn wildcard_to_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    out.push('^');
    let mut literal = String::new();
    for c in pattern.chars() {
        match c {
            '%' | '_' => {
                out.push_str(&regex::escape(&literal));
                literal.clear();
                out.push_str(if c == '%' { ".*" } else { "." });
            }
            _ => literal.push(c),
        }
    }
    out.push_str(&regex::escape(&literal));
    out.push('$');
    out
}

/// A compiled wildcard pattern.
#[derive(Debug, Clone)]
pub struct WildcardPattern {
    source: String,
    regex: Regex,
}

impl WildcardPattern {
    pub fn compile(pattern: &str, case_sensitive: bool) -> Result<Self> {
        let regex = RegexBuilder::new(&wildcard_to_regex(pattern))
            .case_insensitive(!case_sensitive)
            .dot_matches_new_line(true)
            .build()
            .map_err(|source| FilterError::InvalidRegex {
                operator: "wildcard",
                source,
            })?;
        Ok(WildcardPattern {
            source: pattern.to_string(),
            regex,
        })
    }

    pub fn is_match(&self, s: &str) -> bool {
        self.regex.is_match(s)
    }

    /// The pattern as written.
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

/// Lowercases `s` unless the comparison is case sensitive.
pub(crate) fn fold(s: &str, case_sensitive: bool) -> String {
    if case_sensitive {
        s.to_string()
    } else {
        s.to_lowercase()
    }
}
