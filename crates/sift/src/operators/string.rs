//! String operators: `$startsWith`, `$endsWith`, `$regex`, `$match`.
//!
//! These use their own matching rules: prefix/suffix tests honour the
//! configured case sensitivity, `$regex` takes its case behaviour solely from
//! its flags, and `$match` is case-insensitive unless `caseSensitive` is set.
//! None of them apply the wildcard translation of the deep comparator.

use regex::{Regex, RegexBuilder};
use serde_json::Value;

use crate::error::{FilterError, Result};
use crate::op::Op;
use crate::pattern::fold;

#[derive(Debug, Clone)]
pub enum StringArgs {
    StartsWith(String),
    EndsWith(String),
    Pattern {
        op: Op,
        source: String,
        flags: String,
    },
}

/// A string operator ready for evaluation.
#[derive(Debug, Clone)]
pub enum StringTest {
    StartsWith { needle: String, case_sensitive: bool },
    EndsWith { needle: String, case_sensitive: bool },
    Regex(Regex),
}

pub fn parse(op: Op, payload: &Value) -> Result<StringArgs> {
    let args = match op {
        Op::StartsWith => StringArgs::StartsWith(super::expect_string(op, payload)?),
        Op::EndsWith => StringArgs::EndsWith(super::expect_string(op, payload)?),
        _ => {
            let (source, flags) = match payload {
                Value::Object(map) if op == Op::Regex => {
                    let source = map
                        .get("pattern")
                        .and_then(Value::as_str)
                        .ok_or_else(|| {
                            FilterError::operator(op.as_str(), "object payload needs a 'pattern' string")
                        })?;
                    let flags = match map.get("flags") {
                        None | Some(Value::Null) => "",
                        Some(Value::String(flags)) => flags.as_str(),
                        Some(other) => {
                            return Err(FilterError::operator(
                                op.as_str(),
                                format!("'flags' must be a string, got {}", other),
                            ))
                        }
                    };
                    (source.to_string(), flags.to_string())
                }
                _ => (super::expect_string(op, payload)?, String::new()),
            };
            if let Some(bad) = flags.chars().find(|c| !"imsx".contains(*c)) {
                return Err(FilterError::operator(
                    op.as_str(),
                    format!("unsupported regex flag '{}'", bad),
                ));
            }
            // Compile once here so bad patterns surface before any traversal.
            build_regex(op, &source, &flags, true)?;
            StringArgs::Pattern { op, source, flags }
        }
    };
    Ok(args)
}

fn build_regex(op: Op, source: &str, flags: &str, case_sensitive: bool) -> Result<Regex> {
    RegexBuilder::new(source)
        .case_insensitive(!case_sensitive || flags.contains('i'))
        .multi_line(flags.contains('m'))
        .dot_matches_new_line(flags.contains('s'))
        .ignore_whitespace(flags.contains('x'))
        .build()
        .map_err(|source| FilterError::InvalidRegex {
            operator: op.as_str(),
            source,
        })
}

pub fn compile(args: &StringArgs, case_sensitive: bool) -> Result<StringTest> {
    Ok(match args {
        StringArgs::StartsWith(needle) => StringTest::StartsWith {
            needle: fold(needle, case_sensitive),
            case_sensitive,
        },
        StringArgs::EndsWith(needle) => StringTest::EndsWith {
            needle: fold(needle, case_sensitive),
            case_sensitive,
        },
        StringArgs::Pattern { op, source, flags } => {
            let case_sensitive = match op {
                Op::Match => case_sensitive,
                _ => true,
            };
            StringTest::Regex(build_regex(*op, source, flags, case_sensitive)?)
        }
    })
}

/// Evaluates a string test. Array-valued actuals match if any string element does.
pub fn evaluate(test: &StringTest, actual: &Value) -> bool {
    match actual {
        Value::String(s) => evaluate_str(test, s),
        Value::Array(items) => items
            .iter()
            .any(|item| item.as_str().is_some_and(|s| evaluate_str(test, s))),
        _ => false,
    }
}

fn evaluate_str(test: &StringTest, s: &str) -> bool {
    match test {
        StringTest::StartsWith {
            needle,
            case_sensitive,
        } => fold(s, *case_sensitive).starts_with(needle.as_str()),
        StringTest::EndsWith {
            needle,
            case_sensitive,
        } => fold(s, *case_sensitive).ends_with(needle.as_str()),
        StringTest::Regex(regex) => regex.is_match(s),
    }
}
