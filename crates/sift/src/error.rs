//! Error types for the sift crate.

use std::fmt;

use thiserror::Error;

/// A single structural problem found while validating an expression.
///
/// Violations are collected across the whole expression so callers see every
/// problem at once instead of fixing them one by one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Dotted location of the offending key (`$root` for the top level).
    pub path: String,
    /// Human readable description of the problem.
    pub message: String,
}

impl Violation {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Violation {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "at `{}`: {}", self.path, self.message)
    }
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(Violation::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn field_suffix(field: &Option<String>) -> String {
    match field {
        Some(name) => format!(" (field `{}`)", name),
        None => String::new(),
    }
}

/// Errors that can occur when validating, compiling, or running a filter.
#[derive(Debug, Error)]
pub enum FilterError {
    /// The expression is structurally malformed.
    #[error("invalid expression: {}", join_violations(.violations))]
    InvalidExpression { violations: Vec<Violation> },

    /// An operator was given a payload of the wrong shape or type.
    #[error("operator '{operator}': {message}")]
    Operator {
        operator: &'static str,
        message: String,
    },

    /// General validation failure, optionally tied to one field or argument.
    #[error("validation failed{}: {message}", field_suffix(.field))]
    Validation {
        field: Option<String>,
        message: String,
    },

    /// An option value is out of range or malformed.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Input of the wrong type, either a non-collection or a bad field value.
    #[error("type mismatch{}: expected {expected}, got {actual}", field_suffix(.field))]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
        field: Option<String>,
    },

    /// Coordinates outside the valid latitude/longitude ranges.
    #[error("geospatial error: {0}")]
    Geospatial(String),

    /// A `$regex` or `$match` pattern failed to compile.
    #[error("invalid regex pattern for '{operator}': {source}")]
    InvalidRegex {
        operator: &'static str,
        #[source]
        source: regex::Error,
    },
}

impl FilterError {
    pub(crate) fn operator(operator: &'static str, message: impl Into<String>) -> Self {
        FilterError::Operator {
            operator,
            message: message.into(),
        }
    }

    pub(crate) fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        FilterError::Validation {
            field: Some(field.into()),
            message: message.into(),
        }
    }

    /// Returns the violations of an [`FilterError::InvalidExpression`], if any.
    pub fn violations(&self) -> &[Violation] {
        match self {
            FilterError::InvalidExpression { violations } => violations,
            _ => &[],
        }
    }
}

/// Result type for sift operations.
pub type Result<T> = std::result::Result<T, FilterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_expression_lists_every_violation() {
        let err = FilterError::InvalidExpression {
            violations: vec![
                Violation::new("age", "unknown operator '$gtx'"),
                Violation::new("tags", "'$in' expects an array"),
            ],
        };
        assert_eq!(
            err.to_string(),
            "invalid expression: at `age`: unknown operator '$gtx'; at `tags`: '$in' expects an array"
        );
        assert_eq!(err.violations().len(), 2);
    }

    #[test]
    fn operator_error_names_operator() {
        let err = FilterError::operator("$and", "expected an array of sub-expressions");
        assert_eq!(
            err.to_string(),
            "operator '$and': expected an array of sub-expressions"
        );
        assert!(err.violations().is_empty());
    }

    #[test]
    fn field_suffix_only_when_present() {
        let err = FilterError::validation("chunk_size", "must be a positive integer");
        assert_eq!(
            err.to_string(),
            "validation failed (field `chunk_size`): must be a positive integer"
        );

        let err = FilterError::TypeMismatch {
            expected: "array",
            actual: "object",
            field: None,
        };
        assert_eq!(err.to_string(), "type mismatch: expected array, got object");
    }
}
