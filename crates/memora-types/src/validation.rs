//! Output validation results.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One violation found while checking output against a schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Dotted/indexed path to the offending value; empty for the root.
    pub path: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() {
            "(root)"
        } else {
            &self.path
        };
        write!(f, "{path}: {}", self.message)
    }
}

/// Outcome of a validation pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<ValidationIssue>>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self {
            valid: true,
            errors: None,
        }
    }

    pub fn failed(errors: Vec<ValidationIssue>) -> Self {
        Self {
            valid: false,
            errors: Some(errors),
        }
    }

    /// `path: message` pairs joined with `; `.
    pub fn summary(&self) -> String {
        self.errors
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_uses_root_marker() {
        let result = ValidationResult::failed(vec![
            ValidationIssue::new("", "expected object"),
            ValidationIssue::new("items[1]", "expected string"),
        ]);
        assert_eq!(
            result.summary(),
            "(root): expected object; items[1]: expected string"
        );
    }

    #[test]
    fn test_ok_has_no_errors() {
        let result = ValidationResult::ok();
        assert!(result.valid);
        assert!(result.errors.is_none());
        assert_eq!(result.summary(), "");
    }
}
