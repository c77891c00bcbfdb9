//! Validate generated output against an agent's output schema.

use std::sync::Arc;

use dashmap::DashMap;
use memora_types::agent::DefinitionBundle;
use memora_types::error::{RuntimeError, SchemaError};
use memora_types::validation::{ValidationIssue, ValidationResult};
use serde_json::Value;

use super::schema::{self, SchemaKind, SchemaNode};

/// Checks output values against compiled output schemas.
///
/// Compiled schemas are memoized per agent id, version and schema text, so a
/// reloaded definition with a changed schema compiles afresh.
#[derive(Debug, Default)]
pub struct OutputValidator {
    compiled: DashMap<String, Arc<SchemaNode>>,
}

impl OutputValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate `output` against the bundle's output schema.
    ///
    /// Every violation is collected. A schema node that cannot be interpreted
    /// is an error, never a validation failure.
    pub fn validate(
        &self,
        bundle: &DefinitionBundle,
        output: &Value,
    ) -> Result<ValidationResult, SchemaError> {
        if bundle.output_schema.is_null() {
            return Ok(ValidationResult::ok());
        }

        let node = self.compiled_schema(bundle)?;
        let mut issues = Vec::new();
        check(&node, output, "", &mut issues);

        if issues.is_empty() {
            Ok(ValidationResult::ok())
        } else {
            Ok(ValidationResult::failed(issues))
        }
    }

    /// Like [`validate`](Self::validate) but turns a failed result into
    /// [`RuntimeError::OutputValidationFailed`].
    pub fn validate_or_throw(
        &self,
        bundle: &DefinitionBundle,
        output: &Value,
    ) -> Result<(), RuntimeError> {
        let result = self.validate(bundle, output)?;
        if result.valid {
            return Ok(());
        }
        Err(RuntimeError::OutputValidationFailed {
            agent_id: bundle.definition.id.clone(),
            issues: result.errors.unwrap_or_default(),
        })
    }

    fn compiled_schema(&self, bundle: &DefinitionBundle) -> Result<Arc<SchemaNode>, SchemaError> {
        let key = format!(
            "{}@{}:{}",
            bundle.definition.id, bundle.definition.version, bundle.output_schema
        );
        if let Some(node) = self.compiled.get(&key) {
            return Ok(node.value().clone());
        }
        let node = Arc::new(schema::compile(&bundle.output_schema)?);
        self.compiled.insert(key, node.clone());
        Ok(node)
    }
}

fn child_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn check(node: &SchemaNode, value: &Value, path: &str, issues: &mut Vec<ValidationIssue>) {
    if let Some(allowed) = &node.enum_values {
        if !allowed.contains(value) {
            issues.push(ValidationIssue::new(
                path,
                "must be equal to one of the allowed values",
            ));
        }
    }

    match &node.kind {
        SchemaKind::Any => {}
        SchemaKind::String {
            min_length,
            max_length,
        } => {
            let Value::String(s) = value else {
                issues.push(mismatch(path, "string", value));
                return;
            };
            let len = s.chars().count() as u64;
            if let Some(min) = min_length.filter(|min| len < *min) {
                issues.push(ValidationIssue::new(
                    path,
                    format!("must NOT have fewer than {min} characters"),
                ));
            }
            if let Some(max) = max_length.filter(|max| len > *max) {
                issues.push(ValidationIssue::new(
                    path,
                    format!("must NOT have more than {max} characters"),
                ));
            }
        }
        SchemaKind::Number {
            integer,
            minimum,
            maximum,
        } => {
            let Some(n) = value.as_f64() else {
                let expected = if *integer { "integer" } else { "number" };
                issues.push(mismatch(path, expected, value));
                return;
            };
            if *integer && n.fract() != 0.0 {
                issues.push(mismatch(path, "integer", value));
            }
            if let Some(min) = minimum.filter(|min| n < *min) {
                issues.push(ValidationIssue::new(path, format!("must be >= {min}")));
            }
            if let Some(max) = maximum.filter(|max| n > *max) {
                issues.push(ValidationIssue::new(path, format!("must be <= {max}")));
            }
        }
        SchemaKind::Boolean => {
            if !value.is_boolean() {
                issues.push(mismatch(path, "boolean", value));
            }
        }
        SchemaKind::Array {
            items,
            min_items,
            max_items,
        } => {
            let Value::Array(elements) = value else {
                issues.push(mismatch(path, "array", value));
                return;
            };
            let len = elements.len() as u64;
            if let Some(min) = min_items.filter(|min| len < *min) {
                issues.push(ValidationIssue::new(
                    path,
                    format!("must NOT have fewer than {min} items"),
                ));
            }
            if let Some(max) = max_items.filter(|max| len > *max) {
                issues.push(ValidationIssue::new(
                    path,
                    format!("must NOT have more than {max} items"),
                ));
            }
            if let Some(items) = items {
                for (i, element) in elements.iter().enumerate() {
                    check(items, element, &format!("{path}[{i}]"), issues);
                }
            }
        }
        SchemaKind::Object { properties } => {
            let Value::Object(map) = value else {
                issues.push(mismatch(path, "object", value));
                return;
            };
            for prop in properties {
                let prop_path = child_path(path, &prop.name);
                match map.get(&prop.name) {
                    Some(v) => check(&prop.schema, v, &prop_path, issues),
                    None if prop.required => {
                        issues.push(ValidationIssue::new(
                            prop_path,
                            format!("must have required property '{}'", prop.name),
                        ));
                    }
                    None => {}
                }
            }
        }
    }
}

fn mismatch(path: &str, expected: &str, value: &Value) -> ValidationIssue {
    ValidationIssue::new(
        path,
        format!("must be {expected}, got {}", type_name(value)),
    )
}
