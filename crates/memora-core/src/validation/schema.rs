//! Schema AST and compiler.
//!
//! Supported grammar (recursive): `string` (minLength/maxLength), `number`
//! and `integer` (minimum/maximum), `boolean`, `array` (items, minItems,
//! maxItems), `object` (properties, required) and `enum` on any node.
//!
//! Object properties are required unless the schema carries a `required`
//! list that omits them: no list means every listed property is required.

use memora_types::error::SchemaError;
use serde_json::{Map, Value};

/// Compiled schema node.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaNode {
    pub kind: SchemaKind,
    pub enum_values: Option<Vec<Value>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SchemaKind {
    /// No `type`: only `enum` (if any) is checked.
    Any,
    String {
        min_length: Option<u64>,
        max_length: Option<u64>,
    },
    Number {
        integer: bool,
        minimum: Option<f64>,
        maximum: Option<f64>,
    },
    Boolean,
    Array {
        items: Option<Box<SchemaNode>>,
        min_items: Option<u64>,
        max_items: Option<u64>,
    },
    Object {
        properties: Vec<PropertySchema>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertySchema {
    pub name: String,
    pub required: bool,
    pub schema: SchemaNode,
}

/// Compile a schema document rooted at `schema`.
pub fn compile(schema: &Value) -> Result<SchemaNode, SchemaError> {
    compile_node(schema, "")
}

fn malformed(path: &str, reason: impl Into<String>) -> SchemaError {
    SchemaError::Malformed {
        path: if path.is_empty() {
            "(root)".to_string()
        } else {
            path.to_string()
        },
        reason: reason.into(),
    }
}

fn compile_node(schema: &Value, path: &str) -> Result<SchemaNode, SchemaError> {
    let Value::Object(node) = schema else {
        return Err(malformed(path, "schema node must be an object"));
    };

    let enum_values = match node.get("enum") {
        None => None,
        Some(Value::Array(values)) => Some(values.clone()),
        Some(_) => return Err(malformed(path, "'enum' must be an array")),
    };

    let declared = match node.get("type") {
        None => None,
        Some(Value::String(t)) => Some(t.as_str()),
        Some(_) => return Err(malformed(path, "'type' must be a string")),
    };

    // Untyped nodes are inferred from their keywords.
    let kind_name = declared.or_else(|| {
        if node.contains_key("properties") {
            Some("object")
        } else if node.contains_key("items") {
            Some("array")
        } else {
            None
        }
    });

    let kind = match kind_name {
        None => SchemaKind::Any,
        Some("string") => SchemaKind::String {
            min_length: count_keyword(node, "minLength", path)?,
            max_length: count_keyword(node, "maxLength", path)?,
        },
        Some(t @ ("number" | "integer")) => SchemaKind::Number {
            integer: t == "integer",
            minimum: number_keyword(node, "minimum", path)?,
            maximum: number_keyword(node, "maximum", path)?,
        },
        Some("boolean") => SchemaKind::Boolean,
        Some("array") => {
            let items = match node.get("items") {
                None => None,
                Some(items) => Some(Box::new(compile_node(items, &format!("{path}[]"))?)),
            };
            SchemaKind::Array {
                items,
                min_items: count_keyword(node, "minItems", path)?,
                max_items: count_keyword(node, "maxItems", path)?,
            }
        }
        Some("object") => SchemaKind::Object {
            properties: compile_properties(node, path)?,
        },
        Some(other) => return Err(malformed(path, format!("unsupported type '{other}'"))),
    };

    Ok(SchemaNode { kind, enum_values })
}

fn compile_properties(
    node: &Map<String, Value>,
    path: &str,
) -> Result<Vec<PropertySchema>, SchemaError> {
    let required: Option<Vec<&str>> = match node.get("required") {
        None => None,
        Some(Value::Array(names)) => Some(
            names
                .iter()
                .map(|n| {
                    n.as_str()
                        .ok_or_else(|| malformed(path, "'required' entries must be strings"))
                })
                .collect::<Result<_, _>>()?,
        ),
        Some(_) => return Err(malformed(path, "'required' must be an array")),
    };

    let properties = match node.get("properties") {
        None => return Ok(Vec::new()),
        Some(Value::Object(props)) => props,
        Some(_) => return Err(malformed(path, "'properties' must be an object")),
    };

    properties
        .iter()
        .map(|(name, schema)| {
            let child = if path.is_empty() {
                name.clone()
            } else {
                format!("{path}.{name}")
            };
            Ok(PropertySchema {
                name: name.clone(),
                required: required
                    .as_ref()
                    .is_none_or(|list| list.contains(&name.as_str())),
                schema: compile_node(schema, &child)?,
            })
        })
        .collect()
}

fn count_keyword(
    node: &Map<String, Value>,
    key: &str,
    path: &str,
) -> Result<Option<u64>, SchemaError> {
    match node.get(key) {
        None => Ok(None),
        Some(v) => v
            .as_u64()
            .map(Some)
            .ok_or_else(|| malformed(path, format!("'{key}' must be a non-negative integer"))),
    }
}

fn number_keyword(
    node: &Map<String, Value>,
    key: &str,
    path: &str,
) -> Result<Option<f64>, SchemaError> {
    match node.get(key) {
        None => Ok(None),
        Some(v) => v
            .as_f64()
            .map(Some)
            .ok_or_else(|| malformed(path, format!("'{key}' must be a number"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_compile_object_with_required_list() {
        let node = compile(&json!({
            "type": "object",
            "properties": {
                "title": {"type": "string", "maxLength": 50},
                "note": {"type": "string"}
            },
            "required": ["title"]
        }))
        .unwrap();

        let SchemaKind::Object { properties } = node.kind else {
            panic!("expected object");
        };
        let title = properties.iter().find(|p| p.name == "title").unwrap();
        let note = properties.iter().find(|p| p.name == "note").unwrap();
        assert!(title.required);
        assert!(!note.required);
    }

    #[test]
    fn test_properties_required_without_required_list() {
        let node = compile(&json!({
            "type": "object",
            "properties": {"a": {"type": "string"}, "b": {"type": "number"}}
        }))
        .unwrap();
        let SchemaKind::Object { properties } = node.kind else {
            panic!("expected object");
        };
        assert!(properties.iter().all(|p| p.required));
    }

    #[test]
    fn test_untyped_nodes_are_inferred() {
        let node = compile(&json!({"items": {"type": "string"}})).unwrap();
        assert!(matches!(node.kind, SchemaKind::Array { .. }));
        let node = compile(&json!({"enum": ["a", "b"]})).unwrap();
        assert_eq!(node.kind, SchemaKind::Any);
        assert_eq!(node.enum_values.unwrap().len(), 2);
    }

    #[test]
    fn test_non_object_node_is_malformed() {
        let err = compile(&json!({
            "type": "object",
            "properties": {"tags": {"type": "array", "items": "string"}}
        }))
        .unwrap_err();
        let SchemaError::Malformed { path, .. } = err;
        assert_eq!(path, "tags[]");

        assert!(compile(&json!("string")).is_err());
    }

    #[test]
    fn test_bad_keywords_are_malformed() {
        assert!(compile(&json!({"type": "string", "minLength": -1})).is_err());
        assert!(compile(&json!({"type": "uuid"})).is_err());
        assert!(compile(&json!({"type": "object", "required": "a"})).is_err());
        assert!(compile(&json!({"enum": "a"})).is_err());
    }
}
