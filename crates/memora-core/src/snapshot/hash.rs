//! Source hashing for snapshot identity.
//!
//! The hashed document is `{agentId, operation, ...input}` serialized
//! canonically (object keys sorted at every level, compact). The digest
//! algorithm is pluggable through [`ContentHasher`]; the SHA-256 adapter
//! lives in memora-infra.

use memora_types::error::SnapshotError;
use serde::Serialize;
use serde_json::{Map, Value};

/// Abstraction over content hashing.
pub trait ContentHasher: Send + Sync {
    /// Compute a lowercase hex-encoded digest of the given content.
    fn compute_hash(&self, content: &str) -> String;
}

/// Build the canonical document for `(agent_id, operation, input)`.
///
/// An object input is spread at the top level; any other JSON value is
/// stored under `input`. When `fields` is given, only those input keys that
/// are present participate.
pub fn source_document<T: Serialize + ?Sized>(
    agent_id: &str,
    operation: Option<&str>,
    input: &T,
    fields: Option<&[String]>,
) -> Result<Value, SnapshotError> {
    let input =
        serde_json::to_value(input).map_err(|e| SnapshotError::HashBuildFailed(e.to_string()))?;

    let mut doc = Map::new();
    doc.insert("agentId".to_string(), Value::String(agent_id.to_string()));
    doc.insert(
        "operation".to_string(),
        operation.map_or(Value::Null, |op| Value::String(op.to_string())),
    );

    match input {
        Value::Object(map) => match fields {
            Some(fields) => {
                for field in fields {
                    if let Some(v) = map.get(field) {
                        doc.insert(field.clone(), v.clone());
                    }
                }
            }
            None => doc.extend(map),
        },
        Value::Null => {}
        other => {
            doc.insert("input".to_string(), other);
        }
    }

    Ok(Value::Object(doc))
}

/// Serialize `value` with object keys sorted recursively.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                // Serializing a plain string into JSON cannot fail.
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Hash `(agent_id, operation, input)` with `hasher`.
pub fn compute_source_hash<H, T>(
    hasher: &H,
    agent_id: &str,
    operation: Option<&str>,
    input: &T,
    fields: Option<&[String]>,
) -> Result<String, SnapshotError>
where
    H: ContentHasher + ?Sized,
    T: Serialize + ?Sized,
{
    let doc = source_document(agent_id, operation, input, fields)?;
    Ok(hasher.compute_hash(&canonical_json(&doc)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::EchoHasher;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn test_canonical_json_sorts_nested_keys() {
        let a = json!({"b": 1, "a": {"z": [1, {"y": 2, "x": 1}], "c": null}});
        assert_eq!(
            canonical_json(&a),
            r#"{"a":{"c":null,"z":[1,{"x":1,"y":2}]},"b":1}"#
        );
    }

    #[test]
    fn test_key_order_does_not_change_hash() {
        let first: Value = serde_json::from_str(r#"{"x": 1, "y": "two"}"#).unwrap();
        let second: Value = serde_json::from_str(r#"{"y": "two", "x": 1}"#).unwrap();
        let h1 = compute_source_hash(&EchoHasher, "demo", None, &first, None).unwrap();
        let h2 = compute_source_hash(&EchoHasher, "demo", None, &second, None).unwrap();
        assert_eq!(h1, h2);
    }

    #[test]
    fn test_operation_is_null_normalized() {
        let doc = source_document("demo", None, &json!({"q": 1}), None).unwrap();
        assert_eq!(doc, json!({"agentId": "demo", "operation": null, "q": 1}));

        let with_op = compute_source_hash(&EchoHasher, "demo", Some("op"), &json!({}), None);
        let without = compute_source_hash(&EchoHasher, "demo", None, &json!({}), None);
        assert_ne!(with_op.unwrap(), without.unwrap());
    }

    #[test]
    fn test_field_allow_list_narrows_input() {
        let fields = vec!["message".to_string(), "absent".to_string()];
        let doc = source_document(
            "demo",
            None,
            &json!({"message": "hi", "timestamp": 123}),
            Some(&fields),
        )
        .unwrap();
        assert_eq!(doc, json!({"agentId": "demo", "operation": null, "message": "hi"}));

        let a = compute_source_hash(&EchoHasher, "demo", None, &json!({"message": "hi", "timestamp": 1}), Some(&fields));
        let b = compute_source_hash(&EchoHasher, "demo", None, &json!({"message": "hi", "timestamp": 2}), Some(&fields));
        assert_eq!(a.unwrap(), b.unwrap());
    }

    #[test]
    fn test_unserializable_input_fails() {
        let mut bad: HashMap<(u8, u8), u8> = HashMap::new();
        bad.insert((1, 2), 3);
        let err = compute_source_hash(&EchoHasher, "demo", None, &bad, None).unwrap_err();
        assert!(matches!(err, SnapshotError::HashBuildFailed(_)));
        assert_eq!(err.code(), "snapshot_hash_build_failed");
    }
}
