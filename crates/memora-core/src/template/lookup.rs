//! Context-stack name resolution shared by the renderer and the scanner.

use serde_json::Value;

/// Resolve a (possibly dotted) name against a context stack, innermost frame first.
///
/// `.` resolves to the innermost frame. A key that exists with a `null`
/// value counts as found.
pub fn resolve<'v>(stack: &[&'v Value], name: &str) -> Option<&'v Value> {
    if name == "." {
        return stack.last().copied();
    }
    stack.iter().rev().find_map(|frame| resolve_in(frame, name))
}

/// Resolve a dotted path inside a single value.
pub fn resolve_in<'v>(value: &'v Value, path: &str) -> Option<&'v Value> {
    path.split('.')
        .try_fold(value, |current, part| current.as_object()?.get(part))
}

/// Section truthiness: empty lists, empty strings, zero, `false` and `null` are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_none_or(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolve_dotted_path() {
        let ctx = json!({"contact": {"name": "Ada", "company": null}});
        let stack = [&ctx];
        assert_eq!(resolve(&stack, "contact.name"), Some(&json!("Ada")));
        assert_eq!(resolve(&stack, "contact.company"), Some(&Value::Null));
        assert_eq!(resolve(&stack, "contact.title"), None);
        assert_eq!(resolve(&stack, "contact.name.first"), None);
    }

    #[test]
    fn test_resolve_walks_stack_outward() {
        let root = json!({"user": "root-user", "shared": 1});
        let item = json!({"shared": 2});
        let stack = [&root, &item];
        assert_eq!(resolve(&stack, "shared"), Some(&json!(2)));
        assert_eq!(resolve(&stack, "user"), Some(&json!("root-user")));
        assert_eq!(resolve(&stack, "."), Some(&item));
    }

    #[test]
    fn test_truthiness() {
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!([])));
        assert!(is_truthy(&json!({})));
        assert!(is_truthy(&json!([0])));
        assert!(is_truthy(&json!("x")));
        assert!(is_truthy(&json!(-1.5)));
    }
}
