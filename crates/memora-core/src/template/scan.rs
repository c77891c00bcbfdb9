//! Static missing-variable scan.
//!
//! Walks the template AST the way the renderer would: sections only descend
//! when truthy (once per array item, with the item pushed onto the stack),
//! inverted sections only when falsy. A variable that resolves nowhere on
//! the stack is reported once, in first-seen order.

use std::collections::HashSet;

use serde_json::Value;

use super::ast::{Node, Template};
use super::lookup::{is_truthy, resolve};

/// Collect the names referenced by `template` that do not resolve against `context`.
pub fn missing_variables(template: &Template, context: &Value) -> Vec<String> {
    let mut found = Vec::new();
    let mut seen = HashSet::new();
    let mut stack = vec![context];
    scan_nodes(&template.nodes, &mut stack, &mut found, &mut seen);
    found
}

/// Fallback for templates that fail to parse: every `{{name}}` that is not a
/// block/comment/raw marker, checked against the root context only.
pub fn missing_variables_unparsed(source: &str, context: &Value) -> Vec<String> {
    let mut found = Vec::new();
    let mut seen = HashSet::new();
    let mut rest = source;

    while let Some(open) = rest.find("{{") {
        let after = &rest[open + 2..];
        let Some(close) = after.find("}}") else { break };
        let name = after[..close].trim();
        rest = &after[close + 2..];

        if name.is_empty() || name.starts_with(['#', '/', '^', '&', '!', '>', '=', '{']) {
            continue;
        }
        if resolve(&[context], name).is_none() && seen.insert(name.to_string()) {
            found.push(name.to_string());
        }
    }
    found
}

fn scan_nodes<'v>(
    nodes: &[Node],
    stack: &mut Vec<&'v Value>,
    found: &mut Vec<String>,
    seen: &mut HashSet<String>,
) {
    for node in nodes {
        match node {
            Node::Text(_) | Node::Partial(_) => {}
            Node::Variable { name, .. } => {
                if name == "." {
                    continue;
                }
                if resolve(stack, name).is_none() && seen.insert(name.clone()) {
                    found.push(name.clone());
                }
            }
            Node::Section {
                name,
                inverted,
                children,
            } => {
                let value = resolve(stack, name).filter(|v| is_truthy(v));
                match (value, *inverted) {
                    (None, true) => scan_nodes(children, stack, found, seen),
                    (Some(_), true) | (None, false) => {}
                    (Some(Value::Array(items)), false) => {
                        for item in items {
                            stack.push(item);
                            scan_nodes(children, stack, found, seen);
                            stack.pop();
                        }
                    }
                    (Some(value @ Value::Object(_)), false) => {
                        stack.push(value);
                        scan_nodes(children, stack, found, seen);
                        stack.pop();
                    }
                    (Some(_), false) => scan_nodes(children, stack, found, seen),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::ast::parse;
    use serde_json::json;

    fn scan(source: &str, context: Value) -> Vec<String> {
        missing_variables(&parse(source).unwrap(), &context)
    }

    #[test]
    fn test_reports_missing_top_level_and_dotted() {
        let ctx = json!({"contact": {"name": "Ada"}});
        assert_eq!(
            scan("{{missingVar}} {{contact.name}} {{contact.company}}", ctx),
            vec!["missingVar".to_string(), "contact.company".to_string()]
        );
    }

    #[test]
    fn test_null_values_count_as_present() {
        assert!(scan("{{nickname}}", json!({"nickname": null})).is_empty());
    }

    #[test]
    fn test_reports_each_name_once() {
        assert_eq!(scan("{{a}}{{a}}{{b}}", json!({})), vec!["a", "b"]);
    }

    #[test]
    fn test_falsy_sections_are_not_descended() {
        let ctx = json!({"items": []});
        assert!(scan("{{#items}}{{title}}{{/items}}", ctx).is_empty());
        assert!(scan("{{#absent}}{{title}}{{/absent}}", json!({})).is_empty());
    }

    #[test]
    fn test_section_items_resolve_against_item_frame() {
        let ctx = json!({"items": [{"title": "a"}, {"other": 1}]});
        assert_eq!(
            scan("{{#items}}{{title}}{{/items}}", ctx),
            vec!["title".to_string()]
        );
    }

    #[test]
    fn test_inverted_sections_scan_only_when_falsy() {
        assert_eq!(
            scan("{{^items}}{{placeholder}}{{/items}}", json!({"items": []})),
            vec!["placeholder".to_string()]
        );
        assert!(scan("{{^items}}{{placeholder}}{{/items}}", json!({"items": [1]})).is_empty());
    }

    #[test]
    fn test_dot_is_never_missing() {
        assert!(scan("{{#tags}}{{.}}{{/tags}}", json!({"tags": ["x"]})).is_empty());
    }

    #[test]
    fn test_unparsed_fallback_skips_markers() {
        let missing = missing_variables_unparsed(
            "{{#open}}{{name}}{{! note}}{{/open}}{{present}}{{=<% %>=}}",
            &json!({"present": 1}),
        );
        assert_eq!(missing, vec!["name".to_string()]);
    }
}
