//! Template rendering over a JSON context.

use serde_json::Value;

use super::ast::{Node, Template};
use super::lookup::{is_truthy, resolve};

/// Render a parsed template against `context`.
///
/// Missing names render as empty strings. Arrays and objects interpolate as
/// compact JSON.
pub fn render(template: &Template, context: &Value) -> String {
    let mut out = String::new();
    let mut stack = vec![context];
    render_nodes(&template.nodes, &mut stack, &mut out);
    out
}

fn render_nodes<'v>(nodes: &[Node], stack: &mut Vec<&'v Value>, out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Variable { name, escape } => {
                if let Some(value) = resolve(stack, name) {
                    let text = format_value(value);
                    if *escape {
                        escape_html(&text, out);
                    } else {
                        out.push_str(&text);
                    }
                }
            }
            Node::Section {
                name,
                inverted,
                children,
            } => {
                let value = resolve(stack, name).filter(|v| is_truthy(v));
                match (value, *inverted) {
                    (None, true) => render_nodes(children, stack, out),
                    (Some(_), true) | (None, false) => {}
                    (Some(Value::Array(items)), false) => {
                        for item in items {
                            stack.push(item);
                            render_nodes(children, stack, out);
                            stack.pop();
                        }
                    }
                    (Some(value @ Value::Object(_)), false) => {
                        stack.push(value);
                        render_nodes(children, stack, out);
                        stack.pop();
                    }
                    (Some(_), false) => render_nodes(children, stack, out),
                }
            }
            Node::Partial(_) => {}
        }
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn escape_html(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '/' => out.push_str("&#x2F;"),
            '`' => out.push_str("&#x60;"),
            '=' => out.push_str("&#x3D;"),
            c => out.push(c),
        }
    }
}
