//! PromptRenderer -- turns a definition bundle plus runtime context into the
//! system/user prompt pair.
//!
//! Rendering never fails as a whole: missing variables and broken templates
//! are reported as [`RenderWarning`]s, and a template that cannot be parsed
//! is returned verbatim.

use std::collections::HashSet;

use memora_types::agent::DefinitionBundle;
use memora_types::render::{RenderResult, RenderWarning};
use serde_json::{Map, Value};
use tracing::debug;

use super::ast::{parse, Template, TemplateError};
use super::render::render;
use super::scan::{missing_variables, missing_variables_unparsed};

/// Renders agent prompts with defaults merging and diagnostics.
#[derive(Debug, Default, Clone, Copy)]
pub struct PromptRenderer;

impl PromptRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Render both prompts of `bundle` against `context`.
    pub fn render(&self, bundle: &DefinitionBundle, context: &Map<String, Value>) -> RenderResult {
        let mut warnings = Vec::new();

        let merged = Value::Object(merge_defaults(context, &bundle.defaults, "", &mut warnings));

        let system = parse(&bundle.system_template);
        let user = parse(&bundle.user_template);

        let mut seen = HashSet::new();
        for (parsed, source) in [
            (&system, &bundle.system_template),
            (&user, &bundle.user_template),
        ] {
            let missing = match parsed {
                Ok(template) => missing_variables(template, &merged),
                Err(_) => missing_variables_unparsed(source, &merged),
            };
            for path in missing {
                if seen.insert(path.clone()) {
                    let message = format!(
                        "Variable \"{path}\" is missing in context, using default value if available"
                    );
                    warnings.push(RenderWarning::new(path, message));
                }
            }
        }

        let system = render_or_raw(system, &bundle.system_template, "system", &merged, &mut warnings);
        let user = render_or_raw(user, &bundle.user_template, "user", &merged, &mut warnings);

        if !warnings.is_empty() {
            debug!(
                agent_id = %bundle.definition.id,
                count = warnings.len(),
                "template rendering produced warnings"
            );
        }

        RenderResult {
            system,
            user,
            warnings,
        }
    }
}

fn render_or_raw(
    parsed: Result<Template, TemplateError>,
    source: &str,
    which: &str,
    context: &Value,
    warnings: &mut Vec<RenderWarning>,
) -> String {
    match parsed {
        Ok(template) => render(&template, context),
        Err(e) => {
            warnings.push(RenderWarning::new(
                which,
                format!("Failed to render {which} template: {e}"),
            ));
            source.to_string()
        }
    }
}

/// Fill keys missing from `context` with values from `defaults`.
///
/// A key absent from the context is copied and warned about. When both sides
/// hold plain objects the merge recurses, warning only for the sub-keys it
/// fills. Keys present in the context (even as `null`) are never replaced.
pub fn merge_defaults(
    context: &Map<String, Value>,
    defaults: &Map<String, Value>,
    prefix: &str,
    warnings: &mut Vec<RenderWarning>,
) -> Map<String, Value> {
    let mut merged = context.clone();

    for (key, default) in defaults {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };

        match merged.get_mut(key) {
            None => {
                merged.insert(key.clone(), default.clone());
                warnings.push(RenderWarning::new(
                    path,
                    format!("Using default value for \"{key}\""),
                ));
            }
            Some(Value::Object(existing)) => {
                if let Value::Object(default_obj) = default {
                    let nested = merge_defaults(existing, default_obj, &path, warnings);
                    *existing = nested;
                }
            }
            Some(_) => {}
        }
    }

    merged
}
