//! Tool policy filtering.

use memora_types::agent::{AgentDefinition, ToolMode};
use tracing::warn;

/// Tool names `definition` may use out of `available`.
///
/// No policy grants nothing. In denylist mode `allowedTools` lists the
/// denied names.
pub fn filter_tools(definition: &AgentDefinition, available: &[String]) -> Vec<String> {
    let Some(policy) = &definition.tools else {
        return Vec::new();
    };

    match policy.mode {
        ToolMode::None => Vec::new(),
        ToolMode::Allowlist => {
            let missing: Vec<&str> = policy
                .allowed_tools
                .iter()
                .filter(|t| !available.contains(t))
                .map(String::as_str)
                .collect();
            if !missing.is_empty() {
                warn!(agent_id = %definition.id, missing = ?missing, "requested tools not available");
            }
            available
                .iter()
                .filter(|t| policy.allowed_tools.contains(t))
                .cloned()
                .collect()
        }
        ToolMode::Denylist => available
            .iter()
            .filter(|t| !policy.allowed_tools.contains(t))
            .cloned()
            .collect(),
    }
}
