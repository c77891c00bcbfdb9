//! Memory policy: what prior context an agent sees under `memory`.

use memora_types::agent::AgentDefinition;
use serde_json::{Map, Value};
use tracing::warn;

use super::Input;

/// Rough token cost of one message when trimming history.
const TOKENS_PER_MESSAGE: u32 = 100;

/// Build the memory context for `definition` from the render context.
///
/// Returns `None` when the agent has no memory strategy.
pub fn build_memory(definition: &AgentDefinition, context: &Input) -> Option<Map<String, Value>> {
    let policy = definition.memory.as_ref()?;
    let strategy = policy.strategy.as_deref().unwrap_or("none");

    let mut memory = Map::new();
    match strategy {
        "none" => return None,
        "conversation" => {
            let messages = context
                .get("messages")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            memory.insert(
                "messages".to_string(),
                Value::Array(limit_messages(messages, policy.max_tokens)),
            );
        }
        "contact" => {
            if let Some(contact @ Value::Object(_)) = context.get("contact") {
                memory.insert("contact".to_string(), contact.clone());
            }
        }
        "custom" => {
            if let Some(Value::Object(custom)) = context.get("memory") {
                memory.extend(custom.clone());
            }
        }
        other => warn!(agent_id = %definition.id, strategy = other, "unknown memory strategy"),
    }
    Some(memory)
}

/// Keep the most recent messages that fit `max_tokens`, at least one.
fn limit_messages(messages: Vec<Value>, max_tokens: Option<u32>) -> Vec<Value> {
    let Some(max_tokens) = max_tokens.filter(|t| *t > 0) else {
        return messages;
    };
    let keep = (max_tokens / TOKENS_PER_MESSAGE).max(1) as usize;
    if messages.len() <= keep {
        return messages;
    }
    messages[messages.len() - keep..].to_vec()
}
