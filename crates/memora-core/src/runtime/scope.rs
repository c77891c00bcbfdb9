//! Snapshot scope resolution.

use memora_types::execution::ExecuteOptions;
use memora_types::snapshot::ScopeType;
use serde_json::Value;

use super::Input;

fn non_empty<'a>(input: &'a Input, key: &str) -> Option<&'a str> {
    match input.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        _ => None,
    }
}

fn non_empty_opt(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|s| !s.is_empty())
}

/// Conversation scope when a conversation id is present (input or options),
/// else contact scope when the input names a contact, else user scope.
pub fn resolve_scope(input: &Input, options: &ExecuteOptions) -> (ScopeType, Option<String>) {
    let conversation = non_empty(input, "conversationId")
        .or_else(|| non_empty_opt(options.conversation_id.as_ref()));
    if let Some(id) = conversation {
        return (ScopeType::Conversation, Some(id.to_string()));
    }

    if let Some(id) = non_empty(input, "contactId") {
        return (ScopeType::Contact, Some(id.to_string()));
    }

    let user = non_empty_opt(options.user_id.as_ref()).or_else(|| non_empty(input, "userId"));
    (ScopeType::User, user.map(str::to_string))
}
