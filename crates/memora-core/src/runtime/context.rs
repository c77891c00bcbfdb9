//! Render context construction.

use memora_types::execution::ExecuteOptions;
use serde_json::Value;

use super::Input;

/// Build the context handed to the renderer and stored as snapshot input.
///
/// The input is spread at the top level, then `operation` (null when
/// absent), `userId` when known, and the optional run hints.
pub fn build_context(input: &Input, operation: Option<&str>, options: &ExecuteOptions) -> Input {
    let mut context = input.clone();
    context.insert(
        "operation".to_string(),
        operation.map_or(Value::Null, |op| Value::String(op.to_string())),
    );
    if let Some(user_id) = &options.user_id {
        context.insert("userId".to_string(), Value::String(user_id.clone()));
    }
    if let Some(intent) = &options.intent {
        context.insert("intent".to_string(), Value::String(intent.clone()));
    }
    if let Some(mix) = &options.relationship_mix {
        context.insert("relationshipMix".to_string(), Value::String(mix.clone()));
    }
    if let Some(minutes) = options.time_budget_minutes {
        context.insert("timeBudgetMinutes".to_string(), Value::from(minutes));
    }
    context
}
