//! Routed capabilities: agents whose cache key depends on entities the
//! caller only names by id.

pub mod archive_brief;
pub mod sources;
pub mod title_summary;

use memora_types::entity::ConversationRecord;
use memora_types::error::{RepositoryError, RuntimeError};
use memora_types::execution::{ExecuteOptions, ExecutionResult};
use memora_types::snapshot::{FindOptions, NewSnapshot, SnapshotIdentity};
use serde_json::{Value, json};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::runtime::Input;
use crate::runtime::handler::RuntimeCore;

/// TTL of snapshots written by routed capabilities (24 hours).
pub const CAPABILITY_TTL_SECONDS: i64 = 86_400;

/// A non-empty string id from the input, then from `fallback`.
pub(crate) fn id_from(input: &Input, key: &str, fallback: Option<&String>) -> Option<String> {
    input
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .or_else(|| fallback.map(String::as_str).filter(|s| !s.is_empty()))
        .map(str::to_string)
}

pub(crate) fn require(id: Option<String>, what: &str) -> Result<String, RuntimeError> {
    id.ok_or_else(|| RuntimeError::InvalidInput(format!("{what} is required")))
}

pub(crate) fn source_failed(e: RepositoryError) -> RuntimeError {
    RuntimeError::ServiceUnavailable(format!("entity source failed: {e}"))
}

/// Conversation fields that feed both the prompt and the source hash.
pub(crate) fn conversation_input(conversation: &ConversationRecord) -> Input {
    let messages: Vec<Value> = conversation
        .messages
        .iter()
        .map(|m| json!({"role": m.role, "content": m.content}))
        .collect();
    let mut input = Input::new();
    input.insert("conversationId".to_string(), json!(conversation.id));
    input.insert("content".to_string(), json!(conversation.content));
    input.insert("messages".to_string(), Value::Array(messages));
    input
}

/// Options for the generic run a handler delegates to: routing off and the
/// handler owning the cache.
pub(crate) fn delegated(options: &ExecuteOptions) -> ExecuteOptions {
    ExecuteOptions {
        use_cache: false,
        skip_routing: true,
        ..options.clone()
    }
}

/// Return the cached result for `identity` when caching applies.
pub(crate) async fn probe(
    core: &dyn RuntimeCore,
    identity: &SnapshotIdentity,
    options: &ExecuteOptions,
) -> Result<Option<ExecutionResult>, RuntimeError> {
    if !options.use_cache || options.force_refresh {
        return Ok(None);
    }
    let found = core.find_snapshot(identity, FindOptions::default()).await?;
    match (found.cached, found.snapshot) {
        (true, Some(snapshot)) => {
            debug!(agent_id = %identity.agent_id, snapshot_id = %snapshot.id, "snapshot cache hit");
            Ok(Some(ExecutionResult {
                run_id: Uuid::now_v7(),
                cached: true,
                snapshot_id: Some(snapshot.id),
                data: snapshot.output,
            }))
        }
        _ => Ok(None),
    }
}

/// Store a capability result; failures are logged and swallowed.
pub(crate) async fn persist(
    core: &dyn RuntimeCore,
    identity: SnapshotIdentity,
    input: Input,
    output: &Value,
    options: &ExecuteOptions,
) -> Option<Uuid> {
    if !options.use_cache {
        return None;
    }
    let agent_id = identity.agent_id.clone();
    let data = NewSnapshot {
        identity,
        model: Some(core.effective_model(options)),
        input: Value::Object(input),
        output: output.clone(),
    };
    match core.create_snapshot(data, Some(CAPABILITY_TTL_SECONDS)).await {
        Ok(snapshot) => Some(snapshot.id),
        Err(e) => {
            warn!(agent_id = %agent_id, error = %e, "failed to save snapshot");
            None
        }
    }
}

/// A string field of `data`, or `fallback` when absent, empty or not a string.
pub(crate) fn string_or(data: &Value, key: &str, fallback: impl Into<String>) -> String {
    data.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map_or_else(|| fallback.into(), str::to_string)
}
