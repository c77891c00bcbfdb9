//! `title_summary`: a short title and summary for one conversation.

use futures_util::future::BoxFuture;
use memora_types::error::RuntimeError;
use memora_types::execution::{ExecuteOptions, ExecutionResult};
use memora_types::snapshot::{ScopeType, SnapshotIdentity};
use serde_json::{Value, json};

use crate::runtime::Input;
use crate::runtime::handler::{CapabilityHandler, RuntimeCore};
use crate::runtime::output::{as_object, unwrap_fence};

use super::sources::ConversationSource;
use super::{conversation_input, delegated, id_from, persist, probe, require, source_failed};

pub const AGENT_ID: &str = "title_summary";

const TITLE_MAX_CHARS: usize = 50;
const SUMMARY_MAX_CHARS: usize = 300;
const FALLBACK_TITLE: &str = "Untitled conversation";
const FALLBACK_SUMMARY: &str = "No summary is available for this conversation.";

pub struct TitleSummaryHandler<C: ConversationSource> {
    conversations: C,
}

impl<C: ConversationSource> TitleSummaryHandler<C> {
    pub fn new(conversations: C) -> Self {
        Self { conversations }
    }

    async fn run(
        &self,
        core: &dyn RuntimeCore,
        input: Input,
        options: ExecuteOptions,
    ) -> Result<ExecutionResult, RuntimeError> {
        let user_id = require(id_from(&input, "userId", options.user_id.as_ref()), "userId")?;
        let conversation_id = require(
            id_from(&input, "conversationId", options.conversation_id.as_ref()),
            "conversationId",
        )?;

        let conversation = self
            .conversations
            .find_conversation(&user_id, &conversation_id)
            .await
            .map_err(source_failed)?
            .ok_or_else(|| {
                RuntimeError::InvalidInput(format!("conversation not found: {conversation_id}"))
            })?;

        let bundle = core.load_definition(AGENT_ID).await?;
        let source_input = conversation_input(&conversation);
        let identity = SnapshotIdentity {
            agent_id: AGENT_ID.to_string(),
            operation: None,
            user_id: Some(user_id.clone()),
            scope_type: ScopeType::Conversation,
            scope_id: Some(conversation_id.clone()),
            source_hash: core.compute_hash(AGENT_ID, None, &source_input)?,
            prompt_version: bundle.definition.prompt_version().to_string(),
        };

        if let Some(hit) = probe(core, &identity, &options).await? {
            return Ok(hit);
        }

        let generic_options = ExecuteOptions {
            user_id: Some(user_id),
            conversation_id: Some(conversation_id),
            ..delegated(&options)
        };
        let result = core
            .execute_generic(AGENT_ID, None, source_input.clone(), generic_options)
            .await?;

        let snapshot_id = persist(core, identity, source_input, &result.data, &options).await;
        Ok(ExecutionResult {
            snapshot_id,
            ..result
        })
    }
}

impl<C: ConversationSource + 'static> CapabilityHandler for TitleSummaryHandler<C> {
    fn agent_id(&self) -> &str {
        AGENT_ID
    }

    fn handle<'a>(
        &'a self,
        core: &'a dyn RuntimeCore,
        _operation: Option<&'a str>,
        input: Input,
        options: ExecuteOptions,
    ) -> BoxFuture<'a, Result<ExecutionResult, RuntimeError>> {
        Box::pin(self.run(core, input, options))
    }

    fn normalize_output(&self, _operation: Option<&str>, parsed: Value, raw: &str) -> Value {
        normalize_title_summary(&parsed, raw)
    }
}

/// Coerce any backend reply into `{title, summary}` within length limits.
pub fn normalize_title_summary(parsed: &Value, raw: &str) -> Value {
    let output = as_object(parsed);
    let (raw_title, raw_summary) = extract_from_raw(raw);

    let summary_fallback = clean(
        Some(raw_summary.as_deref().unwrap_or(raw)),
        FALLBACK_SUMMARY,
        SUMMARY_MAX_CHARS,
    );

    let title = pick(output.get("title"), raw_title.as_deref());
    let summary = pick(output.get("summary"), raw_summary.as_deref());

    json!({
        "title": clean(title, FALLBACK_TITLE, TITLE_MAX_CHARS),
        "summary": clean(summary, &summary_fallback, SUMMARY_MAX_CHARS),
    })
}

/// The parsed field when present (even if unusable), else the raw extraction.
fn pick<'a>(field: Option<&'a Value>, extracted: Option<&'a str>) -> Option<&'a str> {
    match field {
        Some(Value::Null) | None => extracted,
        Some(Value::String(s)) => Some(s),
        Some(_) => None,
    }
}

fn clean(value: Option<&str>, fallback: &str, max_chars: usize) -> String {
    let text = value.map(str::trim).unwrap_or_default();
    let candidate = if text.is_empty() { fallback } else { text };
    candidate
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(max_chars)
        .collect()
}

/// Best-effort `(title, summary)` from the unparsed reply.
fn extract_from_raw(raw: &str) -> (Option<String>, Option<String>) {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return (None, None);
    }

    let mut candidates = Vec::with_capacity(2);
    if let Some(body) = unwrap_fence(trimmed) {
        candidates.push(body.trim());
    }
    candidates.push(trimmed);

    for candidate in candidates {
        if let Ok(Value::Object(record)) = serde_json::from_str::<Value>(candidate) {
            let field = |key: &str| record.get(key).and_then(Value::as_str).map(str::to_string);
            return (field("title"), field("summary"));
        }
    }
    (None, Some(trimmed.to_string()))
}
