//! `archive_brief`: conversation archive extraction and contact briefs.
//!
//! Two operations share one agent id:
//! - `archive_extract` summarizes a conversation (conversation scope),
//! - `brief_generate` prepares a brief about a contact (contact scope).

use chrono::{Duration, Utc};
use futures_util::future::BoxFuture;
use memora_types::error::RuntimeError;
use memora_types::execution::{ExecuteOptions, ExecutionResult};
use memora_types::snapshot::{ScopeType, SnapshotIdentity};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::runtime::Input;
use crate::runtime::handler::{CapabilityHandler, RuntimeCore};

use super::sources::{ContactSource, ConversationSource};
use super::{
    conversation_input, delegated, id_from, persist, probe, require, source_failed, string_or,
};

pub const AGENT_ID: &str = "archive_brief";
pub const ARCHIVE_EXTRACT: &str = "archive_extract";
pub const BRIEF_GENERATE: &str = "brief_generate";

/// How far back a brief looks for interactions.
const BRIEF_LOOKBACK_DAYS: i64 = 30;
const BRIEF_MAX_INTERACTIONS: usize = 10;

pub struct ArchiveBriefHandler<C: ConversationSource, K: ContactSource> {
    conversations: C,
    contacts: K,
}

impl<C: ConversationSource, K: ContactSource> ArchiveBriefHandler<C, K> {
    pub fn new(conversations: C, contacts: K) -> Self {
        Self {
            conversations,
            contacts,
        }
    }

    async fn run(
        &self,
        core: &dyn RuntimeCore,
        operation: Option<&str>,
        input: Input,
        options: ExecuteOptions,
    ) -> Result<ExecutionResult, RuntimeError> {
        let user_id = require(id_from(&input, "userId", options.user_id.as_ref()), "userId")?;
        match operation {
            Some(ARCHIVE_EXTRACT) => self.extract_archive(core, user_id, input, options).await,
            Some(BRIEF_GENERATE) => self.generate_brief(core, user_id, input, options).await,
            other => Err(RuntimeError::AgentOperationInvalid {
                agent_id: AGENT_ID.to_string(),
                operation: other.map(str::to_string),
            }),
        }
    }

    async fn extract_archive(
        &self,
        core: &dyn RuntimeCore,
        user_id: String,
        input: Input,
        options: ExecuteOptions,
    ) -> Result<ExecutionResult, RuntimeError> {
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

        let mut source_input = conversation_input(&conversation);
        source_input.insert("operation".to_string(), json!(ARCHIVE_EXTRACT));

        let identity = self
            .identity(core, ARCHIVE_EXTRACT, &user_id, ScopeType::Conversation, &conversation_id, &source_input)
            .await?;
        if let Some(hit) = probe(core, &identity, &options).await? {
            return Ok(hit);
        }

        let generic_options = ExecuteOptions {
            user_id: Some(user_id),
            conversation_id: Some(conversation_id.clone()),
            ..delegated(&options)
        };
        let result = core
            .execute_generic(AGENT_ID, Some(ARCHIVE_EXTRACT), source_input.clone(), generic_options)
            .await?;

        let data = &result.data;
        let output = json!({
            "operation": ARCHIVE_EXTRACT,
            "id": string_or(data, "id", conversation_id),
            "status": string_or(data, "status", "completed"),
            "summary": string_or(data, "summary", ""),
            "payload": data.get("payload").filter(|p| p.is_object()).cloned().unwrap_or_else(|| json!({})),
            "sourceHash": identity.source_hash,
            "generatedAt": Utc::now().timestamp_millis(),
        });

        let snapshot_id = persist(core, identity, source_input, &output, &options).await;
        Ok(ExecutionResult {
            run_id: result.run_id,
            cached: false,
            snapshot_id,
            data: output,
        })
    }

    async fn generate_brief(
        &self,
        core: &dyn RuntimeCore,
        user_id: String,
        input: Input,
        options: ExecuteOptions,
    ) -> Result<ExecutionResult, RuntimeError> {
        let contact_id = require(id_from(&input, "contactId", None), "contactId")?;
        let contact = self
            .contacts
            .find_contact(&user_id, &contact_id)
            .await
            .map_err(source_failed)?
            .ok_or_else(|| RuntimeError::InvalidInput(format!("contact not found: {contact_id}")))?;

        let since = Utc::now() - Duration::days(BRIEF_LOOKBACK_DAYS);
        let recent = self
            .conversations
            .recent_for_contact(&user_id, &contact_id, since, BRIEF_MAX_INTERACTIONS)
            .await
            .map_err(source_failed)?;
        let interactions: Vec<Value> = recent
            .iter()
            .map(|c| {
                json!({
                    "date": c.created_at.to_rfc3339(),
                    "type": "conversation",
                    "summary": c.digest(),
                })
            })
            .collect();

        let mut source_input = Input::new();
        source_input.insert("operation".to_string(), json!(BRIEF_GENERATE));
        source_input.insert("contactId".to_string(), json!(contact_id));
        source_input.insert("name".to_string(), json!(contact.name));
        source_input.insert("company".to_string(), json!(contact.company));
        source_input.insert("position".to_string(), json!(contact.position));
        source_input.insert("tags".to_string(), json!(contact.tags));
        source_input.insert("recentInteractions".to_string(), Value::Array(interactions));

        let identity = self
            .identity(core, BRIEF_GENERATE, &user_id, ScopeType::Contact, &contact_id, &source_input)
            .await?;
        if let Some(hit) = probe(core, &identity, &options).await? {
            return Ok(hit);
        }

        let generic_options = ExecuteOptions {
            user_id: Some(user_id),
            ..delegated(&options)
        };
        let result = core
            .execute_generic(AGENT_ID, Some(BRIEF_GENERATE), source_input.clone(), generic_options)
            .await?;

        let data = &result.data;
        let output = json!({
            "operation": BRIEF_GENERATE,
            "id": string_or(data, "id", Uuid::now_v7().to_string()),
            "contact_id": string_or(data, "contact_id", contact_id),
            "content": string_or(data, "content", ""),
            "generated_at": string_or(data, "generated_at", Utc::now().to_rfc3339()),
            "source_hash": identity.source_hash,
        });

        let snapshot_id = persist(core, identity, source_input, &output, &options).await;
        Ok(ExecutionResult {
            run_id: result.run_id,
            cached: false,
            snapshot_id,
            data: output,
        })
    }

    async fn identity(
        &self,
        core: &dyn RuntimeCore,
        operation: &str,
        user_id: &str,
        scope_type: ScopeType,
        scope_id: &str,
        source_input: &Input,
    ) -> Result<SnapshotIdentity, RuntimeError> {
        let bundle = core.load_definition(AGENT_ID).await?;
        Ok(SnapshotIdentity {
            agent_id: AGENT_ID.to_string(),
            operation: Some(operation.to_string()),
            user_id: Some(user_id.to_string()),
            scope_type,
            scope_id: Some(scope_id.to_string()),
            source_hash: core.compute_hash(AGENT_ID, Some(operation), source_input)?,
            prompt_version: bundle.definition.prompt_version().to_string(),
        })
    }
}

impl<C, K> CapabilityHandler for ArchiveBriefHandler<C, K>
where
    C: ConversationSource + 'static,
    K: ContactSource + 'static,
{
    fn agent_id(&self) -> &str {
        AGENT_ID
    }

    fn handle<'a>(
        &'a self,
        core: &'a dyn RuntimeCore,
        operation: Option<&'a str>,
        input: Input,
        options: ExecuteOptions,
    ) -> BoxFuture<'a, Result<ExecutionResult, RuntimeError>> {
        Box::pin(self.run(core, operation, input, options))
    }
}
