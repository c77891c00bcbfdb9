//! JSON-file entity sources.
//!
//! Records live at `{root}/conversations/{id}.json` and
//! `{root}/contacts/{id}.json`. A record owned by another user reads as
//! absent.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use memora_core::capability::sources::{ContactSource, ConversationSource};
use memora_types::entity::{ContactRecord, ConversationRecord};
use memora_types::error::RepositoryError;
use serde::de::DeserializeOwned;
use tracing::warn;

/// Conversation and contact documents under one directory.
#[derive(Debug, Clone)]
pub struct JsonEntityStore {
    root: PathBuf,
}

impl JsonEntityStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn conversations_dir(&self) -> PathBuf {
        self.root.join("conversations")
    }

    fn contacts_dir(&self) -> PathBuf {
        self.root.join("contacts")
    }
}

fn valid_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

async fn read_record<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, RepositoryError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(RepositoryError::Query(format!("{}: {e}", path.display()))),
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| RepositoryError::Query(format!("invalid record {}: {e}", path.display())))
}

impl ConversationSource for JsonEntityStore {
    async fn find_conversation(
        &self,
        user_id: &str,
        conversation_id: &str,
    ) -> Result<Option<ConversationRecord>, RepositoryError> {
        if !valid_id(conversation_id) {
            return Ok(None);
        }
        let path = self.conversations_dir().join(format!("{conversation_id}.json"));
        let record: Option<ConversationRecord> = read_record(&path).await?;
        Ok(record.filter(|c| c.user_id == user_id))
    }

    async fn recent_for_contact(
        &self,
        user_id: &str,
        contact_id: &str,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<ConversationRecord>, RepositoryError> {
        let dir = self.conversations_dir();
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(RepositoryError::Query(format!("{}: {e}", dir.display()))),
        };

        let mut found = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let record: ConversationRecord = match read_record(&path).await {
                Ok(Some(record)) => record,
                Ok(None) => continue,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable conversation record");
                    continue;
                }
            };
            if record.user_id == user_id
                && record.contact_id.as_deref() == Some(contact_id)
                && record.created_at >= since
            {
                found.push(record);
            }
        }

        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        found.truncate(limit);
        Ok(found)
    }
}

impl ContactSource for JsonEntityStore {
    async fn find_contact(
        &self,
        user_id: &str,
        contact_id: &str,
    ) -> Result<Option<ContactRecord>, RepositoryError> {
        if !valid_id(contact_id) {
            return Ok(None);
        }
        let path = self.contacts_dir().join(format!("{contact_id}.json"));
        let record: Option<ContactRecord> = read_record(&path).await?;
        Ok(record.filter(|c| c.user_id == user_id))
    }
}
