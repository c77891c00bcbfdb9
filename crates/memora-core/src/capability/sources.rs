//! Entity source ports used by routed capabilities.

use chrono::{DateTime, Utc};
use memora_types::entity::{ContactRecord, ConversationRecord};
use memora_types::error::RepositoryError;

/// Read access to a user's conversations.
pub trait ConversationSource: Send + Sync {
    /// The conversation `conversation_id`, if it exists and belongs to `user_id`.
    fn find_conversation(
        &self,
        user_id: &str,
        conversation_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<ConversationRecord>, RepositoryError>> + Send;

    /// Conversations with `contact_id` created at or after `since`, newest first.
    fn recent_for_contact(
        &self,
        user_id: &str,
        contact_id: &str,
        since: DateTime<Utc>,
        limit: usize,
    ) -> impl std::future::Future<Output = Result<Vec<ConversationRecord>, RepositoryError>> + Send;
}

/// Read access to a user's contacts.
pub trait ContactSource: Send + Sync {
    fn find_contact(
        &self,
        user_id: &str,
        contact_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<ContactRecord>, RepositoryError>> + Send;
}
