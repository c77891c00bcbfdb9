//! In-memory fakes shared by the unit tests.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use memora_types::agent::{AgentDefinition, DefinitionBundle};
use memora_types::config::CacheMode;
use memora_types::entity::{ContactRecord, ConversationRecord};
use memora_types::error::RepositoryError;
use memora_types::llm::{GenerationRequest, LlmError, StreamEvent};
use memora_types::snapshot::{NewSnapshot, ScopeType, Snapshot, SnapshotIdentity};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::capability::sources::{ContactSource, ConversationSource};
use crate::definition::registry::DefinitionRegistry;
use crate::definition::storage::{DefinitionStorage, FingerprintSource};
use crate::llm::backend::{EventStream, GenerationBackend};
use crate::llm::box_backend::BoxGenerationBackend;
use crate::llm::engine::GenerationEngine;
use crate::runtime::executor::RuntimeExecutor;
use crate::snapshot::hash::ContentHasher;
use crate::snapshot::repository::SnapshotRepository;
use crate::snapshot::service::SnapshotService;

// ---------------------------------------------------------------------------
// Definition storage
// ---------------------------------------------------------------------------

#[derive(Default)]
struct StorageState {
    files: Mutex<HashMap<(String, String), Vec<u8>>>,
    modified: Mutex<HashMap<String, SystemTime>>,
    clock: AtomicU64,
    reads: AtomicUsize,
    fingerprints: AtomicUsize,
}

/// Definition files held in memory. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryDefinitionStorage {
    inner: Arc<StorageState>,
}

impl MemoryDefinitionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn touch(&self, agent_id: &str) {
        let tick = self.inner.clock.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner
            .modified
            .lock()
            .unwrap()
            .insert(agent_id.to_string(), UNIX_EPOCH + Duration::from_secs(tick));
    }

    pub fn put(&self, agent_id: &str, path: &str, content: &str) {
        self.inner.files.lock().unwrap().insert(
            (agent_id.to_string(), path.to_string()),
            content.as_bytes().to_vec(),
        );
        self.touch(agent_id);
    }

    pub fn remove(&self, agent_id: &str, path: &str) {
        self.inner
            .files
            .lock()
            .unwrap()
            .remove(&(agent_id.to_string(), path.to_string()));
        self.touch(agent_id);
    }

    pub fn read_calls(&self) -> usize {
        self.inner.reads.load(Ordering::SeqCst)
    }

    pub fn fingerprint_calls(&self) -> usize {
        self.inner.fingerprints.load(Ordering::SeqCst)
    }
}

impl FingerprintSource for MemoryDefinitionStorage {
    fn last_modified(&self, agent_id: &str) -> Option<SystemTime> {
        self.inner.fingerprints.fetch_add(1, Ordering::SeqCst);
        self.inner.modified.lock().unwrap().get(agent_id).copied()
    }
}

impl DefinitionStorage for MemoryDefinitionStorage {
    fn definition_path(&self, agent_id: &str) -> PathBuf {
        PathBuf::from(format!("/definitions/{agent_id}"))
    }

    fn read(
        &self,
        agent_id: &str,
        relative_path: &str,
    ) -> impl std::future::Future<Output = Result<Option<Vec<u8>>, std::io::Error>> + Send {
        self.inner.reads.fetch_add(1, Ordering::SeqCst);
        let found = self
            .inner
            .files
            .lock()
            .unwrap()
            .get(&(agent_id.to_string(), relative_path.to_string()))
            .cloned();
        std::future::ready(Ok(found))
    }
}

pub const DEMO_SCHEMA: &str = r#"{
  "type": "object",
  "properties": {
    "reply": { "type": "string", "minLength": 1 },
    "topics": { "type": "array", "items": { "type": "string" }, "maxItems": 5 }
  },
  "required": ["reply"]
}"#;

/// Storage holding `demo`, `title_summary` and `archive_brief`.
pub fn demo_storage() -> MemoryDefinitionStorage {
    let storage = MemoryDefinitionStorage::new();

    storage.put(
        "demo",
        "agent.json",
        r#"{
            "id": "demo",
            "version": "1.0.0",
            "prompt": {
                "systemTemplate": "system.mustache",
                "userTemplate": "user.mustache",
                "defaultsFile": "defaults.json"
            },
            "validation": { "outputSchema": "output.schema.json" },
            "cache": { "ttl": 3600 }
        }"#,
    );
    storage.put(
        "demo",
        "system.mustache",
        "You are helping {{contact.name}}. Reply with JSON only.",
    );
    storage.put("demo", "user.mustache", "{{message}}");
    storage.put("demo", "defaults.json", r#"{"contact": {"name": "X"}}"#);
    storage.put("demo", "output.schema.json", DEMO_SCHEMA);

    storage.put(
        "title_summary",
        "agent.json",
        r#"{
            "id": "title_summary",
            "version": "1.0.0",
            "prompt": { "systemTemplate": "system.mustache", "userTemplate": "user.mustache" },
            "validation": { "outputSchemaFile": "output.schema.json" }
        }"#,
    );
    storage.put("title_summary", "system.mustache", "Title and summarize the conversation.");
    storage.put(
        "title_summary",
        "user.mustache",
        "{{content}}\n{{#messages}}{{role}}: {{content}}\n{{/messages}}",
    );
    storage.put(
        "title_summary",
        "output.schema.json",
        r#"{"type": "object", "properties": {
            "title": {"type": "string", "maxLength": 50},
            "summary": {"type": "string", "maxLength": 300}
        }}"#,
    );

    storage.put(
        "archive_brief",
        "agent.json",
        r#"{
            "id": "archive_brief",
            "version": "2.0.0",
            "prompt": { "systemTemplate": "system.mustache", "userTemplate": "user.mustache" },
            "validation": { "outputSchema": "output.schema.json" }
        }"#,
    );
    storage.put("archive_brief", "system.mustache", "Operation: {{operation}}");
    storage.put("archive_brief", "user.mustache", "{{content}}{{name}}");
    storage.put("archive_brief", "output.schema.json", r#"{"type": "object"}"#);

    storage
}

fn test_definition() -> AgentDefinition {
    serde_json::from_value(json!({
        "id": "test",
        "version": "1.0.0",
        "prompt": { "systemTemplate": "system.mustache", "userTemplate": "user.mustache" }
    }))
    .unwrap()
}

/// A bundle with the given templates and defaults and a permissive schema.
pub fn bundle_with(system: &str, user: &str, defaults: Value) -> DefinitionBundle {
    DefinitionBundle {
        definition: test_definition(),
        system_template: system.to_string(),
        user_template: user.to_string(),
        defaults: defaults.as_object().cloned().unwrap_or_default(),
        output_schema: json!({"type": "object"}),
        input_schema: None,
    }
}

pub fn bundle_with_schema(schema: Value) -> DefinitionBundle {
    DefinitionBundle {
        output_schema: schema,
        ..bundle_with("s", "u", json!({}))
    }
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// Returns its input unchanged, so equal hashes mean equal documents.
pub struct EchoHasher;

impl ContentHasher for EchoHasher {
    fn compute_hash(&self, content: &str) -> String {
        content.to_string()
    }
}

#[derive(Default)]
struct RepoState {
    rows: Mutex<Vec<Snapshot>>,
    finds: AtomicUsize,
    upserts: AtomicUsize,
    fail_writes: AtomicBool,
}

/// Snapshot rows held in memory. Clones share state.
#[derive(Clone, Default)]
pub struct MemorySnapshotRepository {
    inner: Arc<RepoState>,
}

impl MemorySnapshotRepository {
    pub fn len(&self) -> usize {
        self.inner.rows.lock().unwrap().len()
    }

    pub fn find_calls(&self) -> usize {
        self.inner.finds.load(Ordering::SeqCst)
    }

    pub fn upsert_calls(&self) -> usize {
        self.inner.upserts.load(Ordering::SeqCst)
    }

    pub fn fail_writes(&self, fail: bool) {
        self.inner.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_expiry(&self, id: &Uuid, expires_at_ms: Option<i64>) {
        for row in self.inner.rows.lock().unwrap().iter_mut() {
            if row.id == *id {
                row.expires_at_ms = expires_at_ms;
            }
        }
    }

    pub fn rows(&self) -> Vec<Snapshot> {
        self.inner.rows.lock().unwrap().clone()
    }
}

impl SnapshotRepository for MemorySnapshotRepository {
    fn find_by_identity(
        &self,
        identity: &SnapshotIdentity,
    ) -> impl std::future::Future<Output = Result<Option<Snapshot>, RepositoryError>> + Send {
        self.inner.finds.fetch_add(1, Ordering::SeqCst);
        let found = self
            .inner
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|row| row.identity == *identity)
            .cloned();
        std::future::ready(Ok(found))
    }

    fn upsert(
        &self,
        snapshot: &NewSnapshot,
        expires_at_ms: Option<i64>,
    ) -> impl std::future::Future<Output = Result<Snapshot, RepositoryError>> + Send {
        self.inner.upserts.fetch_add(1, Ordering::SeqCst);
        let result = if self.inner.fail_writes.load(Ordering::SeqCst) {
            Err(RepositoryError::Query("disk full".to_string()))
        } else {
            let now = Utc::now();
            let mut rows = self.inner.rows.lock().unwrap();
            match rows.iter_mut().find(|row| row.identity == snapshot.identity) {
                Some(row) => {
                    row.model = snapshot.model.clone();
                    row.input = snapshot.input.clone();
                    row.output = snapshot.output.clone();
                    row.expires_at_ms = expires_at_ms;
                    row.updated_at = now;
                    Ok(row.clone())
                }
                None => {
                    let row = Snapshot {
                        id: Uuid::now_v7(),
                        identity: snapshot.identity.clone(),
                        model: snapshot.model.clone(),
                        input: snapshot.input.clone(),
                        output: snapshot.output.clone(),
                        expires_at_ms,
                        created_at: now,
                        updated_at: now,
                    };
                    rows.push(row.clone());
                    Ok(row)
                }
            }
        };
        std::future::ready(result)
    }

    fn delete(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send {
        let mut rows = self.inner.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|row| row.id != *id);
        std::future::ready(Ok(rows.len() < before))
    }

    fn delete_expired_before(
        &self,
        now_ms: i64,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send {
        let mut rows = self.inner.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|row| !row.expires_at_ms.is_some_and(|at| at < now_ms));
        std::future::ready(Ok((before - rows.len()) as u64))
    }
}

/// A user-scoped identity for `agent_id`.
pub fn identity(agent_id: &str) -> SnapshotIdentity {
    SnapshotIdentity {
        agent_id: agent_id.to_string(),
        operation: None,
        user_id: Some("u1".to_string()),
        scope_type: ScopeType::User,
        scope_id: Some("u1".to_string()),
        source_hash: "hash".to_string(),
        prompt_version: "1.0.0".to_string(),
    }
}

pub fn new_snapshot(agent_id: &str, output: Value) -> NewSnapshot {
    NewSnapshot {
        identity: identity(agent_id),
        model: None,
        input: json!({}),
        output,
    }
}

// ---------------------------------------------------------------------------
// Generation backend
// ---------------------------------------------------------------------------

struct BackendState {
    fragments: Mutex<Vec<String>>,
    error: Mutex<Option<LlmError>>,
    calls: AtomicUsize,
    last: Mutex<Option<GenerationRequest>>,
}

/// Streams a fixed reply, fragment by fragment. Clones share state.
#[derive(Clone)]
pub struct ScriptedBackend {
    inner: Arc<BackendState>,
}

impl ScriptedBackend {
    pub fn new(fragments: Vec<&str>) -> Self {
        Self {
            inner: Arc::new(BackendState {
                fragments: Mutex::new(fragments.into_iter().map(str::to_string).collect()),
                error: Mutex::new(None),
                calls: AtomicUsize::new(0),
                last: Mutex::new(None),
            }),
        }
    }

    /// Emits one fragment, then fails with `error`.
    pub fn failing(error: LlmError) -> Self {
        let backend = Self::new(vec!["partial"]);
        *backend.inner.error.lock().unwrap() = Some(error);
        backend
    }

    pub fn set_reply(&self, fragments: Vec<&str>) {
        *self.inner.fragments.lock().unwrap() =
            fragments.into_iter().map(str::to_string).collect();
    }

    pub fn calls(&self) -> usize {
        self.inner.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<GenerationRequest> {
        self.inner.last.lock().unwrap().clone()
    }
}

impl GenerationBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    fn default_model(&self) -> &str {
        "scripted-model"
    }

    fn stream(&self, request: GenerationRequest) -> EventStream {
        self.inner.calls.fetch_add(1, Ordering::SeqCst);
        *self.inner.last.lock().unwrap() = Some(request);
        let fragments = self.inner.fragments.lock().unwrap().clone();
        let error = self.inner.error.lock().unwrap().clone();

        Box::pin(async_stream::stream! {
            yield Ok(StreamEvent::Connected);
            for text in fragments {
                yield Ok(StreamEvent::TextDelta { text });
            }
            match error {
                Some(e) => yield Err(e),
                None => yield Ok(StreamEvent::Done),
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Entity sources
// ---------------------------------------------------------------------------

#[derive(Default)]
struct EntityState {
    conversations: Mutex<Vec<ConversationRecord>>,
    contacts: Mutex<Vec<ContactRecord>>,
}

/// Conversations and contacts held in memory. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryEntities {
    inner: Arc<EntityState>,
}

impl MemoryEntities {
    pub fn add_conversation(&self, id: &str, user_id: &str, content: &str) -> ConversationRecord {
        let record: ConversationRecord = serde_json::from_value(json!({
            "id": id,
            "userId": user_id,
            "content": content,
            "messages": [{"role": "user", "content": content}],
            "createdAt": Utc::now(),
        }))
        .unwrap();
        self.inner.conversations.lock().unwrap().push(record.clone());
        record
    }

    pub fn add_contact_conversation(
        &self,
        id: &str,
        user_id: &str,
        contact_id: &str,
        created_at: DateTime<Utc>,
    ) {
        let mut record = self.add_conversation(id, user_id, "met for coffee");
        record.contact_id = Some(contact_id.to_string());
        record.created_at = created_at;
        let mut conversations = self.inner.conversations.lock().unwrap();
        conversations.retain(|c| c.id != id);
        conversations.push(record);
    }

    pub fn add_contact(&self, id: &str, user_id: &str, name: &str) {
        self.inner.contacts.lock().unwrap().push(ContactRecord {
            id: id.to_string(),
            user_id: user_id.to_string(),
            name: name.to_string(),
            company: Some("Acme".to_string()),
            position: None,
            tags: vec!["friend".to_string()],
        });
    }
}

impl ConversationSource for MemoryEntities {
    fn find_conversation(
        &self,
        user_id: &str,
        conversation_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<ConversationRecord>, RepositoryError>> + Send
    {
        let found = self
            .inner
            .conversations
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == conversation_id && c.user_id == user_id)
            .cloned();
        std::future::ready(Ok(found))
    }

    fn recent_for_contact(
        &self,
        user_id: &str,
        contact_id: &str,
        since: DateTime<Utc>,
        limit: usize,
    ) -> impl std::future::Future<Output = Result<Vec<ConversationRecord>, RepositoryError>> + Send
    {
        let mut found: Vec<ConversationRecord> = self
            .inner
            .conversations
            .lock()
            .unwrap()
            .iter()
            .filter(|c| {
                c.user_id == user_id
                    && c.contact_id.as_deref() == Some(contact_id)
                    && c.created_at >= since
            })
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        found.truncate(limit);
        std::future::ready(Ok(found))
    }
}

impl ContactSource for MemoryEntities {
    fn find_contact(
        &self,
        user_id: &str,
        contact_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<ContactRecord>, RepositoryError>> + Send
    {
        let found = self
            .inner
            .contacts
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == contact_id && c.user_id == user_id)
            .cloned();
        std::future::ready(Ok(found))
    }
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

pub type TestExecutor = RuntimeExecutor<MemoryDefinitionStorage, MemorySnapshotRepository, EchoHasher>;

/// An executor over [`demo_storage`] sharing `backend` and `repo` with the test.
pub fn test_executor(backend: &ScriptedBackend, repo: &MemorySnapshotRepository) -> TestExecutor {
    RuntimeExecutor::new(
        DefinitionRegistry::new(demo_storage(), CacheMode::Watch),
        SnapshotService::new(repo.clone(), EchoHasher),
        GenerationEngine::new(BoxGenerationBackend::new(backend.clone())),
    )
}
