//! Application state wiring the runtime together.
//!
//! The executor is generic over storage, repository and hasher traits;
//! AppState pins it to the infra implementations.

use std::path::PathBuf;
use std::sync::Arc;

use memora_core::capability::archive_brief::ArchiveBriefHandler;
use memora_core::capability::title_summary::TitleSummaryHandler;
use memora_core::definition::registry::DefinitionRegistry;
use memora_core::llm::engine::GenerationEngine;
use memora_core::runtime::executor::RuntimeExecutor;
use memora_core::snapshot::service::SnapshotService;
use memora_infra::config::{definitions_dir, entities_dir, load_runtime_config};
use memora_infra::crypto::hash::Sha256ContentHasher;
use memora_infra::entity::JsonEntityStore;
use memora_infra::filesystem::definitions::LocalDefinitionStorage;
use memora_infra::filesystem::resolve_data_dir;
use memora_infra::llm::backend_or_unavailable;
use memora_infra::sqlite::pool::{DatabasePool, database_url};
use memora_infra::sqlite::snapshot::SqliteSnapshotRepository;
use memora_types::config::RuntimeConfig;

/// The executor pinned to the infra implementations.
pub type ConcreteExecutor =
    RuntimeExecutor<LocalDefinitionStorage, SqliteSnapshotRepository, Sha256ContentHasher>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub executor: Arc<ConcreteExecutor>,
    pub definitions: LocalDefinitionStorage,
    pub config: RuntimeConfig,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Load config, open the database and wire the executor.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        tokio::fs::create_dir_all(&data_dir).await?;

        let config = load_runtime_config(&data_dir).await;
        let db_pool = DatabasePool::new(&database_url(&data_dir)).await?;

        let definitions = LocalDefinitionStorage::new(definitions_dir(&config, &data_dir));
        let entities = JsonEntityStore::new(entities_dir(&data_dir));

        let backend = backend_or_unavailable(&config.llm, |key| std::env::var(key).ok());
        let engine = GenerationEngine::new(backend)
            .with_defaults(config.llm.temperature, config.llm.max_tokens);

        let executor = RuntimeExecutor::new(
            DefinitionRegistry::new(definitions.clone(), config.definition_cache_mode),
            SnapshotService::new(
                SqliteSnapshotRepository::new(db_pool),
                Sha256ContentHasher::new(),
            ),
            engine,
        )
        .with_default_ttl(config.default_ttl_seconds)
        .with_handler(TitleSummaryHandler::new(entities.clone()))
        .with_handler(ArchiveBriefHandler::new(entities.clone(), entities));

        tracing::debug!(
            data_dir = %data_dir.display(),
            definitions = %definitions.root().display(),
            cache_mode = %config.definition_cache_mode,
            "application state ready"
        );

        Ok(Self {
            executor: Arc::new(executor),
            definitions,
            config,
            data_dir,
        })
    }
}
