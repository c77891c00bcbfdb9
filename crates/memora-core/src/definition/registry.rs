//! DefinitionRegistry -- resolves agent ids into definition bundles.
//!
//! Loading reads `agent.json`, both templates, the optional defaults file and
//! the schemas through a [`DefinitionStorage`]. Resolved bundles are cached
//! per agent id; the configured [`ReloadStrategy`] decides when a cached
//! bundle is stale.

use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use memora_types::agent::{AgentDefinition, DefinitionBundle};
use memora_types::config::CacheMode;
use memora_types::error::DefinitionError;
use tracing::{debug, warn};

use super::freshness::{strategy_for, Fingerprint, ReloadStrategy};
use super::storage::{DefinitionStorage, MANIFEST_FILE};

#[derive(Clone)]
struct CachedBundle {
    bundle: Arc<DefinitionBundle>,
    fingerprint: Option<Fingerprint>,
}

/// Loads and caches agent definitions.
pub struct DefinitionRegistry<S: DefinitionStorage> {
    storage: S,
    strategy: Box<dyn ReloadStrategy>,
    cache: DashMap<String, CachedBundle>,
}

impl<S: DefinitionStorage> DefinitionRegistry<S> {
    /// Create a registry using the strategy for `mode`.
    pub fn new(storage: S, mode: CacheMode) -> Self {
        Self::with_strategy(storage, strategy_for(mode))
    }

    /// Create a registry with an explicit reload strategy.
    pub fn with_strategy(storage: S, strategy: Box<dyn ReloadStrategy>) -> Self {
        debug!(mode = %strategy.mode(), "agent definition registry initialized");
        Self {
            storage,
            strategy,
            cache: DashMap::new(),
        }
    }

    /// The configured cache mode.
    pub fn cache_mode(&self) -> CacheMode {
        self.strategy.mode()
    }

    /// Directory holding an agent's definition. Performs no I/O.
    pub fn definition_path(&self, agent_id: &str) -> PathBuf {
        self.storage.definition_path(agent_id)
    }

    /// Drop every cached bundle.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Resolve an agent id into a bundle, reusing the cached one when fresh.
    pub async fn load_definition(
        &self,
        agent_id: &str,
    ) -> Result<Arc<DefinitionBundle>, DefinitionError> {
        if !is_valid_agent_id(agent_id) {
            return Err(DefinitionError::not_found(
                agent_id,
                "agent id must be non-empty and contain only letters, digits, '-' or '_'",
            ));
        }

        let current = self.strategy.probe(&self.storage, agent_id);
        let cached = self.cache.get(agent_id).map(|entry| entry.value().clone());

        if let Some(cached) = cached {
            match current {
                None => {
                    debug!(agent_id, "using cached definition");
                    return Ok(cached.bundle);
                }
                Some(fp) if cached.fingerprint == Some(fp) => {
                    debug!(agent_id, "using cached definition");
                    return Ok(cached.bundle);
                }
                Some(_) => debug!(agent_id, "definition changed on disk, reloading"),
            }
        }

        let bundle = Arc::new(self.read_bundle(agent_id).await?);
        self.cache.insert(
            agent_id.to_string(),
            CachedBundle {
                bundle: Arc::clone(&bundle),
                fingerprint: current,
            },
        );
        Ok(bundle)
    }

    async fn read_bundle(&self, agent_id: &str) -> Result<DefinitionBundle, DefinitionError> {
        let definition = self.read_manifest(agent_id).await?;

        let system_template = self
            .read_template(agent_id, &definition.prompt.system_template, "system")
            .await?;
        let user_template = self
            .read_template(agent_id, &definition.prompt.user_template, "user")
            .await?;

        let defaults = match definition.prompt.defaults_file.as_deref() {
            Some(file) => self.read_defaults(agent_id, file).await,
            None => serde_json::Map::new(),
        };

        let output_schema = self.read_output_schema(agent_id, &definition).await?;
        let input_schema = match definition.input_schema_file() {
            Some(file) => self.read_input_schema(agent_id, file).await,
            None => None,
        };

        debug!(agent_id, version = %definition.version, "loaded agent definition");

        Ok(DefinitionBundle {
            definition,
            system_template,
            user_template,
            defaults,
            output_schema,
            input_schema,
        })
    }

    async fn read_manifest(&self, agent_id: &str) -> Result<AgentDefinition, DefinitionError> {
        let bytes = match self.storage.read(agent_id, MANIFEST_FILE).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                return Err(DefinitionError::not_found(
                    agent_id,
                    format!(
                        "agent definition not found: {}",
                        self.definition_path(agent_id).join(MANIFEST_FILE).display()
                    ),
                ));
            }
            Err(e) => {
                return Err(DefinitionError::not_found(
                    agent_id,
                    format!("failed to read {MANIFEST_FILE}: {e}"),
                ));
            }
        };

        let definition: AgentDefinition = serde_json::from_slice(&bytes).map_err(|e| {
            DefinitionError::not_found(agent_id, format!("failed to parse {MANIFEST_FILE}: {e}"))
        })?;

        if definition.id.trim().is_empty()
            || definition.version.trim().is_empty()
            || definition.prompt.system_template.trim().is_empty()
            || definition.prompt.user_template.trim().is_empty()
        {
            return Err(DefinitionError::not_found(
                agent_id,
                "invalid agent definition: missing required fields (id, version, prompt)",
            ));
        }

        if semver::Version::parse(&definition.version).is_err() {
            debug!(agent_id, version = %definition.version, "definition version is not semver");
        }

        Ok(definition)
    }

    async fn read_template(
        &self,
        agent_id: &str,
        file: &str,
        which: &str,
    ) -> Result<String, DefinitionError> {
        let bytes = match self.storage.read(agent_id, file).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                return Err(DefinitionError::template_missing(
                    agent_id,
                    format!("{which} template not found: {file}"),
                ));
            }
            Err(e) => {
                return Err(DefinitionError::template_missing(
                    agent_id,
                    format!("failed to read {which} template {file}: {e}"),
                ));
            }
        };

        let text = String::from_utf8(bytes).map_err(|e| {
            DefinitionError::template_missing(
                agent_id,
                format!("{which} template {file} is not UTF-8: {e}"),
            )
        })?;

        if text.trim().is_empty() {
            return Err(DefinitionError::template_missing(
                agent_id,
                format!("{which} template is empty: {file}"),
            ));
        }
        Ok(text)
    }

    async fn read_defaults(
        &self,
        agent_id: &str,
        file: &str,
    ) -> serde_json::Map<String, serde_json::Value> {
        let bytes = match self.storage.read(agent_id, file).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                warn!(agent_id, file, "defaults file not found, using empty defaults");
                return serde_json::Map::new();
            }
            Err(e) => {
                warn!(agent_id, file, error = %e, "failed to read defaults file");
                return serde_json::Map::new();
            }
        };

        match serde_json::from_slice::<serde_json::Value>(&bytes) {
            Ok(serde_json::Value::Object(map)) => map,
            Ok(_) => {
                warn!(agent_id, file, "defaults file is not a JSON object, ignoring");
                serde_json::Map::new()
            }
            Err(e) => {
                warn!(agent_id, file, error = %e, "failed to parse defaults file, ignoring");
                serde_json::Map::new()
            }
        }
    }

    async fn read_output_schema(
        &self,
        agent_id: &str,
        definition: &AgentDefinition,
    ) -> Result<serde_json::Value, DefinitionError> {
        let file = definition.output_schema_file().ok_or_else(|| {
            DefinitionError::schema_invalid(agent_id, "no output schema configured")
        })?;

        let bytes = match self.storage.read(agent_id, file).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                return Err(DefinitionError::schema_invalid(
                    agent_id,
                    format!("output schema not found: {file}"),
                ));
            }
            Err(e) => {
                return Err(DefinitionError::schema_invalid(
                    agent_id,
                    format!("failed to read output schema {file}: {e}"),
                ));
            }
        };

        let schema: serde_json::Value = serde_json::from_slice(&bytes).map_err(|e| {
            DefinitionError::schema_invalid(
                agent_id,
                format!("failed to parse output schema {file}: {e}"),
            )
        })?;

        if !schema.is_object() {
            return Err(DefinitionError::schema_invalid(
                agent_id,
                format!("output schema {file} must be a JSON object"),
            ));
        }
        Ok(schema)
    }

    async fn read_input_schema(&self, agent_id: &str, file: &str) -> Option<serde_json::Value> {
        match self.storage.read(agent_id, file).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<serde_json::Value>(&bytes) {
                Ok(schema) => Some(schema),
                Err(e) => {
                    warn!(agent_id, file, error = %e, "failed to parse input schema, ignoring");
                    None
                }
            },
            Ok(None) => {
                warn!(agent_id, file, "input schema not found, ignoring");
                None
            }
            Err(e) => {
                warn!(agent_id, file, error = %e, "failed to read input schema, ignoring");
                None
            }
        }
    }
}

/// Agent ids double as directory names, so only a safe character set is accepted.
pub fn is_valid_agent_id(agent_id: &str) -> bool {
    !agent_id.is_empty()
        && agent_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{demo_storage, MemoryDefinitionStorage};
    use memora_types::error::DefinitionErrorCode;

    #[tokio::test]
    async fn test_load_demo_definition() {
        let registry = DefinitionRegistry::new(demo_storage(), CacheMode::Watch);
        let bundle = registry.load_definition("demo").await.unwrap();

        assert_eq!(bundle.definition.id, "demo");
        assert!(!bundle.system_template.is_empty());
        assert!(!bundle.user_template.is_empty());
        assert!(bundle.output_schema.is_object());
        assert_eq!(bundle.defaults["contact"]["name"], "X");
    }

    #[tokio::test]
    async fn test_missing_manifest_is_not_found() {
        let registry = DefinitionRegistry::new(demo_storage(), CacheMode::Watch);
        let err = registry.load_definition("ghost").await.unwrap_err();
        assert_eq!(err.code, DefinitionErrorCode::NotFound);
        assert_eq!(err.agent_id, "ghost");
    }

    #[tokio::test]
    async fn test_unparsable_manifest_is_not_found() {
        let storage = demo_storage();
        storage.put("demo", "agent.json", "{ not json");
        let registry = DefinitionRegistry::new(storage, CacheMode::Watch);
        let err = registry.load_definition("demo").await.unwrap_err();
        assert_eq!(err.code, DefinitionErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_manifest_missing_version_is_not_found() {
        let storage = demo_storage();
        storage.put(
            "demo",
            "agent.json",
            r#"{"id":"demo","version":"","prompt":{"systemTemplate":"system.mustache","userTemplate":"user.mustache"},"validation":{"outputSchema":"output.schema.json"}}"#,
        );
        let registry = DefinitionRegistry::new(storage, CacheMode::Watch);
        let err = registry.load_definition("demo").await.unwrap_err();
        assert_eq!(err.code, DefinitionErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_missing_template_is_template_missing() {
        let storage = demo_storage();
        storage.remove("demo", "user.mustache");
        let registry = DefinitionRegistry::new(storage, CacheMode::Watch);
        let err = registry.load_definition("demo").await.unwrap_err();
        assert_eq!(err.code, DefinitionErrorCode::TemplateMissing);
    }

    #[tokio::test]
    async fn test_empty_template_is_template_missing() {
        let storage = demo_storage();
        storage.put("demo", "system.mustache", "   \n");
        let registry = DefinitionRegistry::new(storage, CacheMode::Watch);
        let err = registry.load_definition("demo").await.unwrap_err();
        assert_eq!(err.code, DefinitionErrorCode::TemplateMissing);
    }

    #[tokio::test]
    async fn test_missing_output_schema_is_schema_invalid() {
        let storage = demo_storage();
        storage.remove("demo", "output.schema.json");
        let registry = DefinitionRegistry::new(storage, CacheMode::Watch);
        let err = registry.load_definition("demo").await.unwrap_err();
        assert_eq!(err.code, DefinitionErrorCode::SchemaInvalid);
    }

    #[tokio::test]
    async fn test_unparsable_output_schema_is_schema_invalid() {
        let storage = demo_storage();
        storage.put("demo", "output.schema.json", "[1, 2");
        let registry = DefinitionRegistry::new(storage, CacheMode::Watch);
        let err = registry.load_definition("demo").await.unwrap_err();
        assert_eq!(err.code, DefinitionErrorCode::SchemaInvalid);
    }

    #[tokio::test]
    async fn test_bad_defaults_are_ignored() {
        let storage = demo_storage();
        storage.put("demo", "defaults.json", "not json at all");
        let registry = DefinitionRegistry::new(storage, CacheMode::Watch);
        let bundle = registry.load_definition("demo").await.unwrap();
        assert!(bundle.defaults.is_empty());
    }

    #[tokio::test]
    async fn test_watch_mode_reloads_after_change() {
        let storage = demo_storage();
        let registry = DefinitionRegistry::new(storage.clone(), CacheMode::Watch);

        let first = registry.load_definition("demo").await.unwrap();
        let again = registry.load_definition("demo").await.unwrap();
        assert!(Arc::ptr_eq(&first, &again), "unchanged definition should be cached");

        storage.put("demo", "system.mustache", "Updated system prompt.");
        let reloaded = registry.load_definition("demo").await.unwrap();
        assert_eq!(reloaded.system_template, "Updated system prompt.");
    }

    #[tokio::test]
    async fn test_memory_mode_trusts_first_load() {
        let storage = demo_storage();
        let registry = DefinitionRegistry::new(storage.clone(), CacheMode::Memory);

        let first = registry.load_definition("demo").await.unwrap();
        storage.put("demo", "system.mustache", "Updated system prompt.");
        let second = registry.load_definition("demo").await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(storage.fingerprint_calls(), 0);
    }

    #[tokio::test]
    async fn test_invalid_agent_id_rejected_without_io() {
        let storage = MemoryDefinitionStorage::new();
        let registry = DefinitionRegistry::new(storage.clone(), CacheMode::Watch);
        let err = registry.load_definition("../etc").await.unwrap_err();
        assert_eq!(err.code, DefinitionErrorCode::NotFound);
        assert_eq!(storage.read_calls(), 0);
    }

    #[test]
    fn test_definition_path_is_pure() {
        let registry = DefinitionRegistry::new(MemoryDefinitionStorage::new(), CacheMode::Watch);
        assert_eq!(
            registry.definition_path("demo"),
            PathBuf::from("/definitions/demo")
        );
    }
}
