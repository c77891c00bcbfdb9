//! Runtime executor.
//!
//! `execute` either hands the call to a routed [`CapabilityHandler`] or runs
//! the generic pipeline: load definition, resolve scope and source hash,
//! probe the snapshot cache, render, generate, parse, validate, persist.
//! Nothing is retried.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde_json::Value;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use memora_types::agent::DefinitionBundle;
use memora_types::config::{DEFAULT_TTL_SECONDS, MAX_TTL_SECONDS};
use memora_types::error::RuntimeError;
use memora_types::execution::{ExecuteOptions, ExecutionResult};
use memora_types::snapshot::{
    FindOptions, FindSnapshotResult, NewSnapshot, Snapshot, SnapshotIdentity,
};

use crate::definition::registry::DefinitionRegistry;
use crate::definition::storage::DefinitionStorage;
use crate::llm::backend::collect_text;
use crate::llm::engine::GenerationEngine;
use crate::snapshot::hash::ContentHasher;
use crate::snapshot::repository::SnapshotRepository;
use crate::snapshot::service::SnapshotService;
use crate::template::renderer::PromptRenderer;
use crate::validation::validator::OutputValidator;

use super::Input;
use super::context::build_context;
use super::handler::{CapabilityHandler, RuntimeCore};
use super::memory::build_memory;
use super::output::parse_output;
use super::scope::resolve_scope;
use super::tools::filter_tools;

pub struct RuntimeExecutor<S, R, H>
where
    S: DefinitionStorage,
    R: SnapshotRepository,
    H: ContentHasher,
{
    registry: DefinitionRegistry<S>,
    renderer: PromptRenderer,
    validator: OutputValidator,
    snapshots: SnapshotService<R, H>,
    engine: GenerationEngine,
    default_ttl_seconds: u64,
    tool_catalog: Vec<String>,
    handlers: HashMap<String, Arc<dyn CapabilityHandler>>,
}

impl<S, R, H> RuntimeExecutor<S, R, H>
where
    S: DefinitionStorage,
    R: SnapshotRepository,
    H: ContentHasher,
{
    pub fn new(
        registry: DefinitionRegistry<S>,
        snapshots: SnapshotService<R, H>,
        engine: GenerationEngine,
    ) -> Self {
        Self {
            registry,
            renderer: PromptRenderer::new(),
            validator: OutputValidator::new(),
            snapshots,
            engine,
            default_ttl_seconds: DEFAULT_TTL_SECONDS,
            tool_catalog: Vec::new(),
            handlers: HashMap::new(),
        }
    }

    /// TTL used when a definition does not configure one.
    pub fn with_default_ttl(mut self, seconds: u64) -> Self {
        self.default_ttl_seconds = seconds;
        self
    }

    /// Tool names available to agents, filtered per definition.
    pub fn with_tool_catalog(mut self, tools: Vec<String>) -> Self {
        self.tool_catalog = tools;
        self
    }

    /// Route calls for `handler.agent_id()` to `handler`.
    pub fn with_handler(mut self, handler: impl CapabilityHandler + 'static) -> Self {
        self.handlers
            .insert(handler.agent_id().to_string(), Arc::new(handler));
        self
    }

    pub fn registry(&self) -> &DefinitionRegistry<S> {
        &self.registry
    }

    pub fn snapshots(&self) -> &SnapshotService<R, H> {
        &self.snapshots
    }

    /// Run `agent_id`.
    pub async fn execute(
        &self,
        agent_id: &str,
        operation: Option<&str>,
        input: Input,
        options: ExecuteOptions,
    ) -> Result<ExecutionResult, RuntimeError> {
        if !options.skip_routing {
            if let Some(handler) = self.handlers.get(agent_id) {
                debug!(agent_id, "routing to capability handler");
                return handler.handle(self, operation, input, options).await;
            }
        }
        self.run_generic(agent_id, operation, input, options).await
    }

    async fn run_generic(
        &self,
        agent_id: &str,
        operation: Option<&str>,
        input: Input,
        options: ExecuteOptions,
    ) -> Result<ExecutionResult, RuntimeError> {
        let run_id = Uuid::now_v7();
        let span = info_span!("agent.execute", agent_id, %run_id, operation = ?operation);
        self.pipeline(run_id, agent_id, operation, input, options)
            .instrument(span)
            .await
    }

    async fn pipeline(
        &self,
        run_id: Uuid,
        agent_id: &str,
        operation: Option<&str>,
        input: Input,
        options: ExecuteOptions,
    ) -> Result<ExecutionResult, RuntimeError> {
        let bundle = self.load_bundle(agent_id).await?;
        let definition = &bundle.definition;

        let source_hash = self.snapshots.compute_hash_with_fields(
            agent_id,
            operation,
            &input,
            definition.source_hash_fields(),
        )?;
        let (scope_type, scope_id) = resolve_scope(&input, &options);
        let identity = SnapshotIdentity {
            agent_id: agent_id.to_string(),
            operation: operation.map(str::to_string),
            user_id: options.user_id.clone(),
            scope_type,
            scope_id,
            source_hash,
            prompt_version: definition.prompt_version().to_string(),
        };

        if options.use_cache && !options.force_refresh {
            let found = self
                .snapshots
                .find_snapshot(&identity, FindOptions::default())
                .await?;
            if let (true, Some(snapshot)) = (found.cached, found.snapshot) {
                debug!(agent_id, snapshot_id = %snapshot.id, "snapshot cache hit");
                return Ok(ExecutionResult {
                    run_id,
                    cached: true,
                    snapshot_id: Some(snapshot.id),
                    data: snapshot.output,
                });
            }
            debug!(agent_id, source_hash = %identity.source_hash, "snapshot cache miss");
        }

        let context = build_context(&input, operation, &options);
        let rendered = self
            .renderer
            .render(&bundle, &self.render_context(&bundle, &context));
        for warning in &rendered.warnings {
            warn!(agent_id, path = %warning.path, "{}", warning.message);
        }

        let request =
            self.engine
                .build_request(&rendered.system, &rendered.user, options.llm.as_ref());
        let model = request.model.clone();
        let raw = collect_text(self.engine.stream(agent_id, request)).await?;

        let mut output = parse_output(&raw);
        if let Some(handler) = self.handlers.get(agent_id) {
            output = handler.normalize_output(operation, output, &raw);
        }
        self.validator.validate_or_throw(&bundle, &output)?;

        let snapshot_id = if options.use_cache {
            let ttl = definition.cache_ttl().unwrap_or(self.default_ttl_seconds);
            let data = NewSnapshot {
                identity,
                model,
                input: Value::Object(context),
                output: output.clone(),
            };
            self.persist(data, ttl).await
        } else {
            None
        };

        info!(agent_id, cached = false, snapshot_id = ?snapshot_id, "agent execution complete");
        Ok(ExecutionResult {
            run_id,
            cached: false,
            snapshot_id,
            data: output,
        })
    }

    async fn load_bundle(&self, agent_id: &str) -> Result<Arc<DefinitionBundle>, RuntimeError> {
        self.registry
            .load_definition(agent_id)
            .await
            .map_err(|source| RuntimeError::AgentNotFound {
                agent_id: agent_id.to_string(),
                source,
            })
    }

    /// Context plus memory and permitted tools, as seen by the templates.
    fn render_context(&self, bundle: &DefinitionBundle, context: &Input) -> Input {
        let mut render_context = context.clone();
        if let Some(memory) = build_memory(&bundle.definition, context) {
            render_context.insert("memory".to_string(), Value::Object(memory));
        }
        if !self.tool_catalog.is_empty() {
            let tools = filter_tools(&bundle.definition, &self.tool_catalog);
            render_context.insert(
                "tools".to_string(),
                Value::Array(tools.into_iter().map(Value::String).collect()),
            );
        }
        render_context
    }

    /// Store a validated result. Failures are logged, never propagated.
    async fn persist(&self, data: NewSnapshot, ttl_seconds: u64) -> Option<Uuid> {
        let agent_id = data.identity.agent_id.clone();
        let ttl = ttl_seconds.min(MAX_TTL_SECONDS) as i64;
        match self.snapshots.create_snapshot(data, Some(ttl)).await {
            Ok(snapshot) => Some(snapshot.id),
            Err(e) => {
                warn!(agent_id = %agent_id, error = %e, "failed to save snapshot");
                None
            }
        }
    }
}

impl<S, R, H> RuntimeCore for RuntimeExecutor<S, R, H>
where
    S: DefinitionStorage,
    R: SnapshotRepository,
    H: ContentHasher,
{
    fn load_definition<'a>(
        &'a self,
        agent_id: &'a str,
    ) -> BoxFuture<'a, Result<Arc<DefinitionBundle>, RuntimeError>> {
        Box::pin(self.load_bundle(agent_id))
    }

    fn effective_model(&self, options: &ExecuteOptions) -> String {
        self.engine.resolve_model(options.llm.as_ref())
    }

    fn compute_hash(
        &self,
        agent_id: &str,
        operation: Option<&str>,
        input: &Input,
    ) -> Result<String, RuntimeError> {
        Ok(self.snapshots.compute_hash(agent_id, operation, input)?)
    }

    fn find_snapshot<'a>(
        &'a self,
        identity: &'a SnapshotIdentity,
        options: FindOptions,
    ) -> BoxFuture<'a, Result<FindSnapshotResult, RuntimeError>> {
        Box::pin(async move { Ok(self.snapshots.find_snapshot(identity, options).await?) })
    }

    fn create_snapshot<'a>(
        &'a self,
        data: NewSnapshot,
        ttl_seconds: Option<i64>,
    ) -> BoxFuture<'a, Result<Snapshot, RuntimeError>> {
        Box::pin(async move { Ok(self.snapshots.create_snapshot(data, ttl_seconds).await?) })
    }

    fn execute_generic<'a>(
        &'a self,
        agent_id: &'a str,
        operation: Option<&'a str>,
        input: Input,
        options: ExecuteOptions,
    ) -> BoxFuture<'a, Result<ExecutionResult, RuntimeError>> {
        Box::pin(self.run_generic(agent_id, operation, input, options))
    }
}
