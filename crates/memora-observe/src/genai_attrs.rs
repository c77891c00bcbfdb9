//! OpenTelemetry GenAI semantic convention attribute names.
//!
//! Usable as field names with `Span::record`. Generation spans opened in
//! `memora-core` spell the same names inline because `tracing` macros need
//! literal field names.

/// The name of the operation being performed (e.g., "invoke_agent").
pub const GEN_AI_OPERATION_NAME: &str = "gen_ai.operation.name";

/// The generation provider (e.g., "openai").
pub const GEN_AI_SYSTEM: &str = "gen_ai.system";

/// The model ID requested.
pub const GEN_AI_REQUEST_MODEL: &str = "gen_ai.request.model";

pub const GEN_AI_REQUEST_TEMPERATURE: &str = "gen_ai.request.temperature";

pub const GEN_AI_REQUEST_MAX_TOKENS: &str = "gen_ai.request.max_tokens";

/// The agent definition id.
pub const GEN_AI_AGENT_ID: &str = "gen_ai.agent.id";

// --- Memora-specific attributes ---

/// Whether the result came from the snapshot cache.
pub const MEMORA_CACHE_HIT: &str = "memora.cache.hit";

/// The snapshot id stored or served, when any.
pub const MEMORA_SNAPSHOT_ID: &str = "memora.snapshot.id";

// --- Operation name values ---

/// Agent invocation operation.
pub const OP_INVOKE_AGENT: &str = "invoke_agent";

/// Expired snapshot sweep.
pub const OP_SWEEP_SNAPSHOTS: &str = "sweep_snapshots";
