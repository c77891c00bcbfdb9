use std::fmt;

use thiserror::Error;

use crate::llm::LlmError;
use crate::validation::ValidationIssue;

/// Stable codes for definition loading failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionErrorCode {
    /// Manifest missing, unparsable, or lacking id/version/prompt.
    NotFound,
    /// A referenced template file is absent or empty.
    TemplateMissing,
    /// The output schema is absent or unparsable.
    SchemaInvalid,
}

impl DefinitionErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DefinitionErrorCode::NotFound => "definition_not_found",
            DefinitionErrorCode::TemplateMissing => "definition_template_missing",
            DefinitionErrorCode::SchemaInvalid => "definition_schema_invalid",
        }
    }
}

impl fmt::Display for DefinitionErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error raised by the definition registry.
#[derive(Debug, Clone, Error)]
#[error("{code} ({agent_id}): {message}")]
pub struct DefinitionError {
    pub code: DefinitionErrorCode,
    pub agent_id: String,
    pub message: String,
}

impl DefinitionError {
    pub fn new(
        code: DefinitionErrorCode,
        agent_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code,
            agent_id: agent_id.into(),
            message: message.into(),
        }
    }

    pub fn not_found(agent_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DefinitionErrorCode::NotFound, agent_id, message)
    }

    pub fn template_missing(agent_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DefinitionErrorCode::TemplateMissing, agent_id, message)
    }

    pub fn schema_invalid(agent_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DefinitionErrorCode::SchemaInvalid, agent_id, message)
    }
}

/// A schema node that cannot be interpreted.
///
/// Distinct from ordinary validation mismatches, which are reported as
/// [`ValidationIssue`]s and never raised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("malformed schema at '{path}': {reason}")]
    Malformed { path: String, reason: String },
}

/// Errors from repository operations (used by trait definitions in memora-core).
#[derive(Debug, Clone, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Snapshot cache invariant violations and storage failures.
#[derive(Debug, Clone, Error)]
pub enum SnapshotError {
    #[error("snapshot_hash_build_failed: {0}")]
    HashBuildFailed(String),

    #[error("snapshot_expiry_invalid: {0}")]
    ExpiryInvalid(String),

    #[error("snapshot storage error: {0}")]
    Repository(#[from] RepositoryError),
}

impl SnapshotError {
    pub fn code(&self) -> &'static str {
        match self {
            SnapshotError::HashBuildFailed(_) => "snapshot_hash_build_failed",
            SnapshotError::ExpiryInvalid(_) => "snapshot_expiry_invalid",
            SnapshotError::Repository(_) => "snapshot_storage_failed",
        }
    }
}

/// Errors surfaced by the runtime executor.
///
/// Every variant maps to a stable machine-readable [`code`](Self::code).
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("agent definition not found: {agent_id}")]
    AgentNotFound {
        agent_id: String,
        #[source]
        source: DefinitionError,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unsupported operation {operation:?} for agent {agent_id}")]
    AgentOperationInvalid {
        agent_id: String,
        operation: Option<String>,
    },

    #[error("output validation failed for {agent_id}: {}", join_issues(.issues))]
    OutputValidationFailed {
        agent_id: String,
        issues: Vec<ValidationIssue>,
    },

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("LLM call failed: {0}")]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl RuntimeError {
    /// Stable error code callers branch on.
    pub fn code(&self) -> &'static str {
        match self {
            RuntimeError::AgentNotFound { .. } => "agent_not_found",
            RuntimeError::InvalidInput(_) => "invalid_input",
            RuntimeError::AgentOperationInvalid { .. } => "agent_operation_invalid",
            RuntimeError::OutputValidationFailed { .. } => "output_validation_failed",
            RuntimeError::Schema(_) => "output_schema_malformed",
            RuntimeError::Llm(LlmError::NotConfigured(_)) => "llm_provider_not_configured",
            RuntimeError::Llm(LlmError::UnsupportedProvider(_)) => "unsupported_llm_provider",
            RuntimeError::Llm(_) => "llm_call_failed",
            RuntimeError::Snapshot(e) => e.code(),
            RuntimeError::ServiceUnavailable(_) => "service_unavailable",
        }
    }

    /// HTTP-style status classification.
    pub fn status_code(&self) -> u16 {
        match self {
            RuntimeError::AgentNotFound { .. } => 404,
            RuntimeError::InvalidInput(_) | RuntimeError::AgentOperationInvalid { .. } => 400,
            RuntimeError::OutputValidationFailed { .. } => 422,
            RuntimeError::Llm(LlmError::UnsupportedProvider(_)) => 400,
            RuntimeError::Llm(LlmError::NotConfigured(_)) => 503,
            RuntimeError::Llm(_) => 502,
            RuntimeError::ServiceUnavailable(_) => 503,
            RuntimeError::Schema(_) | RuntimeError::Snapshot(_) => 500,
        }
    }

    /// Whether a caller may reasonably retry. Nothing retries internally.
    pub fn is_retryable(&self) -> bool {
        match self {
            RuntimeError::Llm(e) => !e.is_configuration(),
            RuntimeError::ServiceUnavailable(_) => true,
            _ => false,
        }
    }
}
