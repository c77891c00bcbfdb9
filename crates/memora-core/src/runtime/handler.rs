//! Routed capability seam.
//!
//! A [`CapabilityHandler`] owns the pre-hash domain lookups for one agent id.
//! The executor's handler table is fixed at construction; handlers receive
//! the executor back as a [`RuntimeCore`] on each call, so neither side holds
//! a reference to the other.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use memora_types::agent::DefinitionBundle;
use memora_types::error::RuntimeError;
use memora_types::execution::{ExecuteOptions, ExecutionResult};
use memora_types::snapshot::{FindOptions, FindSnapshotResult, NewSnapshot, Snapshot, SnapshotIdentity};
use serde_json::Value;

use super::Input;

/// The executor primitives a routed handler may use.
pub trait RuntimeCore: Send + Sync {
    fn load_definition<'a>(
        &'a self,
        agent_id: &'a str,
    ) -> BoxFuture<'a, Result<Arc<DefinitionBundle>, RuntimeError>>;

    /// Model a generation with `options` would use.
    fn effective_model(&self, options: &ExecuteOptions) -> String;

    fn compute_hash(
        &self,
        agent_id: &str,
        operation: Option<&str>,
        input: &Input,
    ) -> Result<String, RuntimeError>;

    fn find_snapshot<'a>(
        &'a self,
        identity: &'a SnapshotIdentity,
        options: FindOptions,
    ) -> BoxFuture<'a, Result<FindSnapshotResult, RuntimeError>>;

    fn create_snapshot<'a>(
        &'a self,
        data: NewSnapshot,
        ttl_seconds: Option<i64>,
    ) -> BoxFuture<'a, Result<Snapshot, RuntimeError>>;

    /// The generic pipeline, never routed.
    fn execute_generic<'a>(
        &'a self,
        agent_id: &'a str,
        operation: Option<&'a str>,
        input: Input,
        options: ExecuteOptions,
    ) -> BoxFuture<'a, Result<ExecutionResult, RuntimeError>>;
}

/// A dedicated collaborator for one agent id.
pub trait CapabilityHandler: Send + Sync {
    /// The agent id this handler serves.
    fn agent_id(&self) -> &str;

    fn handle<'a>(
        &'a self,
        core: &'a dyn RuntimeCore,
        operation: Option<&'a str>,
        input: Input,
        options: ExecuteOptions,
    ) -> BoxFuture<'a, Result<ExecutionResult, RuntimeError>>;

    /// Post-process parsed generic output before validation and storage.
    fn normalize_output(&self, _operation: Option<&str>, parsed: Value, _raw: &str) -> Value {
        parsed
    }
}
