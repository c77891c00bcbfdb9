//! DefinitionStorage trait for byte-level access to agent definition files.
//!
//! Defined in memora-core so the registry can load definitions without
//! coupling to a filesystem. The `LocalDefinitionStorage` adapter lives in
//! memora-infra.

use std::path::PathBuf;
use std::time::SystemTime;

/// Name of the manifest file inside every agent directory.
pub const MANIFEST_FILE: &str = "agent.json";

/// Answers "when did this definition last change?".
///
/// Split out of [`DefinitionStorage`] so reload strategies can take it as a
/// trait object.
pub trait FingerprintSource: Send + Sync {
    /// Latest modification instant across the agent's file tree.
    ///
    /// `None` when the agent directory does not exist. This may walk the
    /// directory synchronously.
    fn last_modified(&self, agent_id: &str) -> Option<SystemTime>;
}

/// Read access to agent definition files, keyed by agent id.
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait DefinitionStorage: FingerprintSource {
    /// Location of the agent's definition directory. Performs no I/O.
    fn definition_path(&self, agent_id: &str) -> PathBuf;

    /// Read a file relative to the agent's definition directory.
    ///
    /// Returns `Ok(None)` when the file does not exist.
    fn read(
        &self,
        agent_id: &str,
        relative_path: &str,
    ) -> impl std::future::Future<Output = Result<Option<Vec<u8>>, std::io::Error>> + Send;
}
