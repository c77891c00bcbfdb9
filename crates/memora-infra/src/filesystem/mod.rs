//! Filesystem adapters for Memora.
//!
//! Provides the local [`DefinitionStorage`](memora_core::definition::storage::DefinitionStorage)
//! implementation and data directory resolution.

pub mod definitions;

use std::path::PathBuf;

/// Resolve the data directory from environment or platform defaults.
///
/// Priority:
/// 1. `MEMORA_DATA_DIR` environment variable
/// 2. `~/.memora`
/// 3. `.memora` in the current directory
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("MEMORA_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".memora");
    }

    PathBuf::from(".memora")
}
