//! Reload strategies for cached definition bundles.
//!
//! - [`WatchModified`] fingerprints the definition tree on every load and
//!   reloads when the newest modification time changes.
//! - [`TrustFirstLoad`] never touches storage once a bundle is cached.

use std::time::SystemTime;

use memora_types::config::CacheMode;

use super::storage::FingerprintSource;

/// Snapshot of a definition's on-disk state. `None` inside means the
/// directory was missing when probed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fingerprint(pub Option<SystemTime>);

/// Decides whether a cached bundle can be reused.
pub trait ReloadStrategy: Send + Sync {
    /// The mode this strategy implements (for logging).
    fn mode(&self) -> CacheMode;

    /// Fingerprint the definition's current state.
    ///
    /// `None` means "do not probe": any cached bundle is trusted as-is.
    fn probe(&self, source: &dyn FingerprintSource, agent_id: &str) -> Option<Fingerprint>;
}

/// Re-fingerprint on every call.
#[derive(Debug, Default, Clone, Copy)]
pub struct WatchModified;

impl ReloadStrategy for WatchModified {
    fn mode(&self) -> CacheMode {
        CacheMode::Watch
    }

    fn probe(&self, source: &dyn FingerprintSource, agent_id: &str) -> Option<Fingerprint> {
        Some(Fingerprint(source.last_modified(agent_id)))
    }
}

/// Trust the first successful load for the process lifetime.
#[derive(Debug, Default, Clone, Copy)]
pub struct TrustFirstLoad;

impl ReloadStrategy for TrustFirstLoad {
    fn mode(&self) -> CacheMode {
        CacheMode::Memory
    }

    fn probe(&self, _source: &dyn FingerprintSource, _agent_id: &str) -> Option<Fingerprint> {
        None
    }
}

/// Build the strategy for a configured cache mode.
pub fn strategy_for(mode: CacheMode) -> Box<dyn ReloadStrategy> {
    match mode {
        CacheMode::Watch => Box::new(WatchModified),
        CacheMode::Memory => Box::new(TrustFirstLoad),
    }
}
