//! Agent definition loading.
//!
//! [`DefinitionRegistry`](registry::DefinitionRegistry) resolves an agent id
//! into a [`DefinitionBundle`](memora_types::agent::DefinitionBundle) using a
//! [`DefinitionStorage`](storage::DefinitionStorage) port, and caches bundles
//! per agent id under a pluggable [`ReloadStrategy`](freshness::ReloadStrategy).

pub mod freshness;
pub mod registry;
pub mod storage;
