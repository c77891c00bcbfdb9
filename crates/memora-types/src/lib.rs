//! Shared domain types for the Memora agent runtime.
//!
//! Agent definitions, render/validation results, snapshot records, execution
//! options, generation-backend messages, and the error taxonomy shared by
//! every layer.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod agent;
pub mod config;
pub mod entity;
pub mod error;
pub mod execution;
pub mod llm;
pub mod render;
pub mod snapshot;
pub mod validation;
