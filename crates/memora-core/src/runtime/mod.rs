//! The runtime executor and the small pure helpers its pipeline uses.

pub mod context;
pub mod executor;
pub mod handler;
pub mod memory;
pub mod output;
pub mod scope;
pub mod tools;

/// Invocation input: a JSON object.
pub type Input = serde_json::Map<String, serde_json::Value>;
