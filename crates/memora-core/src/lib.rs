//! Runtime logic and port trait definitions for Memora.
//!
//! This crate defines the "ports" (storage, hashing, generation backend and
//! entity-source traits) that the infrastructure layer implements, plus the
//! pure pieces of the runtime: template engine, schema validator, definition
//! registry, snapshot cache service and the executor that ties them together.
//! It depends only on `memora-types` -- never on `memora-infra` or any
//! database/IO crate.

pub mod capability;
pub mod definition;
pub mod llm;
pub mod runtime;
pub mod snapshot;
pub mod template;
pub mod validation;

#[cfg(test)]
mod test_support;
