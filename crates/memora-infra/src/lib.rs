//! Infrastructure layer for Memora.
//!
//! Contains implementations of the port traits defined in `memora-core`:
//! SQLite snapshot storage, filesystem definition storage, JSON entity
//! sources, SHA-256 hashing and the OpenAI-compatible generation backend.

pub mod config;
pub mod crypto;
pub mod entity;
pub mod filesystem;
pub mod llm;
pub mod sqlite;
