//! Snapshot cache: content hashing, the persistence port and the service
//! enforcing expiry semantics on top of it.

pub mod hash;
pub mod repository;
pub mod service;
