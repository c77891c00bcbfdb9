//! SHA-256 content hashing for snapshot source hashes.

use sha2::{Digest, Sha256};

use memora_core::snapshot::hash::ContentHasher;

/// Lowercase hex SHA-256 implementation of `ContentHasher`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256ContentHasher;

impl Sha256ContentHasher {
    pub fn new() -> Self {
        Self
    }
}

impl ContentHasher for Sha256ContentHasher {
    fn compute_hash(&self, content: &str) -> String {
        let digest = Sha256::digest(content.as_bytes());
        format!("{:x}", digest)
    }
}
