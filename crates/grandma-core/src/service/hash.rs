//! Content hashing port.
//!
//! The SHA-256 adapter lives in grandma-infra.

/// Computes the integrity hash stories are deduplicated by.
pub trait ContentHasher: Send + Sync {
    /// Lowercase hex digest of `content`.
    fn compute_hash(&self, content: &str) -> String;
}
