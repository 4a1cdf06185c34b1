//! Content-addressed hashing for deduplication.

use sha2::{Digest, Sha256};
use std::fmt;

/// Hex-encoded SHA-256 of an agent id and normalized text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentHash(String);

impl ContentHash {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Trim, lowercase and collapse runs of whitespace to a single space.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Stable hash of `text` scoped to `agent_id`.
pub fn content_hash(agent_id: &str, text: &str) -> ContentHash {
    let mut hasher = Sha256::new();
    hasher.update(agent_id.trim().as_bytes());
    hasher.update([0x1f]);
    hasher.update(normalize_text(text).as_bytes());
    ContentHash(hex::encode(hasher.finalize()))
}
