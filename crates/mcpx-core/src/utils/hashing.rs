//! Hashing Utilities

use sha2::{Digest, Sha256};

/// Compute SHA-256 of content and return it as a hex string
pub fn content_hash(content: impl AsRef<[u8]>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_ref());
    hex::encode(hasher.finalize())
}

/// First 16 hex chars of [`content_hash`], for directory names
pub fn short_hash(content: impl AsRef<[u8]>) -> String {
    let mut hash = content_hash(content);
    hash.truncate(16);
    hash
}
