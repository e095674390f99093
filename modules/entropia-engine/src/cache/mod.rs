//! Two-tier report cache: bounded in-memory LRU in front of an on-disk TTL
//! store, keyed by `entropia:v1:<sha256(url)>`.

mod disk;
mod layered;
mod memory;

pub use disk::DiskCache;
pub use layered::LayeredCache;
pub use memory::MemoryCache;

use std::time::Duration;

use sha2::{Digest, Sha256};

use entropia_common::EntropiaError;

pub trait Cache: Send + Sync {
    /// Returns the cached bytes, or None on miss/expiry. I/O failures are
    /// misses, never errors.
    fn get(&self, key: &str) -> Option<Vec<u8>>;

    /// Store with the given TTL (zero means the tier's default). Failures
    /// propagate to the caller only; callers tolerate them silently.
    fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), EntropiaError>;

    /// Idempotent; removing a missing key is not an error.
    fn delete(&self, key: &str);

    fn clear(&self);
}

/// Cache key for a URL.
pub fn cache_key(url: &str) -> String {
    let hash = Sha256::digest(url.as_bytes());
    format!("entropia:v1:{:x}", hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_is_prefixed_and_hex() {
        let key = cache_key("https://example.com/page");
        assert!(key.starts_with("entropia:v1:"));
        assert_eq!(key.len(), "entropia:v1:".len() + 64);
    }

    #[test]
    fn cache_key_is_deterministic() {
        assert_eq!(cache_key("https://x.test/a"), cache_key("https://x.test/a"));
        assert_ne!(cache_key("https://x.test/a"), cache_key("https://x.test/b"));
    }
}
