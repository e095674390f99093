use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use entropia_common::EntropiaError;

use super::Cache;

/// On-disk cache: one JSON envelope per key under `dir`, named
/// `<key>.cache`. Payloads are UTF-8 (serialized reports).
pub struct DiskCache {
    dir: PathBuf,
    default_ttl: Duration,
}

#[derive(Serialize, Deserialize)]
struct DiskEntry {
    data: String,
    expires_at: DateTime<Utc>,
}

impl DiskCache {
    pub fn new(dir: impl Into<PathBuf>, default_ttl: Duration) -> Self {
        DiskCache {
            dir: dir.into(),
            default_ttl,
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.cache"))
    }

    fn read_entry(path: &Path) -> Option<DiskEntry> {
        let raw = std::fs::read_to_string(path).ok()?;
        serde_json::from_str(&raw).ok()
    }
}

impl Cache for DiskCache {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        let path = self.path_for(key);
        let entry = Self::read_entry(&path)?;

        if Utc::now() > entry.expires_at {
            let _ = std::fs::remove_file(&path);
            debug!(key, "Expired cache entry removed");
            return None;
        }

        Some(entry.data.into_bytes())
    }

    fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), EntropiaError> {
        let ttl = if ttl.is_zero() { self.default_ttl } else { ttl };
        let data = String::from_utf8(value.to_vec())
            .map_err(|_| EntropiaError::Cache("payload is not UTF-8".to_string()))?;

        let entry = DiskEntry {
            data,
            expires_at: Utc::now()
                + chrono::Duration::from_std(ttl)
                    .map_err(|e| EntropiaError::Cache(e.to_string()))?,
        };

        std::fs::create_dir_all(&self.dir)
            .map_err(|e| EntropiaError::Cache(format!("create cache dir: {e}")))?;

        let raw = serde_json::to_string(&entry).map_err(|e| EntropiaError::Cache(e.to_string()))?;
        std::fs::write(self.path_for(key), raw)
            .map_err(|e| EntropiaError::Cache(format!("write cache file: {e}")))?;

        Ok(())
    }

    fn delete(&self, key: &str) {
        let _ = std::fs::remove_file(self.path_for(key));
    }

    fn clear(&self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(60);

    #[test]
    fn set_then_get_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path(), TTL);
        cache.set("entropia:v1:abc", b"{\"a\":1}", Duration::ZERO).unwrap();
        assert_eq!(cache.get("entropia:v1:abc"), Some(b"{\"a\":1}".to_vec()));
    }

    #[test]
    fn get_on_missing_file_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path(), TTL);
        assert_eq!(cache.get("entropia:v1:missing"), None);
    }

    #[test]
    fn corrupt_file_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path(), TTL);
        std::fs::write(dir.path().join("entropia:v1:bad.cache"), "not json").unwrap();
        assert_eq!(cache.get("entropia:v1:bad"), None);
    }

    #[test]
    fn expired_entry_is_removed_on_read() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path(), TTL);
        cache.set("k", b"v", Duration::from_millis(1)).unwrap();
        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(cache.get("k"), None);
        assert!(!dir.path().join("k.cache").exists());
    }

    #[test]
    fn envelope_has_data_and_expiry_fields() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path(), TTL);
        cache.set("k", b"payload", Duration::ZERO).unwrap();

        let raw = std::fs::read_to_string(dir.path().join("k.cache")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["data"], "payload");
        assert!(value["expires_at"].is_string());
    }

    #[test]
    fn delete_and_clear_tolerate_absence() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path().join("sub"), TTL);
        cache.delete("nothing");
        cache.clear();
    }
}
