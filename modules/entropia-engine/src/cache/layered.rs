use std::path::PathBuf;
use std::time::Duration;

use entropia_common::EntropiaError;

use super::{Cache, DiskCache, MemoryCache};

/// Memory tier in front of the disk tier. Disk hits are promoted to memory.
pub struct LayeredCache {
    memory: MemoryCache,
    disk: DiskCache,
}

impl LayeredCache {
    pub fn new(memory_entries: usize, ttl: Duration, disk_dir: impl Into<PathBuf>) -> Self {
        LayeredCache {
            memory: MemoryCache::new(memory_entries, ttl),
            disk: DiskCache::new(disk_dir, ttl),
        }
    }
}

impl Cache for LayeredCache {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        if let Some(value) = self.memory.get(key) {
            return Some(value);
        }

        if let Some(value) = self.disk.get(key) {
            // Promote with the tier's default TTL; a promote failure is not
            // a miss.
            let _ = self.memory.set(key, &value, Duration::ZERO);
            return Some(value);
        }

        None
    }

    fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), EntropiaError> {
        self.memory.set(key, value, ttl)?;
        self.disk.set(key, value, ttl)
    }

    fn delete(&self, key: &str) {
        self.memory.delete(key);
        self.disk.delete(key);
    }

    fn clear(&self) {
        self.memory.clear();
        self.disk.clear();
    }
}
