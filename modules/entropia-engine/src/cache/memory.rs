use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use entropia_common::EntropiaError;

use super::Cache;

struct Entry {
    data: Vec<u8>,
    expires_at: Instant,
}

/// Bounded in-memory LRU with per-entry TTL. Process-lifetime only.
pub struct MemoryCache {
    inner: Mutex<Inner>,
    capacity: usize,
    default_ttl: Duration,
}

struct Inner {
    map: HashMap<String, Entry>,
    /// Recency order, least-recent first.
    order: VecDeque<String>,
}

impl MemoryCache {
    pub fn new(capacity: usize, default_ttl: Duration) -> Self {
        let capacity = capacity.max(1);
        MemoryCache {
            inner: Mutex::new(Inner {
                map: HashMap::new(),
                order: VecDeque::new(),
            }),
            capacity,
            default_ttl,
        }
    }
}

impl Inner {
    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
        self.order.push_back(key.to_string());
    }

    fn remove(&mut self, key: &str) {
        self.map.remove(key);
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
    }
}

impl Cache for MemoryCache {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        let mut inner = self.inner.lock().unwrap();
        match inner.map.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => {
                let data = entry.data.clone();
                inner.touch(key);
                Some(data)
            }
            Some(_) => {
                inner.remove(key);
                None
            }
            None => None,
        }
    }

    fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), EntropiaError> {
        let ttl = if ttl.is_zero() { self.default_ttl } else { ttl };
        let mut inner = self.inner.lock().unwrap();
        inner.map.insert(
            key.to_string(),
            Entry {
                data: value.to_vec(),
                expires_at: Instant::now() + ttl,
            },
        );
        inner.touch(key);

        while inner.map.len() > self.capacity {
            let Some(oldest) = inner.order.pop_front() else {
                break;
            };
            inner.map.remove(&oldest);
        }
        Ok(())
    }

    fn delete(&self, key: &str) {
        self.inner.lock().unwrap().remove(key);
    }

    fn clear(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.map.clear();
        inner.order.clear();
    }
}
