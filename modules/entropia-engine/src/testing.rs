//! Mock implementations of the engine's seams, for boundary tests:
//! set up mocks, call one real method, assert the output.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use entropia_common::{EntropiaError, FetchMeta, TlsInfo};

use crate::cache::Cache;
use crate::fetcher::{subject_from_url, FetchError, FetchResult, PageFetcher};
use crate::validate::{ProbeError, ProbeOutcome, UrlProber};

/// A plain HTTP 200 page fixture.
pub fn page(url: &str, html: &str) -> FetchResult {
    FetchResult {
        html: html.to_string(),
        final_url: url.to_string(),
        subject: subject_from_url(url),
        meta: FetchMeta {
            status_code: 200,
            content_type: "text/html; charset=utf-8".to_string(),
            tls: TlsInfo {
                enabled: false,
                ..Default::default()
            },
            ..Default::default()
        },
    }
}

/// Fetcher that serves registered pages and 404s everything else.
#[derive(Default)]
pub struct MockFetcher {
    pages: HashMap<String, FetchResult>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_page(mut self, url: &str, result: FetchResult) -> Self {
        self.pages.insert(url.to_string(), result);
        self
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn fetch_page(&self, url: &str) -> Result<FetchResult, FetchError> {
        self.pages
            .get(url)
            .cloned()
            .ok_or(FetchError::Status(404))
    }
}

/// Prober that answers every URL with one fixed status.
pub struct StaticProber {
    status: u16,
}

impl StaticProber {
    pub fn ok(status: u16) -> Self {
        StaticProber { status }
    }
}

#[async_trait]
impl UrlProber for StaticProber {
    async fn probe(&self, url: &str) -> Result<ProbeOutcome, ProbeError> {
        Ok(ProbeOutcome {
            status: self.status,
            final_url: url.to_string(),
            last_modified: None,
        })
    }
}

/// In-memory cache with hit/set counters and an optional always-fail mode.
pub struct MockCache {
    entries: Mutex<HashMap<String, Vec<u8>>>,
    hits: AtomicUsize,
    sets: AtomicUsize,
    fail_writes: AtomicBool,
}

impl MockCache {
    pub fn new() -> Self {
        MockCache {
            entries: Mutex::new(HashMap::new()),
            hits: AtomicUsize::new(0),
            sets: AtomicUsize::new(0),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn failing() -> Self {
        let cache = Self::new();
        cache.fail_writes.store(true, Ordering::SeqCst);
        cache
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn sets(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }
}

impl Default for MockCache {
    fn default() -> Self {
        Self::new()
    }
}

impl Cache for MockCache {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        let value = self.entries.lock().unwrap().get(key).cloned();
        if value.is_some() {
            self.hits.fetch_add(1, Ordering::SeqCst);
        }
        value
    }

    fn set(&self, key: &str, value: &[u8], _ttl: Duration) -> Result<(), EntropiaError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(EntropiaError::Cache("disk full".to_string()));
        }
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_vec());
        self.sets.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn delete(&self, key: &str) {
        self.entries.lock().unwrap().remove(key);
    }

    fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }
}
