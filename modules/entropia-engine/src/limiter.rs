//! Per-host token-bucket rate limiting. Buckets are created lazily on first
//! reference (short read lock, double-checked write lock) and can be
//! overridden per host, which is how robots.txt Crawl-delay lands here.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tokio::time::{Duration, Instant};
use tracing::debug;

use entropia_common::EntropiaError;

use crate::cancel::CancelToken;

struct Bucket {
    rate: f64,
    burst: f64,
    tokens: f64,
    last_refill: Instant,
}

impl Bucket {
    fn new(rate: f64, burst: f64) -> Self {
        Bucket {
            rate,
            burst,
            tokens: burst,
            last_refill: Instant::now(),
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.rate).min(self.burst);
        self.last_refill = now;
    }

    /// Take a token if available, else return how long until one exists.
    fn try_take(&mut self) -> Option<Duration> {
        self.refill(Instant::now());
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            return None;
        }
        let deficit = 1.0 - self.tokens;
        Some(Duration::from_secs_f64(deficit / self.rate))
    }
}

pub struct HostLimiter {
    buckets: RwLock<HashMap<String, Arc<Mutex<Bucket>>>>,
    default_rate: f64,
    default_burst: f64,
}

impl HostLimiter {
    pub fn new(requests_per_second: f64, burst: u32) -> Self {
        let burst = if burst == 0 { 5 } else { burst };
        HostLimiter {
            buckets: RwLock::new(HashMap::new()),
            default_rate: requests_per_second,
            default_burst: burst as f64,
        }
    }

    /// Block until a token is available for the URL's host, or cancellation.
    pub async fn wait(&self, cancel: &CancelToken, raw_url: &str) -> Result<(), EntropiaError> {
        let host = host_of(raw_url)?;
        let bucket = self.bucket_for(&host).await;

        loop {
            if cancel.is_cancelled() {
                return Err(EntropiaError::Cancelled);
            }
            let pause = { bucket.lock().await.try_take() };
            match pause {
                None => return Ok(()),
                Some(duration) => {
                    if !cancel.sleep(duration).await {
                        return Err(EntropiaError::Cancelled);
                    }
                }
            }
        }
    }

    /// Non-blocking attempt. Invalid URLs are never allowed.
    pub async fn allow(&self, raw_url: &str) -> bool {
        let Ok(host) = host_of(raw_url) else {
            return false;
        };
        let bucket = self.bucket_for(&host).await;
        let taken = bucket.lock().await.try_take().is_none();
        taken
    }

    /// Install a per-host override, replacing any existing bucket.
    pub async fn set_host(&self, host: &str, requests_per_second: f64, burst: u32) {
        let burst = if burst == 0 {
            self.default_burst
        } else {
            burst as f64
        };
        debug!(host, rps = requests_per_second, burst, "Rate limit override");
        let mut buckets = self.buckets.write().await;
        buckets.insert(
            host.to_string(),
            Arc::new(Mutex::new(Bucket::new(requests_per_second, burst))),
        );
    }

    async fn bucket_for(&self, host: &str) -> Arc<Mutex<Bucket>> {
        {
            let buckets = self.buckets.read().await;
            if let Some(bucket) = buckets.get(host) {
                return bucket.clone();
            }
        }

        let mut buckets = self.buckets.write().await;
        // Double-check after taking the write lock.
        if let Some(bucket) = buckets.get(host) {
            return bucket.clone();
        }
        let bucket = Arc::new(Mutex::new(Bucket::new(self.default_rate, self.default_burst)));
        buckets.insert(host.to_string(), bucket.clone());
        bucket
    }
}

fn host_of(raw_url: &str) -> Result<String, EntropiaError> {
    let parsed =
        url::Url::parse(raw_url).map_err(|_| EntropiaError::InvalidUrl(raw_url.to_string()))?;
    parsed
        .host_str()
        .map(|h| h.to_string())
        .ok_or_else(|| EntropiaError::InvalidUrl(raw_url.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn burst_allows_initial_requests() {
        let limiter = HostLimiter::new(1.0, 3);
        for _ in 0..3 {
            assert!(limiter.allow("https://example.com/a").await);
        }
        assert!(!limiter.allow("https://example.com/a").await);
    }

    #[tokio::test]
    async fn hosts_have_independent_buckets() {
        let limiter = HostLimiter::new(1.0, 1);
        assert!(limiter.allow("https://a.test/x").await);
        assert!(!limiter.allow("https://a.test/y").await);
        assert!(limiter.allow("https://b.test/x").await);
    }

    #[tokio::test(start_paused = true)]
    async fn tokens_refill_over_time() {
        let limiter = HostLimiter::new(2.0, 1);
        assert!(limiter.allow("https://example.com/").await);
        assert!(!limiter.allow("https://example.com/").await);

        tokio::time::advance(Duration::from_millis(600)).await;
        assert!(limiter.allow("https://example.com/").await);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_blocks_until_token_available() {
        let limiter = HostLimiter::new(1.0, 1);
        let cancel = CancelToken::new();

        limiter.wait(&cancel, "https://example.com/").await.unwrap();

        let start = Instant::now();
        limiter.wait(&cancel, "https://example.com/").await.unwrap();
        // Steady-state spacing >= 1/rps.
        assert!(Instant::now().duration_since(start) >= Duration::from_millis(900));
    }

    #[tokio::test]
    async fn wait_observes_cancellation() {
        let limiter = Arc::new(HostLimiter::new(0.001, 1));
        let cancel = CancelToken::new();

        limiter.wait(&cancel, "https://example.com/").await.unwrap();

        let waiter_limiter = limiter.clone();
        let waiter_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            waiter_limiter
                .wait(&waiter_cancel, "https://example.com/")
                .await
        });

        cancel.cancel();
        let result = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("wait should abort on cancel")
            .unwrap();
        assert!(matches!(result, Err(EntropiaError::Cancelled)));
    }

    #[tokio::test]
    async fn set_host_overrides_bucket() {
        let limiter = HostLimiter::new(1.0, 1);
        limiter.set_host("slow.test", 0.5, 1).await;
        assert!(limiter.allow("https://slow.test/").await);
        assert!(!limiter.allow("https://slow.test/").await);
    }

    #[tokio::test]
    async fn invalid_url_is_rejected() {
        let limiter = HostLimiter::new(1.0, 1);
        assert!(!limiter.allow("not a url").await);
        let cancel = CancelToken::new();
        assert!(matches!(
            limiter.wait(&cancel, "not a url").await,
            Err(EntropiaError::InvalidUrl(_))
        ));
    }
}
