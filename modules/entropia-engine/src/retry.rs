//! Shared retry policy for the fetcher and the validator: up to 3 attempts,
//! exponential backoff (1s, 2s), retry only on 5xx, 429 or transient network
//! failures. The sleep is behind a trait so tests run without waiting.

use std::time::Duration;

use async_trait::async_trait;

pub const MAX_ATTEMPTS: u32 = 3;
const BACKOFF_BASE: Duration = Duration::from_secs(1);

/// Backoff before attempt `next_attempt` (1-based): 1s after the first
/// failure, 2s after the second.
pub fn backoff_for(next_attempt: u32) -> Duration {
    BACKOFF_BASE * 2u32.saturating_pow(next_attempt.saturating_sub(1))
}

/// Whether an HTTP status warrants a retry.
pub fn is_retryable_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

/// Whether a reqwest error is a transient network failure (timeout,
/// connection refused, connection reset).
pub fn is_transient_network(err: &reqwest::Error) -> bool {
    if err.is_timeout() || err.is_connect() {
        return true;
    }
    // Connection resets surface as io errors somewhere in the source chain.
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            return matches!(
                io.kind(),
                std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::TimedOut
            );
        }
        source = cause.source();
    }
    false
}

/// Run `op` up to [`MAX_ATTEMPTS`] times, sleeping the backoff schedule
/// between attempts. Exactly one retry decision is made per failure.
pub async fn with_retry<T, E, F, Fut>(
    sleeper: &dyn Sleeper,
    is_retryable: impl Fn(&E) -> bool,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
{
    let mut attempt = 1u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < MAX_ATTEMPTS && is_retryable(&err) => {
                sleeper.sleep(backoff_for(attempt)).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

// --- Sleeper seam ---

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Production sleeper backed by the tokio timer.
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Test sleeper that records requested durations and returns immediately.
pub struct NoSleep {
    pub slept: std::sync::Mutex<Vec<Duration>>,
}

impl NoSleep {
    pub fn new() -> Self {
        NoSleep {
            slept: std::sync::Mutex::new(Vec::new()),
        }
    }
}

impl Default for NoSleep {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Sleeper for NoSleep {
    async fn sleep(&self, duration: Duration) {
        self.slept.lock().unwrap().push(duration);
    }
}
