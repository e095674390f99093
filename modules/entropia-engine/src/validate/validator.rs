//! Concurrent evidence validation: one HEAD probe per evidence URL under a
//! counting semaphore, order-preserving, with retry, staleness derivation and
//! authority tagging. Cancellation yields a placeholder result per URL —
//! the output is always the same length as the input.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, info};

use entropia_common::config::HttpConfig;
use entropia_common::{Evidence, ValidationResult};

use crate::cancel::CancelToken;
use crate::limiter::HostLimiter;
use crate::retry::{self, Sleeper, TokioSleeper};
use crate::validate::AuthorityClassifier;

const DEFAULT_MAX_WORKERS: usize = 20;
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_REDIRECTS: usize = 3;

const STALE_DAYS: i64 = 365;
const VERY_STALE_DAYS: i64 = 3 * 365;

/// What one HEAD attempt observed.
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    pub status: u16,
    pub final_url: String,
    pub last_modified: Option<String>,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct ProbeError {
    pub message: String,
    pub transient: bool,
}

/// Seam over the HEAD request; tests swap in a mock.
#[async_trait]
pub trait UrlProber: Send + Sync {
    async fn probe(&self, url: &str) -> Result<ProbeOutcome, ProbeError>;
}

/// Production prober: HEAD with the scanner's User-Agent, 10s deadline,
/// redirects capped at 3, proxy-aware.
pub struct HttpProber {
    client: reqwest::Client,
    user_agent: String,
}

impl HttpProber {
    pub fn new(config: &HttpConfig) -> Self {
        let mut builder = reqwest::Client::builder()
            .timeout(PROBE_TIMEOUT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS));

        if let Some(proxy) = config.proxy_for("http") {
            if let Ok(proxy) = reqwest::Proxy::http(&proxy) {
                builder = builder.proxy(proxy);
            }
        }
        if let Some(proxy) = config.proxy_for("https") {
            if let Ok(proxy) = reqwest::Proxy::https(&proxy) {
                builder = builder.proxy(proxy);
            }
        }

        HttpProber {
            client: builder.build().expect("Failed to build HTTP client"),
            user_agent: config.user_agent.clone(),
        }
    }
}

#[async_trait]
impl UrlProber for HttpProber {
    async fn probe(&self, url: &str) -> Result<ProbeOutcome, ProbeError> {
        let resp = self
            .client
            .head(url)
            .header("User-Agent", &self.user_agent)
            .send()
            .await
            .map_err(|e| ProbeError {
                message: format!("request failed: {e}"),
                transient: retry::is_transient_network(&e),
            })?;

        Ok(ProbeOutcome {
            status: resp.status().as_u16(),
            final_url: resp.url().to_string(),
            last_modified: resp
                .headers()
                .get("Last-Modified")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
        })
    }
}

pub struct Validator {
    prober: Arc<dyn UrlProber>,
    classifier: Arc<AuthorityClassifier>,
    limiter: Option<Arc<HostLimiter>>,
    sleeper: Arc<dyn Sleeper>,
    max_workers: usize,
}

impl Validator {
    pub fn new(http: &HttpConfig, classifier: Arc<AuthorityClassifier>, max_workers: usize) -> Self {
        Self::with_prober(
            Arc::new(HttpProber::new(http)),
            classifier,
            max_workers,
            Arc::new(TokioSleeper),
        )
    }

    pub fn with_prober(
        prober: Arc<dyn UrlProber>,
        classifier: Arc<AuthorityClassifier>,
        max_workers: usize,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Validator {
            prober,
            classifier,
            limiter: None,
            sleeper,
            max_workers: if max_workers == 0 {
                DEFAULT_MAX_WORKERS
            } else {
                max_workers
            },
        }
    }

    /// Share the process-wide per-host limiter with probes.
    pub fn with_limiter(mut self, limiter: Arc<HostLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Validate all evidence. The result list is 1:1 with the input, in
    /// input order.
    pub async fn validate(
        &self,
        cancel: &CancelToken,
        evidence: &[Evidence],
    ) -> Vec<ValidationResult> {
        if evidence.is_empty() {
            return Vec::new();
        }

        let semaphore = Arc::new(Semaphore::new(self.max_workers));

        let futures = evidence.iter().map(|ev| {
            let semaphore = semaphore.clone();
            async move {
                let authority = self.classifier.classify(&ev.url);

                if cancel.is_cancelled() {
                    return ValidationResult::cancelled(&ev.url, authority);
                }

                let permit = tokio::select! {
                    permit = semaphore.acquire_owned() => permit,
                    _ = cancel.cancelled() => {
                        return ValidationResult::cancelled(&ev.url, authority);
                    }
                };
                let _permit = match permit {
                    Ok(permit) => permit,
                    Err(_) => return ValidationResult::cancelled(&ev.url, authority),
                };

                if let Some(limiter) = &self.limiter {
                    if limiter.wait(cancel, &ev.url).await.is_err() {
                        return ValidationResult::cancelled(&ev.url, authority);
                    }
                }

                self.probe_one(&ev.url, authority).await
            }
        });

        let results = join_all(futures).await;
        info!(
            total = results.len(),
            accessible = results.iter().filter(|r| r.is_accessible).count(),
            "Validated evidence"
        );
        results
    }

    async fn probe_one(
        &self,
        url: &str,
        authority: entropia_common::AuthorityTier,
    ) -> ValidationResult {
        let mut result = ValidationResult {
            url: url.to_string(),
            is_accessible: false,
            status_code: None,
            last_modified: None,
            age_days: None,
            is_stale: false,
            is_very_stale: false,
            is_dead: false,
            redirect_url: None,
            authority,
            error: None,
        };

        let outcome = retry::with_retry(
            &*self.sleeper,
            |err: &ProbeAttempt| match err {
                ProbeAttempt::BadStatus(status) => retry::is_retryable_status(*status),
                ProbeAttempt::Failed(e) => e.transient,
            },
            || async {
                match self.prober.probe(url).await {
                    Ok(outcome) if retry::is_retryable_status(outcome.status) => {
                        Err(ProbeAttempt::BadStatus(outcome.status))
                    }
                    Ok(outcome) => Ok(outcome),
                    Err(e) => Err(ProbeAttempt::Failed(e)),
                }
            },
        )
        .await;

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(ProbeAttempt::BadStatus(status)) => {
                result.status_code = Some(status);
                debug!(url, status, "Probe exhausted retries");
                return result;
            }
            Err(ProbeAttempt::Failed(e)) => {
                result.error = Some(e.message);
                result.is_dead = true;
                return result;
            }
        };

        result.status_code = Some(outcome.status);
        result.is_accessible = (200..400).contains(&outcome.status);
        result.is_dead = matches!(outcome.status, 404 | 410);

        if outcome.final_url != url {
            result.redirect_url = Some(outcome.final_url);
        }

        if let Some(raw) = outcome.last_modified {
            if let Some(last_modified) = parse_http_date(&raw) {
                let age_days = (Utc::now() - last_modified).num_days();
                result.last_modified = Some(last_modified);
                result.age_days = Some(age_days);
                result.is_stale = age_days > STALE_DAYS;
                result.is_very_stale = age_days > VERY_STALE_DAYS;
            }
        }

        result
    }
}

/// One probe attempt's failure, for retry classification.
enum ProbeAttempt {
    BadStatus(u16),
    Failed(ProbeError),
}

/// RFC 1123 dates as sent in Last-Modified headers.
fn parse_http_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
