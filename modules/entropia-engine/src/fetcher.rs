//! One bounded HTTP GET per page: redirects capped at 3, body capped at
//! `max_body_bytes`, TLS details captured for HTTPS pages. `fetch_with_retry`
//! wraps it in the shared retry policy.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use entropia_common::config::HttpConfig;
use entropia_common::{FetchMeta, TlsInfo};

use crate::retry::{self, Sleeper, TokioSleeper};
use crate::tls::capture_tls_info;

const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";
const MAX_REDIRECTS: usize = 3;
const TLS_CAPTURE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("unexpected status: {0}")]
    Status(u16),

    #[error("response body exceeds {0} bytes")]
    BodyTooLarge(u64),

    #[error("fetch: {0}")]
    Network(#[from] reqwest::Error),
}

impl FetchError {
    /// Retryable iff 5xx, 429, or a transient network failure.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Status(status) => retry::is_retryable_status(*status),
            FetchError::Network(err) => retry::is_transient_network(err),
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchResult {
    pub html: String,
    pub final_url: String,
    /// Human-readable subject derived from the final URL.
    pub subject: String,
    pub meta: FetchMeta,
}

/// Seam for the pipeline; tests swap in a mock.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(&self, url: &str) -> Result<FetchResult, FetchError>;
}

pub struct Fetcher {
    client: reqwest::Client,
    user_agent: String,
    max_body_bytes: u64,
    sleeper: Arc<dyn Sleeper>,
}

impl Fetcher {
    pub fn new(config: &HttpConfig) -> Self {
        Self::with_sleeper(config, Arc::new(TokioSleeper))
    }

    pub fn with_sleeper(config: &HttpConfig, sleeper: Arc<dyn Sleeper>) -> Self {
        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS));

        if config.insecure_tls {
            builder = builder.danger_accept_invalid_certs(true);
        }
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

        Fetcher {
            client: builder.build().expect("Failed to build HTTP client"),
            user_agent: config.user_agent.clone(),
            max_body_bytes: config.max_body_bytes,
            sleeper,
        }
    }

    /// One GET. 2xx with a capped body is success; everything else errors.
    pub async fn fetch(&self, raw_url: &str) -> Result<FetchResult, FetchError> {
        url::Url::parse(raw_url).map_err(|_| FetchError::InvalidUrl(raw_url.to_string()))?;

        let resp = self
            .client
            .get(raw_url)
            .header("User-Agent", &self.user_agent)
            .header("Accept", ACCEPT)
            .header("Accept-Language", ACCEPT_LANGUAGE)
            .send()
            .await?;

        let status = resp.status().as_u16();
        let final_url = resp.url().clone();

        let mut meta = FetchMeta {
            status_code: status,
            content_type: header_value(&resp, "Content-Type"),
            last_modified: header_value(&resp, "Last-Modified"),
            etag: header_value(&resp, "ETag"),
            headers: BTreeMap::new(),
            tls: TlsInfo::default(),
        };
        for key in ["Content-Length", "Server", "Cache-Control"] {
            let value = header_value(&resp, key);
            if !value.is_empty() {
                meta.headers.insert(key.to_string(), value);
            }
        }

        if !(200..300).contains(&status) {
            return Err(FetchError::Status(status));
        }

        let html = self.read_capped(resp).await?;

        meta.tls = self.capture_tls(&final_url).await;

        let subject = subject_from_url(final_url.as_str());
        info!(url = raw_url, status, bytes = html.len(), "Fetched page");

        Ok(FetchResult {
            html,
            final_url: final_url.to_string(),
            subject,
            meta,
        })
    }

    /// Up to 3 attempts with 1s/2s backoff for retryable failures.
    pub async fn fetch_with_retry(&self, raw_url: &str) -> Result<FetchResult, FetchError> {
        retry::with_retry(&*self.sleeper, FetchError::is_retryable, || {
            self.fetch(raw_url)
        })
        .await
    }

    async fn read_capped(&self, mut resp: reqwest::Response) -> Result<String, FetchError> {
        let mut body: Vec<u8> = Vec::new();
        while let Some(chunk) = resp.chunk().await? {
            if body.len() as u64 + chunk.len() as u64 > self.max_body_bytes {
                return Err(FetchError::BodyTooLarge(self.max_body_bytes));
            }
            body.extend_from_slice(&chunk);
        }
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    async fn capture_tls(&self, final_url: &url::Url) -> TlsInfo {
        if final_url.scheme() != "https" {
            return TlsInfo {
                enabled: false,
                ..Default::default()
            };
        }
        let Some(host) = final_url.host_str() else {
            return TlsInfo {
                enabled: true,
                ..Default::default()
            };
        };
        let port = final_url.port().unwrap_or(443);

        match capture_tls_info(host, port, TLS_CAPTURE_TIMEOUT).await {
            Some(info) => info,
            None => {
                // The GET already succeeded over TLS, so the channel was
                // encrypted even though introspection failed.
                warn!(host, "TLS details unavailable");
                TlsInfo {
                    enabled: true,
                    ..Default::default()
                }
            }
        }
    }
}

#[async_trait]
impl PageFetcher for Fetcher {
    async fn fetch_page(&self, url: &str) -> Result<FetchResult, FetchError> {
        self.fetch_with_retry(url).await
    }
}

fn header_value(resp: &reqwest::Response, name: &str) -> String {
    resp.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Subject from the final URL: last path segment, extension removed,
/// separators replaced with spaces. Empty path falls back to the host.
pub fn subject_from_url(raw_url: &str) -> String {
    let Ok(parsed) = url::Url::parse(raw_url) else {
        return raw_url.to_string();
    };

    let path = parsed.path().trim_matches('/');
    if path.is_empty() {
        return parsed.host_str().unwrap_or(raw_url).to_string();
    }

    let last = path.rsplit('/').next().unwrap_or(path);
    let stem = match last.rfind('.') {
        Some(idx) if idx > 0 => &last[..idx],
        _ => last,
    };

    stem.replace(['_', '-'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_from_wiki_url() {
        assert_eq!(
            subject_from_url("https://en.wikipedia.org/wiki/Laksa"),
            "Laksa"
        );
        assert_eq!(
            subject_from_url("https://en.wikipedia.org/wiki/Kyivan_Rus%27"),
            "Kyivan Rus%27"
        );
    }

    #[test]
    fn subject_replaces_separators() {
        assert_eq!(
            subject_from_url("https://example.com/my-page_name"),
            "my page name"
        );
    }

    #[test]
    fn subject_strips_extension() {
        assert_eq!(
            subject_from_url("https://example.com/docs/white_paper.html"),
            "white paper"
        );
    }

    #[test]
    fn subject_of_bare_host_is_host() {
        assert_eq!(subject_from_url("https://example.com/"), "example.com");
        assert_eq!(subject_from_url("https://example.com"), "example.com");
    }

    #[test]
    fn status_errors_classify_for_retry() {
        assert!(FetchError::Status(503).is_retryable());
        assert!(FetchError::Status(500).is_retryable());
        assert!(FetchError::Status(429).is_retryable());
        assert!(!FetchError::Status(404).is_retryable());
        assert!(!FetchError::Status(403).is_retryable());
        assert!(!FetchError::InvalidUrl("x".to_string()).is_retryable());
        assert!(!FetchError::BodyTooLarge(100).is_retryable());
    }
}
