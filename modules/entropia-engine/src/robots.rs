//! Per-host robots.txt compliance. The file is fetched once per host with the
//! scanner's User-Agent and cached for the process lifetime; a missing file
//! allows everything, and a fetch failure fails open.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use robots_txt::matcher::SimpleMatcher;
use robots_txt::Robots;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use entropia_common::EntropiaError;

/// Cached robots.txt state for one host. The raw body is kept because the
/// parser borrows from its input; parsing per query is cheap.
struct HostRobots {
    allow_all: bool,
    body: String,
}

pub struct RobotsChecker {
    cache: RwLock<HashMap<String, Arc<HostRobots>>>,
    client: reqwest::Client,
    user_agent: String,
    /// Product token of the user agent, used for group matching.
    product: String,
}

impl RobotsChecker {
    pub fn new(user_agent: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");

        RobotsChecker {
            cache: RwLock::new(HashMap::new()),
            client,
            user_agent: user_agent.to_string(),
            product: product_token(user_agent),
        }
    }

    /// Whether `raw_url` may be fetched, plus any Crawl-delay for the host.
    pub async fn can_fetch(&self, raw_url: &str) -> Result<(bool, Option<Duration>), EntropiaError> {
        let parsed = url::Url::parse(raw_url)
            .map_err(|_| EntropiaError::InvalidUrl(raw_url.to_string()))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| EntropiaError::InvalidUrl(raw_url.to_string()))?
            .to_string();

        let entry = match self.host_entry(&parsed.scheme().to_string(), &host).await {
            Some(entry) => entry,
            // Fetch failed: fail open, don't cache, retry next time.
            None => return Ok((true, None)),
        };

        if entry.allow_all {
            return Ok((true, None));
        }

        Ok(evaluate(&entry.body, &self.product, parsed.path()))
    }

    async fn host_entry(&self, scheme: &str, host: &str) -> Option<Arc<HostRobots>> {
        {
            let cache = self.cache.read().await;
            if let Some(entry) = cache.get(host) {
                return Some(entry.clone());
            }
        }

        let fetched = self.fetch_robots(scheme, host).await?;

        let mut cache = self.cache.write().await;
        // Double-check: another task may have fetched while we did.
        if let Some(entry) = cache.get(host) {
            return Some(entry.clone());
        }
        let entry = Arc::new(fetched);
        cache.insert(host.to_string(), entry.clone());
        Some(entry)
    }

    async fn fetch_robots(&self, scheme: &str, host: &str) -> Option<HostRobots> {
        let robots_url = format!("{scheme}://{host}/robots.txt");

        let resp = match self
            .client
            .get(&robots_url)
            .header("User-Agent", &self.user_agent)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                warn!(host, error = %e, "robots.txt fetch failed, allowing");
                return None;
            }
        };

        let status = resp.status();
        if status.as_u16() == 404 {
            debug!(host, "No robots.txt, allowing everything");
            return Some(HostRobots {
                allow_all: true,
                body: String::new(),
            });
        }
        if !status.is_success() {
            warn!(host, status = status.as_u16(), "robots.txt unavailable, allowing");
            return None;
        }

        let body = resp.text().await.unwrap_or_default();
        Some(HostRobots {
            allow_all: false,
            body,
        })
    }

    pub async fn clear(&self) {
        self.cache.write().await.clear();
    }
}

/// Evaluate a robots.txt body for one user-agent product token and path.
fn evaluate(body: &str, product: &str, path: &str) -> (bool, Option<Duration>) {
    let robots = Robots::from_str_lossy(body);
    let section = robots.choose_section(product);
    let matcher = SimpleMatcher::new(&section.rules);

    let allowed = matcher.check_path(path);
    let delay = section
        .crawl_delay
        .filter(|d| *d > 0.0)
        .map(Duration::from_secs_f64);

    (allowed, delay)
}

/// First token of the user agent, version stripped: "entropia/0.1 (+...)"
/// matches robots groups as "entropia".
fn product_token(user_agent: &str) -> String {
    user_agent
        .split_whitespace()
        .next()
        .unwrap_or(user_agent)
        .split('/')
        .next()
        .unwrap_or(user_agent)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_token_strips_version_and_comment() {
        assert_eq!(product_token("entropia/0.1 (+https://example.org)"), "entropia");
        assert_eq!(product_token("entropia"), "entropia");
    }

    #[test]
    fn evaluate_allows_by_default() {
        let (allowed, delay) = evaluate("", "entropia", "/any/path");
        assert!(allowed);
        assert_eq!(delay, None);
    }

    #[test]
    fn evaluate_respects_disallow() {
        let body = "User-agent: *\nDisallow: /private/\n";
        let (allowed, _) = evaluate(body, "entropia", "/private/page");
        assert!(!allowed);
        let (allowed, _) = evaluate(body, "entropia", "/public/page");
        assert!(allowed);
    }

    #[test]
    fn evaluate_prefers_specific_agent_group() {
        let body = "User-agent: *\nDisallow: /\n\nUser-agent: entropia\nDisallow: /private/\n";
        let (allowed, _) = evaluate(body, "entropia", "/public");
        assert!(allowed);
        let (allowed, _) = evaluate(body, "entropia", "/private/x");
        assert!(!allowed);
    }

    #[test]
    fn evaluate_surfaces_crawl_delay() {
        let body = "User-agent: *\nCrawl-delay: 2\nDisallow: /tmp/\n";
        let (allowed, delay) = evaluate(body, "entropia", "/page");
        assert!(allowed);
        assert_eq!(delay, Some(Duration::from_secs(2)));
    }
}
