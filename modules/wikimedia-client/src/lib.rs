pub mod error;

pub use error::{Result, WikimediaError};

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;
use tracing::info;

/// One page revision as returned by the MediaWiki API.
#[derive(Debug, Clone, Deserialize)]
pub struct Revision {
    #[serde(default)]
    pub revid: u64,
    pub timestamp: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub size: u64,
}

#[derive(Debug, Deserialize)]
struct RevisionsResponse {
    #[serde(default)]
    query: Option<QueryBlock>,
}

#[derive(Debug, Deserialize)]
struct QueryBlock {
    #[serde(default)]
    pages: HashMap<String, PageBlock>,
}

#[derive(Debug, Deserialize)]
struct PageBlock {
    #[serde(default)]
    revisions: Vec<Revision>,
}

/// Read-only client for the MediaWiki revisions API
/// (`https://<lang>.wikipedia.org/w/api.php`).
pub struct RevisionsClient {
    client: reqwest::Client,
    user_agent: String,
}

impl RevisionsClient {
    /// The API rejects anonymous user agents, so one is always required.
    pub fn new(user_agent: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            user_agent: user_agent.to_string(),
        }
    }

    /// Fetch up to `limit` recent revisions of an article, newest first.
    pub async fn revisions(&self, lang: &str, title: &str, limit: u32) -> Result<Vec<Revision>> {
        let api_url = format!("https://{lang}.wikipedia.org/w/api.php");

        let resp = self
            .client
            .get(&api_url)
            .header("User-Agent", &self.user_agent)
            .query(&[
                ("action", "query"),
                ("titles", title),
                ("prop", "revisions"),
                ("rvlimit", &limit.to_string()),
                ("rvprop", "timestamp|user|comment|size"),
                ("format", "json"),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(WikimediaError::Api {
                status: status.as_u16(),
            });
        }

        let data: RevisionsResponse = resp.json().await?;

        // Only one page is ever requested; take the first entry.
        let revisions = data
            .query
            .and_then(|q| q.pages.into_values().next())
            .map(|p| p.revisions)
            .unwrap_or_default();

        info!(lang, title, count = revisions.len(), "Fetched revisions");
        Ok(revisions)
    }
}
