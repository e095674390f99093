use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use percent_encoding::percent_decode_str;
use tracing::{debug, warn};
use wikimedia_client::{Revision, RevisionsClient, WikimediaError};

use entropia_common::{Severity, Signal, SignalType};

const REVISION_LIMIT: u32 = 100;
const WINDOW_DAYS: i64 = 30;

/// Markers in revision comments that indicate a revert.
const REVERT_MARKERS: [&str; 4] = ["revert", "rv ", "undo", "undid"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictSeverity {
    None,
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone)]
pub struct EditWarIndicators {
    /// Edits within the 30-day window.
    pub recent_edits: usize,
    /// Distinct editors within the window.
    pub unique_editors: usize,
    /// Revert-comment revisions across the fetched history.
    pub revert_count: usize,
    /// Edits per day across the window actually observed.
    pub edit_frequency: f64,
    pub last_edit: Option<DateTime<Utc>>,
    pub severity: ConflictSeverity,
}

/// Seam over the revisions API so the analysis is testable offline.
#[async_trait]
pub trait RevisionSource: Send + Sync {
    async fn revisions(
        &self,
        lang: &str,
        title: &str,
        limit: u32,
    ) -> Result<Vec<Revision>, WikimediaError>;
}

#[async_trait]
impl RevisionSource for std::sync::Arc<dyn RevisionSource> {
    async fn revisions(
        &self,
        lang: &str,
        title: &str,
        limit: u32,
    ) -> Result<Vec<Revision>, WikimediaError> {
        (**self).revisions(lang, title, limit).await
    }
}

#[async_trait]
impl RevisionSource for RevisionsClient {
    async fn revisions(
        &self,
        lang: &str,
        title: &str,
        limit: u32,
    ) -> Result<Vec<Revision>, WikimediaError> {
        RevisionsClient::revisions(self, lang, title, limit).await
    }
}

pub struct EditWarDetector<S: RevisionSource> {
    source: S,
}

impl EditWarDetector<RevisionsClient> {
    pub fn new(user_agent: &str, timeout: Duration) -> Self {
        EditWarDetector {
            source: RevisionsClient::new(user_agent, timeout),
        }
    }
}

impl<S: RevisionSource> EditWarDetector<S> {
    pub fn with_source(source: S) -> Self {
        EditWarDetector { source }
    }

    /// Analyze the article's revision history. Any failure (bad URL, network,
    /// parse) yields None; the scan is never affected.
    pub async fn detect(&self, page_url: &str) -> Option<EditWarIndicators> {
        let title = article_title(page_url)?;
        let lang = article_lang(page_url);

        let revisions = match self.source.revisions(&lang, &title, REVISION_LIMIT).await {
            Ok(revisions) => revisions,
            Err(e) => {
                warn!(page_url, error = %e, "Revision fetch failed");
                return None;
            }
        };

        if revisions.is_empty() {
            debug!(page_url, "No revisions returned");
            return None;
        }

        Some(analyze_revisions(&revisions, Utc::now()))
    }
}

/// Classify edit-war pressure from a newest-first revision list.
///
/// The frequency divisor is days since the oldest revision inside the window,
/// not the nominal 30 days; young windows therefore read high, which is what
/// the severity thresholds were tuned against.
pub fn analyze_revisions(revisions: &[Revision], now: DateTime<Utc>) -> EditWarIndicators {
    let window_start = now - chrono::Duration::days(WINDOW_DAYS);

    let mut recent: Vec<DateTime<Utc>> = Vec::new();
    let mut editors: HashSet<&str> = HashSet::new();
    let mut revert_count = 0usize;
    let mut last_edit: Option<DateTime<Utc>> = None;

    for revision in revisions {
        let comment = revision.comment.to_lowercase();
        if REVERT_MARKERS.iter().any(|m| comment.contains(m)) {
            revert_count += 1;
        }

        let Ok(timestamp) = DateTime::parse_from_rfc3339(&revision.timestamp) else {
            continue;
        };
        let timestamp = timestamp.with_timezone(&Utc);

        if timestamp > window_start {
            recent.push(timestamp);
            editors.insert(revision.user.as_str());
            if last_edit.map_or(true, |t| timestamp > t) {
                last_edit = Some(timestamp);
            }
        }
    }

    let mut edit_frequency = 0.0;
    if let Some(oldest) = recent.iter().min() {
        let days = (now - *oldest).num_seconds() as f64 / 86_400.0;
        if days > 0.0 {
            edit_frequency = recent.len() as f64 / days;
        }
    }

    let recent_edits = recent.len();
    let severity = if (recent_edits > 10 && revert_count > 3) || edit_frequency > 5.0 {
        ConflictSeverity::High
    } else if (recent_edits > 5 && revert_count > 1) || edit_frequency > 2.0 {
        ConflictSeverity::Medium
    } else if revert_count > 0 {
        ConflictSeverity::Low
    } else {
        ConflictSeverity::None
    };

    EditWarIndicators {
        recent_edits,
        unique_editors: editors.len(),
        revert_count,
        edit_frequency,
        last_edit,
        severity,
    }
}

/// Build the edit_war signal, or None when nothing was detected.
pub fn edit_war_signal(indicators: &EditWarIndicators) -> Option<Signal> {
    let (severity, label) = match indicators.severity {
        ConflictSeverity::None => return None,
        ConflictSeverity::Low => (Severity::Info, "low"),
        ConflictSeverity::Medium => (Severity::Warning, "medium"),
        ConflictSeverity::High => (Severity::Critical, "high"),
    };

    let mut data: BTreeMap<String, serde_json::Value> = BTreeMap::new();
    data.insert("recent_edits".into(), indicators.recent_edits.into());
    data.insert("unique_editors".into(), indicators.unique_editors.into());
    data.insert("revert_count".into(), indicators.revert_count.into());
    data.insert(
        "edit_frequency".into(),
        serde_json::json!(indicators.edit_frequency),
    );
    data.insert("conflict_severity".into(), label.into());
    if let Some(last_edit) = indicators.last_edit {
        data.insert("last_edit".into(), last_edit.to_rfc3339().into());
    }

    Some(Signal {
        kind: SignalType::EditWar,
        severity,
        description: format!(
            "Edit war indicators: {} edits by {} editors in 30 days, {} reverts",
            indicators.recent_edits, indicators.unique_editors, indicators.revert_count
        ),
        data,
    })
}

/// Article title from a /wiki/ URL, percent-decoded.
pub fn article_title(page_url: &str) -> Option<String> {
    let parsed = url::Url::parse(page_url).ok()?;
    let raw = parsed.path().strip_prefix("/wiki/")?;
    if raw.is_empty() {
        return None;
    }
    Some(percent_decode_str(raw).decode_utf8_lossy().into_owned())
}

/// Language code from the Wikipedia host, defaulting to "en".
pub fn article_lang(page_url: &str) -> String {
    url::Url::parse(page_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .and_then(|host| {
            host.strip_suffix(".wikipedia.org")
                .map(|lang| lang.to_string())
        })
        .filter(|lang| !lang.is_empty() && lang.len() <= 3)
        .unwrap_or_else(|| "en".to_string())
}
