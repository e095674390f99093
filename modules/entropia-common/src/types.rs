use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// --- Claims ---

/// A factual assertion extracted from the scanned page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claim {
    /// The claim sentence, trimmed, 30-500 chars.
    pub text: String,
    /// Which extraction rule matched, e.g. "keyword:originated".
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub heuristic: String,
    /// Sentence index within the extracted text (0-based).
    #[serde(default)]
    pub sentence: usize,
}

// --- Evidence ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceKind {
    /// Formal citation (e.g. Wikipedia references).
    Citation,
    /// Outbound link.
    ExternalLink,
    /// Named reference or footnote.
    Reference,
}

/// A cited source or outbound reference found on the page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Evidence {
    pub url: String,
    pub kind: EvidenceKind,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub host: String,
    pub is_same_host: bool,
    /// Authority classification, filled in by validation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authority: Option<AuthorityTier>,
    /// Link anchor text.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
}

// --- Authority ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuthorityTier {
    #[default]
    Unknown,
    /// Laws, statutes, academic papers, official documents.
    Primary,
    /// Encyclopedias, major publishers, reputable media.
    Secondary,
    /// Blogs, personal websites, tourism sites.
    Tertiary,
}

impl AuthorityTier {
    /// Scoring weight: primary 3, secondary 2, tertiary 1, unknown 0.
    pub fn weight(self) -> u32 {
        match self {
            AuthorityTier::Primary => 3,
            AuthorityTier::Secondary => 2,
            AuthorityTier::Tertiary => 1,
            AuthorityTier::Unknown => 0,
        }
    }
}

impl std::fmt::Display for AuthorityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthorityTier::Unknown => write!(f, "unknown"),
            AuthorityTier::Primary => write!(f, "primary"),
            AuthorityTier::Secondary => write!(f, "secondary"),
            AuthorityTier::Tertiary => write!(f, "tertiary"),
        }
    }
}

// --- Validation ---

/// Outcome of probing one evidence URL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationResult {
    pub url: String,
    pub is_accessible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
    /// Days since Last-Modified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_days: Option<i64>,
    /// More than 1 year old.
    pub is_stale: bool,
    /// More than 3 years old.
    pub is_very_stale: bool,
    /// 404, 410, or the network call failed.
    pub is_dead: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    pub authority: AuthorityTier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ValidationResult {
    /// Placeholder emitted when cancellation lands before the probe starts.
    pub fn cancelled(url: &str, authority: AuthorityTier) -> Self {
        ValidationResult {
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
            error: Some("context cancelled".to_string()),
        }
    }
}

// --- Fetch metadata ---

/// TLS/certificate details captured during the page fetch.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct TlsInfo {
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub subject: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub issuer: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub not_before: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub not_after: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dns_names: Vec<String>,
    pub expired: bool,
    /// Issuer equals subject.
    pub self_signed: bool,
    /// Certificate does not cover the URL hostname.
    pub domain_mismatch: bool,
}

/// HTTP metadata from fetching the source page.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct FetchMeta {
    pub status_code: u16,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub content_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub last_modified: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub etag: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    pub tls: TlsInfo,
}

// --- Signals & score ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalType {
    EvidenceCoverage,
    AuthorityDistribution,
    Freshness,
    Accessibility,
    Conflict,
    FreshnessAnomaly,
    NoTls,
    ExpiredCertificate,
    SelfSignedCertificate,
    CertificateMismatch,
    EditWar,
    HistoricalEntity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// A diagnostic entry. `data` carries every scalar that fed the judgment plus
/// the literal formula string, so a reader can recompute the sub-score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Signal {
    #[serde(rename = "type")]
    pub kind: SignalType,
    pub severity: Severity,
    pub description: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confidence {
    #[serde(rename = "low")]
    Low,
    #[serde(rename = "low-medium")]
    LowMedium,
    #[serde(rename = "medium")]
    Medium,
    #[serde(rename = "high")]
    High,
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Confidence::Low => write!(f, "low"),
            Confidence::LowMedium => write!(f, "low-medium"),
            Confidence::Medium => write!(f, "medium"),
            Confidence::High => write!(f, "high"),
        }
    }
}

/// Transparent scoring breakdown.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Score {
    /// Overall support index, 0-100.
    pub index: i32,
    pub confidence: Confidence,
    /// Whether conflicting origin claims were detected.
    pub conflict: bool,
    pub signals: Vec<Signal>,
}

// --- Report ---

/// Which core principles were applied. Always all three.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Principles {
    /// Evaluates support, not truth.
    pub non_normative: bool,
    /// All scoring explainable from recorded inputs.
    pub transparent: bool,
    /// Same rules for all sources.
    pub symmetric: bool,
}

impl Default for Principles {
    fn default() -> Self {
        Principles {
            non_normative: true,
            transparent: true,
            symmetric: true,
        }
    }
}

/// Optional LLM-generated summary. Produced after scoring; never feeds back
/// into the score.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct LlmSummary {
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub provider: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub model: String,
    /// Whether citation enforcement was enabled (always true in practice).
    pub strict_evidence: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub summary_md: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cited_urls: Vec<String>,
    #[serde(default)]
    pub tokens_used: u64,
    /// Issues encountered during generation, e.g. citation leaks stripped.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// The complete scan report. Assembled by exactly one pipeline invocation and
/// immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Report {
    /// Human-readable subject derived from the URL, e.g. "Laksa".
    pub subject: String,
    pub source_url: String,
    pub fetched_at: DateTime<Utc>,
    pub fetch_meta: FetchMeta,
    pub claims: Vec<Claim>,
    pub evidence: Vec<Evidence>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation: Vec<ValidationResult>,
    pub score: Score,
    pub principles: Principles,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm: Option<LlmSummary>,
}
