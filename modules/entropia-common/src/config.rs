use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::EntropiaError;

pub const DEFAULT_USER_AGENT: &str = "entropia/0.1";

/// Full scanner configuration. Precedence: CLI flags > environment > config
/// file (~/.entropia/config.toml) > defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub http: HttpConfig,
    pub cache: CacheConfig,
    pub concurrency: ConcurrencyConfig,
    pub rate_limit: RateLimitConfig,
    pub authority: AuthorityConfig,
    pub scoring: ScoringConfig,
    pub llm: LlmConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Overall scan deadline in seconds.
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Max response bytes to read before the fetch is aborted.
    pub max_body_bytes: u64,
    /// Skip TLS certificate verification on the page fetch.
    pub insecure_tls: bool,
    /// Explicit proxies. Empty means fall back to HTTP_PROXY / HTTPS_PROXY.
    pub http_proxy: String,
    pub https_proxy: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        HttpConfig {
            timeout_secs: 120,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_body_bytes: 2_000_000,
            insecure_tls: false,
            http_proxy: String::new(),
            https_proxy: String::new(),
        }
    }
}

impl HttpConfig {
    /// Effective proxy for a scheme: explicit config wins, then environment.
    pub fn proxy_for(&self, scheme: &str) -> Option<String> {
        let explicit = match scheme {
            "https" => &self.https_proxy,
            _ => &self.http_proxy,
        };
        if !explicit.is_empty() {
            return Some(explicit.clone());
        }
        let var = match scheme {
            "https" => "HTTPS_PROXY",
            _ => "HTTP_PROXY",
        };
        std::env::var(var).ok().filter(|v| !v.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Cache directory. "~/" prefix expands to the home directory.
    pub dir: String,
    /// Entry time-to-live in seconds.
    pub ttl_secs: u64,
    /// Max entries held in the memory tier.
    pub memory_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            enabled: true,
            dir: "~/.entropia/cache".to_string(),
            ttl_secs: 24 * 3600,
            memory_entries: 256,
        }
    }
}

impl CacheConfig {
    /// Expand "~/" against $HOME. Relative fallback when HOME is unset.
    pub fn resolved_dir(&self) -> PathBuf {
        if let Some(rest) = self.dir.strip_prefix("~/") {
            if let Ok(home) = std::env::var("HOME") {
                return PathBuf::from(home).join(rest);
            }
        }
        PathBuf::from(&self.dir)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcurrencyConfig {
    /// Batch worker count.
    pub workers: usize,
    /// Max in-flight evidence probes per scan.
    pub validation_workers: usize,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        ConcurrencyConfig {
            workers: 4,
            validation_workers: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub requests_per_second: f64,
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        RateLimitConfig {
            requests_per_second: 2.0,
            burst_size: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathPattern {
    /// Regex matched against the URL path.
    pub pattern: String,
    /// "primary" | "secondary" | "tertiary".
    pub tier: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorityConfig {
    /// Exact host -> tier overrides, checked first.
    pub domain_map: std::collections::BTreeMap<String, String>,
    pub primary_domains: Vec<String>,
    pub secondary_domains: Vec<String>,
    pub path_patterns: Vec<PathPattern>,
}

impl Default for AuthorityConfig {
    fn default() -> Self {
        AuthorityConfig {
            domain_map: std::collections::BTreeMap::new(),
            primary_domains: vec![
                "gov.uk".to_string(),
                "legislation.gov.uk".to_string(),
                "justice.gov".to_string(),
                "europa.eu".to_string(),
                "un.org".to_string(),
                "who.int".to_string(),
                "nih.gov".to_string(),
                "ncbi.nlm.nih.gov".to_string(),
                "doi.org".to_string(),
                "jstor.org".to_string(),
                "nature.com".to_string(),
                "science.org".to_string(),
            ],
            secondary_domains: vec![
                "wikipedia.org".to_string(),
                "britannica.com".to_string(),
                "reuters.com".to_string(),
                "apnews.com".to_string(),
                "bbc.co.uk".to_string(),
                "bbc.com".to_string(),
                "nytimes.com".to_string(),
                "theguardian.com".to_string(),
                "economist.com".to_string(),
            ],
            path_patterns: vec![PathPattern {
                pattern: r"(?i)/(statute|legislation|act|regulation)s?/".to_string(),
                tier: "primary".to_string(),
            }],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Country/region tokens scanned for inside origin claims. Closed list;
    /// fixtures assume these defaults.
    pub conflict_terms: Vec<String>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        ScoringConfig {
            conflict_terms: [
                "malaysia",
                "indonesia",
                "england",
                "wales",
                "uk",
                "britain",
                "china",
                "india",
                "thailand",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// "openai" | "anthropic" | "ollama". Empty disables summaries.
    pub provider: String,
    pub model: String,
    /// Resolved from the environment, never stored in the config file.
    #[serde(skip)]
    pub api_key: String,
    pub base_url: String,
    pub timeout_secs: u64,
    /// Citation allowlist enforcement. Always on.
    pub strict_evidence: bool,
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        LlmConfig {
            provider: String::new(),
            model: String::new(),
            api_key: String::new(),
            base_url: String::new(),
            timeout_secs: 60,
            strict_evidence: true,
            max_tokens: 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub verbose: bool,
    pub include_footer: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            verbose: false,
            include_footer: true,
        }
    }
}

impl Config {
    /// Path of the user config file (~/.entropia/config.toml).
    pub fn default_path() -> Option<PathBuf> {
        std::env::var("HOME")
            .ok()
            .map(|home| PathBuf::from(home).join(".entropia").join("config.toml"))
    }

    /// Defaults merged with the config file when one exists.
    pub fn load() -> Result<Self, EntropiaError> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => Ok(Config::default()),
        }
    }

    pub fn from_file(path: &std::path::Path) -> Result<Self, EntropiaError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| EntropiaError::Config(format!("read {}: {e}", path.display())))?;
        toml::from_str(&raw)
            .map_err(|e| EntropiaError::Config(format!("parse {}: {e}", path.display())))
    }

    pub fn to_toml(&self) -> Result<String, EntropiaError> {
        toml::to_string_pretty(self).map_err(|e| EntropiaError::Config(e.to_string()))
    }
}
