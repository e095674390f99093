pub mod batch;
pub mod config;
pub mod scan;

use anyhow::{bail, Result};
use clap::Args;

use entropia_common::Config;

/// HTTP flags shared by scan and batch.
#[derive(Args, Clone)]
pub struct HttpFlags {
    /// HTTP User-Agent
    #[arg(long)]
    pub ua: Option<String>,

    /// Max response bytes to read
    #[arg(long = "max-bytes")]
    pub max_bytes: Option<u64>,

    /// Disable the report cache (force fresh fetch)
    #[arg(long = "no-cache")]
    pub no_cache: bool,

    /// Skip TLS certificate verification (for self-signed certs)
    #[arg(long)]
    pub insecure: bool,

    /// HTTP proxy URL (overrides HTTP_PROXY)
    #[arg(long = "http-proxy")]
    pub http_proxy: Option<String>,

    /// HTTPS proxy URL (overrides HTTPS_PROXY)
    #[arg(long = "https-proxy")]
    pub https_proxy: Option<String>,
}

/// LLM flags shared by scan and batch.
#[derive(Args, Clone)]
pub struct LlmFlags {
    /// Enable LLM summary generation
    #[arg(long)]
    pub llm: bool,

    /// LLM provider (openai, anthropic, ollama)
    #[arg(long = "llm-provider", default_value = "openai")]
    pub llm_provider: String,

    /// LLM model name
    #[arg(long = "llm-model", default_value = "gpt-4o-mini")]
    pub llm_model: String,
}

pub fn apply_http_flags(config: &mut Config, flags: &HttpFlags) {
    if let Some(ua) = &flags.ua {
        config.http.user_agent = ua.clone();
    }
    if let Some(max_bytes) = flags.max_bytes {
        config.http.max_body_bytes = max_bytes;
    }
    if flags.no_cache {
        config.cache.enabled = false;
    }
    if flags.insecure {
        config.http.insecure_tls = true;
    }
    if let Some(proxy) = &flags.http_proxy {
        config.http.http_proxy = proxy.clone();
    }
    if let Some(proxy) = &flags.https_proxy {
        config.http.https_proxy = proxy.clone();
    }
}

/// Wire LLM settings, resolving the API key from the environment. The key is
/// passed through unopened; a missing key for a keyed provider is fatal.
pub fn apply_llm_flags(config: &mut Config, flags: &LlmFlags) -> Result<()> {
    if !flags.llm {
        return Ok(());
    }

    config.llm.provider = flags.llm_provider.clone();
    config.llm.model = flags.llm_model.clone();
    config.llm.strict_evidence = true;

    match flags.llm_provider.as_str() {
        "openai" => {
            config.llm.api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
            if config.llm.api_key.is_empty() {
                bail!("OPENAI_API_KEY environment variable not set");
            }
        }
        "anthropic" | "claude" => {
            config.llm.api_key = std::env::var("ANTHROPIC_API_KEY").unwrap_or_default();
            if config.llm.api_key.is_empty() {
                bail!("ANTHROPIC_API_KEY environment variable not set");
            }
        }
        "ollama" => {
            if let Ok(base_url) = std::env::var("OLLAMA_BASE_URL") {
                config.llm.base_url = base_url;
            }
        }
        other => bail!("unknown LLM provider: {other}"),
    }

    Ok(())
}
