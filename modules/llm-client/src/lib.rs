pub mod anthropic;
pub mod ollama;
pub mod openai;
pub mod provider;

pub use provider::{Completion, CompletionRequest, LlmError, Provider, Result};

use std::time::Duration;

/// Provider construction parameters. API keys come from the environment
/// (`OPENAI_API_KEY`, `ANTHROPIC_API_KEY`, `OLLAMA_BASE_URL`) when not set.
#[derive(Debug, Clone, Default)]
pub struct ProviderConfig {
    pub model: String,
    pub api_key: String,
    pub base_url: String,
    pub timeout: Option<Duration>,
}

/// Build a provider by name: "openai", "anthropic" (alias "claude"), "ollama".
pub fn build_provider(name: &str, cfg: ProviderConfig) -> Result<Box<dyn Provider>> {
    let timeout = cfg.timeout.unwrap_or(Duration::from_secs(60));

    match name {
        "openai" => {
            let api_key = non_empty(&cfg.api_key)
                .or_else(|| std::env::var("OPENAI_API_KEY").ok())
                .ok_or_else(|| LlmError::MissingApiKey("OpenAI".to_string()))?;
            Ok(Box::new(openai::OpenAiProvider::new(
                &api_key,
                &cfg.model,
                &cfg.base_url,
                timeout,
            )?))
        }
        "anthropic" | "claude" => {
            let api_key = non_empty(&cfg.api_key)
                .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
                .ok_or_else(|| LlmError::MissingApiKey("Anthropic".to_string()))?;
            Ok(Box::new(anthropic::AnthropicProvider::new(
                &api_key,
                &cfg.model,
                &cfg.base_url,
                timeout,
            )?))
        }
        "ollama" => {
            let base_url = non_empty(&cfg.base_url)
                .or_else(|| std::env::var("OLLAMA_BASE_URL").ok())
                .unwrap_or_default();
            Ok(Box::new(ollama::OllamaProvider::new(
                &cfg.model, &base_url, timeout,
            )))
        }
        other => Err(LlmError::UnknownProvider(other.to_string())),
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}
