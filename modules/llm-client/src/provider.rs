use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{provider} API returned status {status}: {message}")]
    Api {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("{0} API key not set")]
    MissingApiKey(String),

    #[error("unknown LLM provider: {0}")]
    UnknownProvider(String),

    #[error("empty completion from {0}")]
    EmptyCompletion(String),
}

pub type Result<T> = std::result::Result<T, LlmError>;

/// A single chat-completion request. Prompt construction and citation policy
/// live with the caller; providers only move text.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: String,
    pub prompt: String,
    pub max_tokens: u32,
}

#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub model: String,
    pub tokens_used: u64,
}

#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;

    fn model(&self) -> &str;

    async fn complete(&self, req: &CompletionRequest) -> Result<Completion>;

    /// Whether the provider is configured and reachable. Callers downgrade an
    /// unavailable provider to a warning rather than failing.
    async fn is_available(&self) -> bool;
}
