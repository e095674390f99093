use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use crate::provider::{Completion, CompletionRequest, LlmError, Provider, Result};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

impl AnthropicProvider {
    pub fn new(api_key: &str, model: &str, base_url: &str, timeout: Duration) -> Result<Self> {
        if api_key.is_empty() {
            return Err(LlmError::MissingApiKey("Anthropic".to_string()));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: if base_url.is_empty() {
                DEFAULT_BASE_URL.to_string()
            } else {
                base_url.trim_end_matches('/').to_string()
            },
        })
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, req: &CompletionRequest) -> Result<Completion> {
        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": req.max_tokens,
            "system": req.system,
            "messages": [
                {"role": "user", "content": req.prompt},
            ],
        });

        let resp = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                provider: "anthropic".to_string(),
                status: status.as_u16(),
                message,
            });
        }

        let data: MessagesResponse = resp.json().await?;
        let text: String = data
            .content
            .iter()
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join("");
        if text.is_empty() {
            return Err(LlmError::EmptyCompletion("anthropic".to_string()));
        }

        let tokens_used = data
            .usage
            .map(|u| u.input_tokens + u.output_tokens)
            .unwrap_or(0);
        info!(model = %self.model, tokens_used, "Anthropic completion");

        Ok(Completion {
            text,
            model: self.model.clone(),
            tokens_used,
        })
    }

    async fn is_available(&self) -> bool {
        // No cheap unauthenticated health endpoint; a configured key is the
        // availability signal.
        !self.api_key.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_api_key_is_an_error() {
        let err = AnthropicProvider::new("", "claude-haiku-4-5", "", Duration::from_secs(5));
        assert!(matches!(err, Err(LlmError::MissingApiKey(_))));
    }

    #[test]
    fn messages_response_joins_content_blocks() {
        let json = r#"{
            "content": [{"type": "text", "text": "part one. "}, {"type": "text", "text": "part two."}],
            "usage": {"input_tokens": 100, "output_tokens": 50}
        }"#;
        let resp: MessagesResponse = serde_json::from_str(json).unwrap();
        let text: String = resp.content.iter().map(|b| b.text.as_str()).collect();
        assert_eq!(text, "part one. part two.");
        let usage = resp.usage.unwrap();
        assert_eq!(usage.input_tokens + usage.output_tokens, 150);
    }
}
