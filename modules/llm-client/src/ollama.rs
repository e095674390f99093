use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use crate::provider::{Completion, CompletionRequest, LlmError, Provider, Result};

const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Local Ollama endpoint. No API key; availability means the daemon answers.
pub struct OllamaProvider {
    client: reqwest::Client,
    model: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
    #[serde(default)]
    prompt_eval_count: u64,
    #[serde(default)]
    eval_count: u64,
}

impl OllamaProvider {
    pub fn new(model: &str, base_url: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            model: model.to_string(),
            base_url: if base_url.is_empty() {
                DEFAULT_BASE_URL.to_string()
            } else {
                base_url.trim_end_matches('/').to_string()
            },
        }
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, req: &CompletionRequest) -> Result<Completion> {
        let body = serde_json::json!({
            "model": self.model,
            "system": req.system,
            "prompt": req.prompt,
            "stream": false,
        });

        let resp = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                provider: "ollama".to_string(),
                status: status.as_u16(),
                message,
            });
        }

        let data: GenerateResponse = resp.json().await?;
        if data.response.is_empty() {
            return Err(LlmError::EmptyCompletion("ollama".to_string()));
        }

        let tokens_used = data.prompt_eval_count + data.eval_count;
        info!(model = %self.model, tokens_used, "Ollama completion");

        Ok(Completion {
            text: data.response,
            model: self.model.clone(),
            tokens_used,
        })
    }

    async fn is_available(&self) -> bool {
        let resp = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await;
        matches!(resp, Ok(r) if r.status().is_success())
    }
}
