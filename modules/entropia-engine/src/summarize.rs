//! Post-scoring LLM summary. Strict evidence mode is always on: the prompt
//! carries an allowlist of evidence URLs, anything cited outside it is
//! stripped from the output and recorded as a warning. The summary never
//! feeds back into the score.

use std::collections::HashSet;

use llm_client::{build_provider, CompletionRequest, LlmError, Provider, ProviderConfig};
use regex::Regex;
use tracing::{info, warn};

use entropia_common::config::LlmConfig;
use entropia_common::{LlmSummary, Report};

const SYSTEM_PROMPT: &str = "You summarize evidence-support scan reports. You describe how well a \
page's claims are supported by its cited sources. You never judge whether the claims are true. \
You may cite ONLY URLs from the provided evidence list, verbatim. Do not introduce outside \
sources or knowledge. Keep the summary under 300 words of plain Markdown.";

pub struct Summarizer {
    provider: Box<dyn Provider>,
    max_tokens: u32,
    url_pattern: Regex,
}

impl Summarizer {
    /// Build from config. An empty provider name disables summarization.
    pub fn from_config(config: &LlmConfig) -> Result<Option<Self>, LlmError> {
        if config.provider.is_empty() {
            return Ok(None);
        }

        let provider = build_provider(
            &config.provider,
            ProviderConfig {
                model: config.model.clone(),
                api_key: config.api_key.clone(),
                base_url: config.base_url.clone(),
                timeout: Some(std::time::Duration::from_secs(config.timeout_secs)),
            },
        )?;

        Ok(Some(Summarizer {
            provider,
            max_tokens: config.max_tokens,
            url_pattern: Regex::new(r#"https?://[^\s\)\]"'<>]+"#).expect("valid regex"),
        }))
    }

    /// Generate the summary for a finished report. Errors are the caller's to
    /// downgrade; this function never panics.
    pub async fn summarize(&self, report: &Report) -> Result<LlmSummary, LlmError> {
        if !self.provider.is_available().await {
            return Err(LlmError::Api {
                provider: self.provider.name().to_string(),
                status: 0,
                message: "provider unavailable".to_string(),
            });
        }

        let allowlist: Vec<&str> = report.evidence.iter().map(|e| e.url.as_str()).collect();
        let prompt = build_prompt(report, &allowlist);

        let completion = self
            .provider
            .complete(&CompletionRequest {
                system: SYSTEM_PROMPT.to_string(),
                prompt,
                max_tokens: self.max_tokens,
            })
            .await?;

        let allowed: HashSet<&str> = allowlist.iter().copied().collect();
        let (summary_md, cited_urls, warnings) =
            enforce_allowlist(&self.url_pattern, &completion.text, &allowed);

        info!(
            provider = self.provider.name(),
            model = %completion.model,
            cited = cited_urls.len(),
            leaks = warnings.len(),
            "LLM summary generated"
        );

        Ok(LlmSummary {
            enabled: true,
            provider: self.provider.name().to_string(),
            model: completion.model,
            strict_evidence: true,
            summary_md,
            cited_urls,
            tokens_used: completion.tokens_used,
            warnings,
        })
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn model_name(&self) -> &str {
        self.provider.model()
    }
}

fn build_prompt(report: &Report, allowlist: &[&str]) -> String {
    let mut prompt = String::new();
    prompt.push_str(&format!(
        "Subject: {}\nSource: {}\nSupport index: {}/100 (confidence: {})\n",
        report.subject, report.source_url, report.score.index, report.score.confidence
    ));

    prompt.push_str("\nSignals:\n");
    for signal in &report.score.signals {
        prompt.push_str(&format!(
            "- [{}] {}\n",
            signal.severity, signal.description
        ));
    }

    prompt.push_str("\nSample claims:\n");
    for claim in report.claims.iter().take(10) {
        prompt.push_str(&format!("- {}\n", claim.text));
    }

    prompt.push_str("\nEvidence URLs you may cite (no others):\n");
    for url in allowlist {
        prompt.push_str(&format!("- {url}\n"));
    }

    prompt.push_str("\nSummarize how well the claims are supported by the cited evidence.");
    prompt
}

/// Extract citations from the summary text; strip any outside the allowlist.
/// Returns the cleaned text, the cited allowlisted URLs, and warnings for
/// each leak removed.
fn enforce_allowlist(
    url_pattern: &Regex,
    text: &str,
    allowed: &HashSet<&str>,
) -> (String, Vec<String>, Vec<String>) {
    let mut cited: Vec<String> = Vec::new();
    let mut warnings = Vec::new();
    let mut cleaned = text.to_string();

    for found in url_pattern.find_iter(text) {
        // Trailing punctuation is prose, not URL.
        let url = found.as_str().trim_end_matches(['.', ',', ';']);
        if allowed.contains(url) {
            if !cited.iter().any(|c| c == url) {
                cited.push(url.to_string());
            }
        } else {
            warn!(url, "LLM cited a URL outside the evidence allowlist");
            warnings.push(format!("citation outside evidence allowlist removed: {url}"));
            cleaned = cleaned.replace(url, "[link removed]");
        }
    }

    (cleaned, cited, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern() -> Regex {
        Regex::new(r#"https?://[^\s\)\]"'<>]+"#).unwrap()
    }

    #[test]
    fn allowlisted_citations_survive() {
        let allowed: HashSet<&str> = ["https://a.test/1", "https://b.test/2"]
            .into_iter()
            .collect();
        let text = "Supported by https://a.test/1 and https://b.test/2.";
        let (cleaned, cited, warnings) = enforce_allowlist(&pattern(), text, &allowed);

        assert_eq!(cleaned, text);
        assert_eq!(cited, vec!["https://a.test/1", "https://b.test/2"]);
        assert!(warnings.is_empty());
    }

    #[test]
    fn leaked_citations_are_stripped_and_warned() {
        let allowed: HashSet<&str> = ["https://a.test/1"].into_iter().collect();
        let text = "See https://a.test/1 but also https://evil.test/made-up for details.";
        let (cleaned, cited, warnings) = enforce_allowlist(&pattern(), text, &allowed);

        assert!(cleaned.contains("https://a.test/1"));
        assert!(!cleaned.contains("evil.test"));
        assert!(cleaned.contains("[link removed]"));
        assert_eq!(cited, vec!["https://a.test/1"]);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("https://evil.test/made-up"));
    }

    #[test]
    fn duplicate_citations_count_once() {
        let allowed: HashSet<&str> = ["https://a.test/1"].into_iter().collect();
        let text = "https://a.test/1 and again https://a.test/1";
        let (_, cited, _) = enforce_allowlist(&pattern(), text, &allowed);
        assert_eq!(cited.len(), 1);
    }

    #[test]
    fn empty_provider_disables_summaries() {
        let summarizer = Summarizer::from_config(&LlmConfig::default()).unwrap();
        assert!(summarizer.is_none());
    }
}
