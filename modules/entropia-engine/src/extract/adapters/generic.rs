use scraper::Html;

use entropia_common::{Claim, Evidence};

use super::Adapter;
use crate::extract::{claims, evidence};

/// Fallback adapter for domains nothing else recognises.
pub struct GenericAdapter;

impl GenericAdapter {
    pub fn new() -> Self {
        GenericAdapter
    }
}

impl Default for GenericAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Adapter for GenericAdapter {
    fn name(&self) -> &str {
        "generic"
    }

    fn can_handle(&self, _url: &str, _content_type: &str) -> bool {
        true
    }

    fn extract_claims(&self, doc: &Html, _url: &str) -> Vec<Claim> {
        claims::extract_claims(doc)
    }

    fn extract_evidence(&self, doc: &Html, url: &str) -> Vec<Evidence> {
        evidence::extract_evidence(doc, url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_anything() {
        let adapter = GenericAdapter::new();
        assert!(adapter.can_handle("https://anything.test/", "text/html"));
        assert!(adapter.can_handle("not even a url", ""));
    }

    #[test]
    fn extracts_claims_and_evidence_from_simple_page() {
        let adapter = GenericAdapter::new();
        let doc = Html::parse_document(
            r#"<html><body>
                <p>The festival was established in 1987 by a group of local musicians.</p>
                <a href="https://archive.example.org/festival">archive</a>
            </body></html>"#,
        );
        let claims = adapter.extract_claims(&doc, "https://example.com/fest");
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].heuristic, "keyword:established");

        let evidence = adapter.extract_evidence(&doc, "https://example.com/fest");
        assert_eq!(evidence.len(), 1);
        assert_eq!(evidence[0].url, "https://archive.example.org/festival");
    }
}
