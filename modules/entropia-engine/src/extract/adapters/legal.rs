use scraper::{ElementRef, Html, Selector};

use entropia_common::{Claim, Evidence};

use super::Adapter;
use crate::extract::claims::{claims_from_sentences, dedupe_claims};
use crate::extract::text::{split_sentences, visible_text_of};

const LEGAL_KEYWORDS: [&str; 10] = [
    "shall",
    "must",
    "is required",
    "is defined as",
    "under this act",
    "under the law",
    "according to",
    "statute",
    "regulation",
    "provision",
];

const LEGAL_DOMAINS: [&str; 4] = [
    "legislation.gov.uk",
    "law.cornell.edu",
    "gov.uk",
    "justice.gov",
];

const LEGAL_PATH_MARKERS: [&str; 4] = ["/statute", "/legal", "/law", "/regulation"];

/// Adapter for statutes and legal documents. Claims come from the main
/// content region with a legal keyword set; evidence extraction is deferred
/// until a legal-citation grammar exists, so it is always empty.
pub struct LegalAdapter {
    main_selector: Selector,
    block_selector: Selector,
}

impl LegalAdapter {
    pub fn new() -> Self {
        LegalAdapter {
            main_selector: Selector::parse("main, article, [role=\"main\"]")
                .expect("valid selector"),
            block_selector: Selector::parse("p, section, div").expect("valid selector"),
        }
    }

    fn main_content<'a>(&self, doc: &'a Html) -> ElementRef<'a> {
        doc.select(&self.main_selector)
            .next()
            .unwrap_or_else(|| doc.root_element())
    }
}

impl Default for LegalAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Adapter for LegalAdapter {
    fn name(&self) -> &str {
        "legal"
    }

    fn can_handle(&self, url: &str, _content_type: &str) -> bool {
        let lower = url.to_lowercase();
        LEGAL_DOMAINS.iter().any(|d| lower.contains(d))
            || LEGAL_PATH_MARKERS.iter().any(|m| lower.contains(m))
    }

    fn extract_claims(&self, doc: &Html, _url: &str) -> Vec<Claim> {
        let content = self.main_content(doc);

        let mut claims = Vec::new();
        for (index, block) in content.select(&self.block_selector).enumerate() {
            let text = visible_text_of(block);
            let sentences = split_sentences(&text);
            for mut claim in claims_from_sentences(&sentences, &LEGAL_KEYWORDS, "legal") {
                claim.sentence = index;
                claims.push(claim);
            }
        }

        dedupe_claims(claims)
    }

    /// Deferred: legal citations need specialized parsing (statutory
    /// references, reporter formats). Until then this returns nothing and
    /// must not fall back to the generic extractor.
    fn extract_evidence(&self, _doc: &Html, _url: &str) -> Vec<Evidence> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_legal_domains_and_paths() {
        let adapter = LegalAdapter::new();
        assert!(adapter.can_handle("https://www.legislation.gov.uk/ukpga/2018/12", ""));
        assert!(adapter.can_handle("https://www.law.cornell.edu/uscode/text/17", ""));
        assert!(adapter.can_handle("https://state.example.com/statutes/ch5", ""));
        assert!(!adapter.can_handle("https://example.com/recipes", ""));
    }

    #[test]
    fn claims_come_from_main_content_only() {
        let adapter = LegalAdapter::new();
        let doc = Html::parse_document(
            r#"<html><body>
                <nav><p>Subscribers must register before the end of the month to vote.</p></nav>
                <main>
                    <p>The licensee shall maintain records of each transaction for six years.</p>
                </main>
            </body></html>"#,
        );
        let claims = adapter.extract_claims(&doc, "https://www.legislation.gov.uk/x");
        assert_eq!(claims.len(), 1);
        assert!(claims[0].text.starts_with("The licensee shall"));
        assert_eq!(claims[0].heuristic, "legal:shall");
    }

    #[test]
    fn falls_back_to_whole_document_without_main() {
        let adapter = LegalAdapter::new();
        let doc = Html::parse_document(
            "<html><body><p>Each operator must file an annual compliance report.</p></body></html>",
        );
        let claims = adapter.extract_claims(&doc, "https://state.example.com/law/ops");
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].heuristic, "legal:must");
    }

    #[test]
    fn evidence_is_intentionally_empty() {
        let adapter = LegalAdapter::new();
        let doc = Html::parse_document(
            r#"<main><a href="https://www.legislation.gov.uk/other">See also</a></main>"#,
        );
        assert!(adapter
            .extract_evidence(&doc, "https://www.legislation.gov.uk/x")
            .is_empty());
    }
}
