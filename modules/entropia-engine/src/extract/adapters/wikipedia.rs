use scraper::{ElementRef, Html, Selector};
use url::Url;

use entropia_common::{Claim, Evidence, EvidenceKind};

use super::Adapter;
use crate::extract::claims::{claims_from_sentences, dedupe_claims};
use crate::extract::evidence::{
    anchor_text, dedupe_evidence, is_wikipedia_navigation, resolve_href,
};
use crate::extract::text::{split_sentences, visible_text_of};

const WIKI_KEYWORDS: [&str; 12] = [
    "originated",
    "origin",
    "first",
    "introduced",
    "invented",
    "according to",
    "is defined as",
    "established",
    "founded",
    "created",
    "discovered",
    "developed",
];

/// Section headings worth mining for claims beyond the lead.
const CLAIM_SECTIONS: [&str; 3] = ["origin", "history", "etymology"];

/// Adapter for Wikipedia articles: claims from the lead and
/// origin/history/etymology sections, evidence from resolved footnote
/// citations, "External links" sections and `a.external` anchors, with the
/// navigation filter applied last.
pub struct WikipediaAdapter {
    parser_output_selector: Selector,
    content_text_selector: Selector,
    heading_selector: Selector,
    h2_selector: Selector,
    paragraph_selector: Selector,
    footnote_selector: Selector,
    external_anchor_selector: Selector,
    any_anchor_selector: Selector,
}

impl WikipediaAdapter {
    pub fn new() -> Self {
        WikipediaAdapter {
            parser_output_selector: Selector::parse("div.mw-parser-output")
                .expect("valid selector"),
            content_text_selector: Selector::parse("#mw-content-text").expect("valid selector"),
            heading_selector: Selector::parse("h2, h3").expect("valid selector"),
            h2_selector: Selector::parse("h2").expect("valid selector"),
            paragraph_selector: Selector::parse("p").expect("valid selector"),
            footnote_selector: Selector::parse("sup.reference a, a.reference")
                .expect("valid selector"),
            external_anchor_selector: Selector::parse("a.external").expect("valid selector"),
            any_anchor_selector: Selector::parse("a[href]").expect("valid selector"),
        }
    }

    /// The parser-output div holds the article body; older markup only has
    /// the `#mw-content-text` wrapper.
    fn content<'a>(&self, doc: &'a Html) -> ElementRef<'a> {
        doc.select(&self.parser_output_selector)
            .next()
            .or_else(|| doc.select(&self.content_text_selector).next())
            .unwrap_or_else(|| doc.root_element())
    }

    /// Direct-child paragraphs of the content root before the first heading.
    /// Infoboxes and navboxes are tables, so taking only `<p>` drops them.
    fn lead_paragraphs<'a>(&self, content: ElementRef<'a>) -> Vec<ElementRef<'a>> {
        let mut paragraphs = Vec::new();
        for child in content.children() {
            let Some(el) = ElementRef::wrap(child) else {
                continue;
            };
            let name = el.value().name();
            if name == "h2" || el.select(&self.h2_selector).next().is_some() {
                break;
            }
            if name == "p" {
                paragraphs.push(el);
            }
        }
        paragraphs
    }

    /// Paragraphs between a heading and the next heading of the same kind.
    /// Modern article markup wraps headings in `div.mw-heading`, so the walk
    /// starts from the wrapper when there is one.
    fn section_paragraphs<'a>(&self, heading: ElementRef<'a>) -> Vec<ElementRef<'a>> {
        let start = heading
            .parent()
            .and_then(ElementRef::wrap)
            .filter(|parent| {
                parent
                    .value()
                    .attr("class")
                    .is_some_and(|c| c.contains("mw-heading"))
            })
            .unwrap_or(heading);

        let mut paragraphs = Vec::new();
        for sibling in start.next_siblings() {
            let Some(el) = ElementRef::wrap(sibling) else {
                continue;
            };
            let name = el.value().name();
            if matches!(name, "h2" | "h3")
                || el.select(&self.heading_selector).next().is_some() && name == "div"
            {
                break;
            }
            if name == "p" {
                paragraphs.push(el);
            } else {
                paragraphs.extend(el.select(&self.paragraph_selector));
            }
        }
        paragraphs
    }

    /// Section elements (not just paragraphs) after a heading, for link
    /// harvesting in "External links" / "Further reading".
    fn section_elements<'a>(&self, heading: ElementRef<'a>) -> Vec<ElementRef<'a>> {
        let start = heading
            .parent()
            .and_then(ElementRef::wrap)
            .filter(|parent| {
                parent
                    .value()
                    .attr("class")
                    .is_some_and(|c| c.contains("mw-heading"))
            })
            .unwrap_or(heading);

        let mut elements = Vec::new();
        for sibling in start.next_siblings() {
            let Some(el) = ElementRef::wrap(sibling) else {
                continue;
            };
            let name = el.value().name();
            if matches!(name, "h2" | "h3")
                || el.select(&self.heading_selector).next().is_some() && name == "div"
            {
                break;
            }
            elements.push(el);
        }
        elements
    }

    fn claims_from_paragraphs(&self, paragraphs: &[ElementRef<'_>]) -> Vec<Claim> {
        let mut claims = Vec::new();
        for (index, paragraph) in paragraphs.iter().enumerate() {
            let text = visible_text_of(*paragraph);
            let sentences = split_sentences(&text);
            for mut claim in claims_from_sentences(&sentences, &WIKI_KEYWORDS, "wikipedia") {
                claim.sentence = index;
                claims.push(claim);
            }
        }
        claims
    }

    /// Resolve a `#cite_note-...` footnote to its citation block and harvest
    /// the external links inside.
    fn footnote_evidence(&self, doc: &Html, base: &Url) -> Vec<Evidence> {
        let mut evidence = Vec::new();

        for footnote in doc.select(&self.footnote_selector) {
            let Some(href) = footnote.value().attr("href") else {
                continue;
            };
            let Some(target_id) = href.strip_prefix('#') else {
                continue;
            };
            let Some(target) = find_by_id(doc, target_id) else {
                continue;
            };

            for link in target.select(&self.external_anchor_selector) {
                let Some(link_href) = link.value().attr("href") else {
                    continue;
                };
                let Some(resolved) = resolve_href(base, link_href) else {
                    continue;
                };
                let host = resolved.host_str().unwrap_or_default().to_string();
                evidence.push(Evidence {
                    url: resolved.to_string(),
                    kind: EvidenceKind::Citation,
                    host,
                    is_same_host: false,
                    authority: None,
                    text: anchor_text(&link),
                });
            }
        }

        evidence
    }
}

impl Default for WikipediaAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Adapter for WikipediaAdapter {
    fn name(&self) -> &str {
        "wikipedia"
    }

    fn can_handle(&self, url: &str, _content_type: &str) -> bool {
        url.contains("wikipedia.org")
    }

    fn extract_claims(&self, doc: &Html, _url: &str) -> Vec<Claim> {
        let content = self.content(doc);

        let mut claims = self.claims_from_paragraphs(&self.lead_paragraphs(content));

        for heading in content.select(&self.heading_selector) {
            let text = visible_text_of(heading).to_lowercase();
            if CLAIM_SECTIONS.iter().any(|s| text.contains(s)) {
                let paragraphs = self.section_paragraphs(heading);
                claims.extend(self.claims_from_paragraphs(&paragraphs));
            }
        }

        dedupe_claims(claims)
    }

    fn extract_evidence(&self, doc: &Html, url: &str) -> Vec<Evidence> {
        let Ok(base) = Url::parse(url) else {
            return Vec::new();
        };

        let mut evidence = self.footnote_evidence(doc, &base);

        // "External links" and "Further reading" sections.
        for heading in doc.select(&self.heading_selector) {
            let text = visible_text_of(heading).to_lowercase();
            if !(text.contains("external link") || text.contains("further reading")) {
                continue;
            }
            for element in self.section_elements(heading) {
                for link in element.select(&self.any_anchor_selector) {
                    let Some(href) = link.value().attr("href") else {
                        continue;
                    };
                    if href.starts_with('#') {
                        continue;
                    }
                    let Some(resolved) = resolve_href(&base, href) else {
                        continue;
                    };
                    let host = resolved.host_str().unwrap_or_default().to_string();
                    evidence.push(Evidence {
                        url: resolved.to_string(),
                        kind: EvidenceKind::ExternalLink,
                        is_same_host: !host.is_empty()
                            && Some(host.as_str()) == base.host_str(),
                        host,
                        authority: None,
                        text: anchor_text(&link),
                    });
                }
            }
        }

        // Anything classed `external` elsewhere in the body.
        for link in doc.select(&self.external_anchor_selector) {
            let Some(href) = link.value().attr("href") else {
                continue;
            };
            if href.starts_with('#') {
                continue;
            }
            let Some(resolved) = resolve_href(&base, href) else {
                continue;
            };
            let host = resolved.host_str().unwrap_or_default().to_string();
            evidence.push(Evidence {
                url: resolved.to_string(),
                kind: EvidenceKind::ExternalLink,
                host,
                is_same_host: false,
                authority: None,
                text: anchor_text(&link),
            });
        }

        let filtered = evidence
            .into_iter()
            .filter(|ev| {
                Url::parse(&ev.url)
                    .map(|resolved| !is_wikipedia_navigation(&resolved, &base))
                    .unwrap_or(false)
            })
            .collect();

        dedupe_evidence(filtered)
    }
}

/// Linear scan for an element with the given id. Citation ids contain
/// characters that break selector parsing, so attribute comparison it is.
fn find_by_id<'a>(doc: &'a Html, id: &str) -> Option<ElementRef<'a>> {
    let mut stack = vec![doc.tree.root()];
    while let Some(node) = stack.pop() {
        if let Some(el) = ElementRef::wrap(node) {
            if el.value().attr("id") == Some(id) {
                return Some(el);
            }
        }
        let children: Vec<_> = node.children().collect();
        for child in children.into_iter().rev() {
            stack.push(child);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTICLE_URL: &str = "https://en.wikipedia.org/wiki/Borscht";

    fn article() -> Html {
        Html::parse_document(
            r##"<html><body><div id="mw-content-text"><div class="mw-parser-output">
                <table class="infobox"><tr><td>
                    The infobox says borscht was invented somewhere else entirely, in a table.
                </td></tr></table>
                <p>Borscht is a sour soup that originated in the territories of Eastern Europe.
                   It is often served hot with smetana and fresh rye bread on the side.<sup class="reference"><a href="#cite_note-1">[1]</a></sup></p>
                <div class="mw-heading"><h2>History</h2></div>
                <p>The dish was first recorded in written sources during the sixteenth century.</p>
                <div class="mw-heading"><h2>Preparation</h2></div>
                <p>Beets are simmered slowly together with root vegetables and plenty of dill.</p>
                <div class="mw-heading"><h2>References</h2></div>
                <ol>
                    <li id="cite_note-1">
                        <a class="external text" href="https://www.foodhistory.org/borscht">Food history of borscht</a>
                    </li>
                </ol>
                <div class="mw-heading"><h2>External links</h2></div>
                <ul>
                    <li><a href="https://www.soupmuseum.example/borscht">Soup museum</a></li>
                    <li><a href="/wiki/Main_Page">Main page</a></li>
                </ul>
                <p>
                    <a href="/wiki/Special:Random">Random</a>
                    <a href="/wiki/Help:Contents">Help</a>
                    <a href="/w/index.php?title=Borscht&action=history">History tab</a>
                    <a href="/wiki/Borscht">Self link</a>
                    <a href="/wiki/Beetroot">Beetroot</a>
                </p>
            </div></div></body></html>"##,
        )
    }

    #[test]
    fn handles_any_wikipedia_language() {
        let adapter = WikipediaAdapter::new();
        assert!(adapter.can_handle("https://en.wikipedia.org/wiki/Laksa", ""));
        assert!(adapter.can_handle("https://uk.wikipedia.org/wiki/Борщ", ""));
        assert!(!adapter.can_handle("https://example.com/wiki/Laksa", ""));
    }

    #[test]
    fn claims_come_from_lead_and_history_sections_only() {
        let adapter = WikipediaAdapter::new();
        let claims = adapter.extract_claims(&article(), ARTICLE_URL);

        let texts: Vec<_> = claims.iter().map(|c| c.text.as_str()).collect();
        assert!(texts.iter().any(|t| t.contains("originated in the territories")));
        assert!(texts.iter().any(|t| t.contains("first recorded in written sources")));
        // Infobox text and non-matching sections contribute nothing.
        assert!(!texts.iter().any(|t| t.contains("infobox")));
        assert!(!texts.iter().any(|t| t.contains("simmered")));
    }

    #[test]
    fn claim_heuristics_carry_wikipedia_scope() {
        let adapter = WikipediaAdapter::new();
        let claims = adapter.extract_claims(&article(), ARTICLE_URL);
        assert!(claims.iter().all(|c| c.heuristic.starts_with("wikipedia:")));
    }

    #[test]
    fn footnotes_resolve_to_backing_citations() {
        let adapter = WikipediaAdapter::new();
        let evidence = adapter.extract_evidence(&article(), ARTICLE_URL);
        let citation = evidence
            .iter()
            .find(|e| e.url == "https://www.foodhistory.org/borscht")
            .expect("footnote citation resolved");
        assert_eq!(citation.kind, EvidenceKind::Citation);
        assert_eq!(citation.text, "Food history of borscht");
    }

    #[test]
    fn external_links_section_is_harvested() {
        let adapter = WikipediaAdapter::new();
        let evidence = adapter.extract_evidence(&article(), ARTICLE_URL);
        let external = evidence
            .iter()
            .find(|e| e.url == "https://www.soupmuseum.example/borscht")
            .expect("external links section harvested");
        assert_eq!(external.kind, EvidenceKind::ExternalLink);
    }

    #[test]
    fn navigation_and_self_links_are_rejected() {
        let adapter = WikipediaAdapter::new();
        let evidence = adapter.extract_evidence(&article(), ARTICLE_URL);
        let urls: Vec<_> = evidence.iter().map(|e| e.url.as_str()).collect();

        assert!(!urls.iter().any(|u| u.contains("Main_Page")));
        assert!(!urls.iter().any(|u| u.contains("Special:")));
        assert!(!urls.iter().any(|u| u.contains("Help:")));
        assert!(!urls.iter().any(|u| u.contains("/w/index.php")));
        assert!(!urls.iter().any(|u| u.ends_with("/wiki/Borscht")));
        // Ordinary article links survive the filter.
        assert!(urls.iter().any(|u| u.ends_with("/wiki/Beetroot")));
    }

    #[test]
    fn find_by_id_handles_awkward_ids() {
        let doc = Html::parse_document(r#"<p id="cite_note-:0-3">target</p>"#);
        let found = find_by_id(&doc, "cite_note-:0-3").expect("found");
        assert_eq!(visible_text_of(found), "target");
    }
}
