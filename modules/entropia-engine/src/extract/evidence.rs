//! Generic evidence extraction: every anchor, resolved against the base URL,
//! classified by kind, deduplicated by exact URL string.

use std::collections::HashSet;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use entropia_common::{Evidence, EvidenceKind};

/// Wikipedia navigation/UI path prefixes that are never evidence.
const WIKI_NAV_PREFIXES: [&str; 11] = [
    "/wiki/Main_Page",
    "/wiki/Wikipedia:",
    "/wiki/Portal:",
    "/wiki/Special:",
    "/wiki/Help:",
    "/wiki/Talk:",
    "/wiki/File:",
    "/wiki/Template:",
    "/wiki/Template_talk:",
    "/wiki/Category:",
    "/w/index.php",
];

/// Extract evidence links from the whole document.
pub fn extract_evidence(doc: &Html, source_url: &str) -> Vec<Evidence> {
    let Ok(base) = Url::parse(source_url) else {
        return Vec::new();
    };

    let anchor_selector = Selector::parse("a").expect("valid selector");
    let mut evidence = Vec::new();

    for anchor in doc.select(&anchor_selector) {
        let Some(href) = anchor.value().attr("href").map(str::trim) else {
            continue;
        };
        let Some(resolved) = resolve_href(&base, href) else {
            continue;
        };
        if is_wikipedia_navigation(&resolved, &base) {
            continue;
        }

        let host = resolved.host_str().unwrap_or_default().to_string();
        evidence.push(Evidence {
            url: resolved.to_string(),
            kind: classify_kind(href, &anchor),
            is_same_host: !host.is_empty() && Some(host.as_str()) == base.host_str(),
            host,
            authority: None,
            text: anchor_text(&anchor),
        });
    }

    dedupe_evidence(evidence)
}

/// Resolve an href against the base. Anchors, javascript:, mailto: and
/// non-http(s) schemes are discarded.
pub fn resolve_href(base: &Url, href: &str) -> Option<Url> {
    if href.is_empty()
        || href.starts_with('#')
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
    {
        return None;
    }

    let resolved = base.join(href).ok()?;
    if resolved.scheme() != "http" && resolved.scheme() != "https" {
        return None;
    }
    Some(resolved)
}

/// First text chunk inside the anchor.
pub fn anchor_text(anchor: &ElementRef<'_>) -> String {
    anchor
        .text()
        .map(str::trim)
        .find(|t| !t.is_empty())
        .unwrap_or_default()
        .to_string()
}

pub fn classify_kind(href: &str, anchor: &ElementRef<'_>) -> EvidenceKind {
    let lower = href.to_lowercase();

    if lower.contains("cite") || lower.contains("#ref") {
        return EvidenceKind::Citation;
    }

    if let Some(class) = anchor.value().attr("class") {
        if class.contains("reference") {
            return EvidenceKind::Citation;
        }
    }

    if lower.contains("reference") || lower.contains("footnote") {
        return EvidenceKind::Reference;
    }

    EvidenceKind::ExternalLink
}

/// Whether a resolved link is Wikipedia chrome rather than evidence. Applies
/// only within the source's own Wikipedia host; external links always pass.
pub fn is_wikipedia_navigation(resolved: &Url, base: &Url) -> bool {
    let Some(base_host) = base.host_str() else {
        return false;
    };
    if !base_host.ends_with("wikipedia.org") {
        return false;
    }
    if resolved.host_str() != Some(base_host) {
        return false;
    }

    let path = resolved.path();
    if WIKI_NAV_PREFIXES.iter().any(|p| path.starts_with(p)) {
        return true;
    }

    // Self-links back to the scanned article.
    path == base.path()
}

/// Dedup by exact URL string, keeping the first occurrence. No normalization.
pub fn dedupe_evidence(evidence: Vec<Evidence>) -> Vec<Evidence> {
    let mut seen = HashSet::new();
    evidence
        .into_iter()
        .filter(|ev| !ev.url.is_empty() && seen.insert(ev.url.clone()))
        .collect()
}
