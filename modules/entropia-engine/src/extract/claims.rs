//! Generic keyword-driven claim extraction. A sentence matches at most one
//! keyword (first in list order wins) and the match is recorded in the claim's
//! heuristic tag.

use std::collections::HashSet;

use scraper::Html;

use entropia_common::Claim;

use super::text::{claim_key, split_sentences, visible_text};

/// Keywords that mark a sentence as a factual/attributional claim.
pub const GENERIC_KEYWORDS: [&str; 18] = [
    "originated",
    "origin",
    "first",
    "introduced",
    "invented",
    "according to",
    "is defined as",
    "is legally",
    "under the law",
    "under this act",
    "shall",
    "must",
    "is required",
    "established",
    "founded",
    "created",
    "discovered",
    "developed",
];

/// Extract claims from a parsed document using the generic keyword list.
pub fn extract_claims(doc: &Html) -> Vec<Claim> {
    let text = visible_text(doc);
    let sentences = split_sentences(&text);
    claims_from_sentences(&sentences, &GENERIC_KEYWORDS, "keyword")
}

/// Match sentences against a keyword list, tagging hits as `<scope>:<keyword>`.
/// Sentence indices refer to positions in `sentences`.
pub fn claims_from_sentences(sentences: &[String], keywords: &[&str], scope: &str) -> Vec<Claim> {
    let mut claims = Vec::new();

    for (index, sentence) in sentences.iter().enumerate() {
        let lower = sentence.to_lowercase();
        for keyword in keywords {
            if lower.contains(keyword) {
                claims.push(Claim {
                    text: sentence.trim().to_string(),
                    heuristic: format!("{scope}:{keyword}"),
                    sentence: index,
                });
                break;
            }
        }
    }

    dedupe_claims(claims)
}

/// Remove duplicates by case-insensitive trimmed text, keeping the first.
pub fn dedupe_claims(claims: Vec<Claim>) -> Vec<Claim> {
    let mut seen = HashSet::new();
    claims
        .into_iter()
        .filter(|claim| {
            let key = claim_key(&claim.text);
            !key.is_empty() && seen.insert(key)
        })
        .collect()
}
