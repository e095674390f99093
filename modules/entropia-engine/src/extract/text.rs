//! Plain-text utilities shared by every adapter: visible-text walking,
//! sentence splitting, dedup keys.

use scraper::{ElementRef, Html};

/// Tags whose subtrees never contribute visible text.
const SKIPPED_TAGS: [&str; 4] = ["script", "style", "noscript", "iframe"];

/// Sentences shorter than this are fragments, longer ones are run-ons;
/// neither makes a useful claim.
pub const MIN_SENTENCE_LEN: usize = 30;
pub const MAX_SENTENCE_LEN: usize = 500;

/// Visible text of the whole document, in document order, whitespace-joined.
pub fn visible_text(doc: &Html) -> String {
    visible_text_of(doc.root_element())
}

/// Visible text of one element's subtree.
pub fn visible_text_of(element: ElementRef<'_>) -> String {
    let mut buf = String::new();
    let mut stack = vec![*element];

    while let Some(node) = stack.pop() {
        if let Some(el) = node.value().as_element() {
            if SKIPPED_TAGS.contains(&el.name()) {
                continue;
            }
        }
        if let Some(text) = node.value().as_text() {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                buf.push_str(trimmed);
                buf.push(' ');
            }
        }
        // Reverse so popping preserves document order.
        let children: Vec<_> = node.children().collect();
        for child in children.into_iter().rev() {
            stack.push(child);
        }
    }

    buf.trim_end().to_string()
}

/// Split text into sentences on `.`, `!`, `?` followed by whitespace, keeping
/// only those within the claim length window.
pub fn split_sentences(text: &str) -> Vec<String> {
    let text = text.replace('\n', " ");
    let mut sentences = Vec::new();
    let mut current = String::new();

    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') {
            if matches!(chars.peek(), Some(&' ') | Some(&'\t')) {
                push_if_sentence(&mut sentences, &current);
                current.clear();
            }
        }
    }
    push_if_sentence(&mut sentences, &current);

    sentences
}

fn push_if_sentence(sentences: &mut Vec<String>, raw: &str) {
    let sentence = raw.trim();
    let len = sentence.chars().count();
    if (MIN_SENTENCE_LEN..=MAX_SENTENCE_LEN).contains(&len) {
        sentences.push(sentence.to_string());
    }
}

/// Dedup key for claim text: case-insensitive, trimmed.
pub fn claim_key(text: &str) -> String {
    text.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visible_text_skips_script_and_style() {
        let doc = Html::parse_document(
            "<html><body><p>Visible words here.</p>\
             <script>var hidden = 1;</script>\
             <style>.x { color: red }</style>\
             <noscript>also hidden</noscript>\
             <iframe>nested hidden</iframe>\
             <p>More visible text.</p></body></html>",
        );
        let text = visible_text(&doc);
        assert!(text.contains("Visible words here."));
        assert!(text.contains("More visible text."));
        assert!(!text.contains("hidden"));
        assert!(!text.contains("color"));
    }

    #[test]
    fn visible_text_preserves_document_order() {
        let doc = Html::parse_document("<p>first</p><p>second</p><p>third</p>");
        assert_eq!(visible_text(&doc), "first second third");
    }

    #[test]
    fn split_keeps_sentences_in_length_window() {
        let text = "Too short. This sentence is comfortably long enough to be retained by the splitter. Nope.";
        let sentences = split_sentences(text);
        assert_eq!(sentences.len(), 1);
        assert!(sentences[0].starts_with("This sentence"));
    }

    #[test]
    fn split_handles_exclamation_and_question() {
        let text = "Is this a question long enough to count as a real sentence? It certainly looks like one to me right now!";
        let sentences = split_sentences(text);
        assert_eq!(sentences.len(), 2);
    }

    #[test]
    fn terminator_without_whitespace_does_not_split() {
        let text = "The v2.1 release introduced support for several new formats on launch day. Done.";
        let sentences = split_sentences(text);
        assert_eq!(sentences.len(), 1);
        assert!(sentences[0].contains("v2.1"));
    }

    #[test]
    fn trailing_text_without_terminator_is_kept() {
        let text = "This trailing fragment is long enough to qualify as a sentence on its own";
        let sentences = split_sentences(text);
        assert_eq!(sentences.len(), 1);
    }

    #[test]
    fn overlong_sentences_are_dropped() {
        let long = format!("{}.", "word ".repeat(150));
        assert!(split_sentences(&long).is_empty());
    }

    #[test]
    fn claim_key_normalizes_case_and_whitespace() {
        assert_eq!(claim_key("  Laksa Originated HERE  "), "laksa originated here");
    }
}
