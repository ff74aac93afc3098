//! Content fingerprinting.
//!
//! Produces a cheap, deterministic summary of a document sufficient for
//! candidate filtering without paying full-parse cost: a bounded keyword
//! list plus a short hash of the scanned bytes. Pure functions over the
//! provided text; callers are responsible for best-effort decoding and for
//! skipping documents that cannot be read at all.

use crate::models::Fingerprint;
use sha2::{Digest, Sha256};

/// Maximum keywords retained per fingerprint.
pub const MAX_FINGERPRINT_KEYWORDS: usize = 20;

/// Content prefix length used when fingerprinting against the filesystem.
pub const PREVIEW_BYTES: usize = 1500;

/// Hex length digests are truncated to, for memory economy.
const HASH_HEX_LEN: usize = 16;

/// Stop words excluded from keyword extraction.
pub(crate) static STOP_WORDS: &[&str] = &[
    "the", "a", "an", "is", "are", "was", "were", "be", "been", "being", "have", "has", "had",
    "do", "does", "did", "will", "would", "could", "should", "may", "might", "must", "shall",
    "can", "need", "dare", "ought", "used", "to", "of", "in", "for", "on", "with", "at", "by",
    "from", "as", "into", "through", "during", "before", "after", "above", "below", "between",
    "under", "again", "further", "then", "once", "here", "there", "when", "where", "why", "how",
    "all", "each", "few", "more", "most", "other", "some", "such", "no", "nor", "not", "only",
    "own", "same", "so", "than", "too", "very", "just", "also", "now", "and", "but", "or", "if",
    "because", "until", "while", "this", "that", "these", "those", "what", "which", "who",
    "whom", "whose", "it", "its", "they", "them", "their", "we", "us", "our", "you", "your",
    "i", "my", "me", "he", "him", "his", "she", "her",
];

/// Returns whether a token is on the stop-word list.
#[must_use]
pub fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.contains(&token)
}

/// Tokenizes text with the fingerprint keyword rules.
///
/// Lowercases, splits on whitespace, strips trailing punctuation, and drops
/// tokens that are too short, stop words, or all digits/punctuation.
/// Deduplicates preserving first-seen order. The same rules tokenize both
/// documents and candidate queries so the two sides agree.
#[must_use]
pub fn tokenize_keywords(text: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut keywords = Vec::new();

    for raw in text.split_whitespace() {
        let token: String = raw
            .to_lowercase()
            .trim_end_matches(|c: char| !c.is_alphanumeric())
            .to_string();

        if token.len() <= 2 {
            continue;
        }
        if is_stop_word(&token) {
            continue;
        }
        if token.chars().all(|c| !c.is_alphabetic()) {
            continue;
        }
        if seen.insert(token.clone()) {
            keywords.push(token);
        }
    }

    keywords
}

/// Fingerprints a document from its title and content.
///
/// The caller decides how much content to provide: a bounded prefix when
/// scanning the filesystem (see [`PREVIEW_BYTES`]), or the full text when a
/// document is already loaded. The hash covers exactly the scanned content
/// bytes, so two callers that scan the same prefix agree on staleness.
#[must_use]
pub fn fingerprint(title: &str, content: &str) -> Fingerprint {
    let mut combined = String::with_capacity(title.len() + content.len() + 1);
    combined.push_str(title);
    combined.push(' ');
    combined.push_str(content);

    let mut keywords = tokenize_keywords(&combined);
    keywords.truncate(MAX_FINGERPRINT_KEYWORDS);

    Fingerprint {
        keywords,
        content_hash: short_hash(content.as_bytes()),
    }
}

/// Truncates a UTF-8 preview to at most [`PREVIEW_BYTES`] bytes.
///
/// Backs off to the previous char boundary so the preview is always valid
/// UTF-8 even when the cut lands mid-codepoint.
#[must_use]
pub fn preview_of(content: &str) -> &str {
    if content.len() <= PREVIEW_BYTES {
        return content;
    }
    let mut end = PREVIEW_BYTES;
    while end > 0 && !content.is_char_boundary(end) {
        end -= 1;
    }
    &content[..end]
}

/// Computes the truncated hex digest used throughout docdex.
#[must_use]
pub fn short_hash(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut hash = hex::encode(digest);
    hash.truncate(HASH_HEX_LEN);
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_lowercases_and_strips_punctuation() {
        let tokens = tokenize_keywords("Token Rotation, OAuth! (refresh)");
        assert_eq!(tokens, vec!["token", "rotation", "oauth", "(refresh"]);
    }

    #[test]
    fn test_tokenize_drops_short_stop_and_numeric_tokens() {
        let tokens = tokenize_keywords("the an ok 42 100% authentication");
        assert_eq!(tokens, vec!["authentication"]);
    }

    #[test]
    fn test_tokenize_dedupes_preserving_order() {
        let tokens = tokenize_keywords("cache eviction cache policy eviction");
        assert_eq!(tokens, vec!["cache", "eviction", "policy"]);
    }

    #[test]
    fn test_fingerprint_bounded_to_twenty_keywords() {
        let content: String = (0..100).map(|i| format!("keyword{i:03} ")).collect();
        let fp = fingerprint("Title", &content);
        assert_eq!(fp.keywords.len(), MAX_FINGERPRINT_KEYWORDS);
    }

    #[test]
    fn test_fingerprint_includes_title_keywords_first() {
        let fp = fingerprint("Deployment Checklist", "rolling restarts and canaries");
        assert_eq!(fp.keywords[0], "deployment");
        assert_eq!(fp.keywords[1], "checklist");
    }

    #[test]
    fn test_hash_is_stable_and_truncated() {
        let a = short_hash(b"same bytes");
        let b = short_hash(b"same bytes");
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
        assert_ne!(a, short_hash(b"different bytes"));
    }

    #[test]
    fn test_hash_covers_content_not_title() {
        let a = fingerprint("Title A", "shared content");
        let b = fingerprint("Title B", "shared content");
        assert_eq!(a.content_hash, b.content_hash);
    }

    #[test]
    fn test_preview_respects_char_boundaries() {
        let mut content = "x".repeat(PREVIEW_BYTES - 1);
        content.push('é'); // two bytes, straddles the cut
        content.push_str(&"y".repeat(50));
        let preview = preview_of(&content);
        assert!(preview.len() <= PREVIEW_BYTES);
        assert!(preview.is_char_boundary(preview.len()));
    }

    #[test]
    fn test_fingerprint_never_fails_on_odd_text() {
        let fp = fingerprint("", "\u{0000}\u{FFFD} 🦀🦀 ---");
        assert!(fp.keywords.len() <= MAX_FINGERPRINT_KEYWORDS);
    }
}
