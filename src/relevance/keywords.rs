//! Weighted keyword extraction.
//!
//! Front-matter keywords are authoritative: when a document declares them,
//! they are used exclusively and every other source is skipped. Otherwise
//! title, heading, emphasis, and body keywords are merged, with each
//! keyword keeping the maximum weight across its sources.

use crate::fingerprint::tokenize_keywords;
use crate::markdown::FrontMatter;
use crate::models::{KeywordSource, WeightedKeyword};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static BOLD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*([^*\n]+)\*\*|__([^_\n]+)__").expect("bold regex"));
static ITALIC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*([^*\n]+)\*|_([^_\n]+)_").expect("italic regex"));

/// Extracts weighted keywords from a title and raw document content.
#[must_use]
pub fn extract_weighted_keywords(title: &str, content: &str) -> Vec<WeightedKeyword> {
    if let Some(declared) = frontmatter_keywords(content) {
        return declared;
    }

    let body = FrontMatter::body_of(content);
    let mut merger = KeywordMerger::default();

    merger.add_all(tokenize_keywords(title), KeywordSource::Title);
    merger.add_all(heading_tokens(&body), KeywordSource::Heading);
    merger.add_all(emphasis_tokens(&body), KeywordSource::Emphasis);
    merger.add_all(tokenize_keywords(&body), KeywordSource::Content);

    merger.finish()
}

/// Declared front-matter keywords, taken verbatim at the top weight.
fn frontmatter_keywords(content: &str) -> Option<Vec<WeightedKeyword>> {
    let (metadata, _) = FrontMatter::parse(content).ok()?;
    let declared = FrontMatter::keywords_of(&metadata)?;
    if declared.is_empty() {
        return None;
    }

    let mut seen = HashMap::new();
    let mut result = Vec::with_capacity(declared.len());
    for keyword in declared {
        if seen.insert(keyword.clone(), ()).is_none() {
            result.push(WeightedKeyword {
                keyword,
                weight: KeywordSource::Frontmatter.weight(),
                sources: vec![KeywordSource::Frontmatter],
            });
        }
    }
    Some(result)
}

fn heading_tokens(body: &str) -> Vec<String> {
    let text: String = body
        .lines()
        .filter(|line| line.trim_start().starts_with('#'))
        .map(|line| line.trim_start().trim_start_matches('#'))
        .collect::<Vec<_>>()
        .join(" ");
    tokenize_keywords(&text)
}

fn emphasis_tokens(body: &str) -> Vec<String> {
    let mut text = String::new();
    for re in [&*BOLD_RE, &*ITALIC_RE] {
        for capture in re.captures_iter(body) {
            for group in capture.iter().skip(1).flatten() {
                text.push_str(group.as_str());
                text.push(' ');
            }
        }
    }
    tokenize_keywords(&text)
}

/// Accumulates keywords across sources, keeping max weight and provenance.
#[derive(Default)]
struct KeywordMerger {
    order: Vec<String>,
    entries: HashMap<String, WeightedKeyword>,
}

impl KeywordMerger {
    fn add_all(&mut self, keywords: Vec<String>, source: KeywordSource) {
        for keyword in keywords {
            match self.entries.get_mut(&keyword) {
                Some(entry) => {
                    entry.weight = entry.weight.max(source.weight());
                    if !entry.sources.contains(&source) {
                        entry.sources.push(source);
                    }
                }
                None => {
                    self.order.push(keyword.clone());
                    self.entries.insert(
                        keyword.clone(),
                        WeightedKeyword {
                            keyword,
                            weight: source.weight(),
                            sources: vec![source],
                        },
                    );
                }
            }
        }
    }

    fn finish(mut self) -> Vec<WeightedKeyword> {
        let mut result: Vec<WeightedKeyword> = self
            .order
            .iter()
            .filter_map(|keyword| self.entries.remove(keyword))
            .collect();
        // Strongest signals first; discovery order breaks ties.
        result.sort_by(|a, b| {
            b.weight
                .partial_cmp(&a.weight)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        result
    }
}
