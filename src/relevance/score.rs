//! Individual relevance factors.
//!
//! Each factor is pure and independently bounded; the engine sums and
//! caps them. A factor given unusable input degrades to 0.0 rather than
//! failing the whole score.

use crate::fingerprint::is_stop_word;
use crate::models::WeightedKeyword;
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// Generic documentation words that carry no title signal.
const TITLE_NOISE_WORDS: &[&str] = &[
    "guide",
    "overview",
    "tutorial",
    "introduction",
    "reference",
    "documentation",
    "docs",
    "notes",
    "readme",
    "manual",
    "howto",
    "getting",
    "started",
];

/// Weighted keyword-match ratio between a source's keywords and a target's
/// keyword set, 0.0 to 1.0.
///
/// The ratio divides matched weight by total source weight, so many weak
/// matches cannot outrank a few authoritative ones.
#[must_use]
pub fn keyword_overlap(source: &[WeightedKeyword], target: &[String]) -> f64 {
    let total: f64 = source.iter().map(|k| k.weight).sum();
    if total <= 0.0 {
        return 0.0;
    }

    let target_set: HashSet<&str> = target.iter().map(String::as_str).collect();
    let matched: f64 = source
        .iter()
        .filter(|k| target_set.contains(k.keyword.as_str()))
        .map(|k| k.weight)
        .sum();
    matched / total
}

/// Title similarity, 0.0 to 0.3.
///
/// An exact (case-insensitive) title match scores the flat maximum;
/// otherwise the meaningful-word overlap ratio is scaled into the band.
#[must_use]
pub fn title_similarity(source: &str, target: &str) -> f64 {
    let a = source.trim().to_lowercase();
    let b = target.trim().to_lowercase();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 0.3;
    }

    let words_a = meaningful_title_words(&a);
    let words_b = meaningful_title_words(&b);
    if words_a.is_empty() || words_b.is_empty() {
        return 0.0;
    }

    let shared = words_a.intersection(&words_b).count();
    #[allow(clippy::cast_precision_loss)]
    let ratio = shared as f64 / words_a.len().max(words_b.len()) as f64;
    ratio * 0.3
}

fn meaningful_title_words(title: &str) -> HashSet<String> {
    title
        .split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|w| w.len() > 2 && !is_stop_word(w) && !TITLE_NOISE_WORDS.contains(&w.as_str()))
        .collect()
}

/// Namespace affinity, a strict four-tier lookup: exact match 0.2,
/// parent/child 0.15, sibling 0.1, unrelated 0.0.
#[must_use]
pub fn namespace_affinity(source: &str, target: &str) -> f64 {
    if source.is_empty() || target.is_empty() {
        return 0.0;
    }
    if source == target {
        return 0.2;
    }
    if is_parent_child(source, target) || is_parent_child(target, source) {
        return 0.15;
    }

    let first_a = source.split('/').next();
    let first_b = target.split('/').next();
    if first_a.is_some() && first_a == first_b {
        return 0.1;
    }
    0.0
}

fn is_parent_child(parent: &str, child: &str) -> bool {
    child
        .strip_prefix(parent)
        .is_some_and(|rest| rest.starts_with('/'))
}

/// Recency boost, 0.0 to 0.1, from the target's mtime relative to `now`.
///
/// Wall-clock relative, so the same pair drifts downward over time.
#[must_use]
pub fn recency_boost(modified: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
    let Some(modified) = modified else {
        return 0.0;
    };
    let age_days = (now - modified).num_days();
    if age_days < 0 {
        // A future mtime is clock skew; treat as fresh.
        return 0.1;
    }
    match age_days {
        0..=7 => 0.1,
        8..=30 => 0.05,
        31..=90 => 0.02,
        _ => 0.0,
    }
}

/// Link-graph boost, 0.0 or 0.3.
///
/// A cheap pattern check for an explicit reference from source content to
/// the target path, not real reference resolution.
#[must_use]
pub fn link_graph_boost(source_content: &str, target_path: &str) -> f64 {
    if target_path.is_empty() {
        return 0.0;
    }
    let stem = target_path.strip_suffix(".md").unwrap_or(target_path);
    let patterns = [
        format!("]({target_path})"),
        format!("](./{target_path})"),
        format!("]({stem})"),
        format!("[[{stem}]]"),
    ];
    if patterns.iter().any(|p| source_content.contains(p.as_str())) {
        0.3
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::KeywordSource;
    use chrono::Duration;
    use test_case::test_case;

    fn weighted(pairs: &[(&str, f64)]) -> Vec<WeightedKeyword> {
        pairs
            .iter()
            .map(|(keyword, weight)| WeightedKeyword {
                keyword: (*keyword).to_string(),
                weight: *weight,
                sources: vec![KeywordSource::Content],
            })
            .collect()
    }

    fn strings(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| (*w).to_string()).collect()
    }

    #[test]
    fn test_keyword_overlap_is_weighted_ratio() {
        let source = weighted(&[("tokens", 5.0), ("rotation", 3.0), ("gardening", 2.0)]);
        let target = strings(&["tokens", "rotation"]);
        let score = keyword_overlap(&source, &target);
        assert!((score - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_keyword_overlap_weak_matches_lose_to_authoritative() {
        // Five weak matches out of six weak keywords...
        let weak_source = weighted(&[
            ("a", 1.0),
            ("b", 1.0),
            ("c", 1.0),
            ("d", 1.0),
            ("e", 1.0),
            ("f", 1.0),
        ]);
        let weak = keyword_overlap(&weak_source, &strings(&["a", "b", "c", "d", "e"]));

        // ...versus one authoritative match plus a tiny miss.
        let strong_source = weighted(&[("auth", 5.0), ("misc", 0.5)]);
        let strong = keyword_overlap(&strong_source, &strings(&["auth"]));

        assert!(strong > weak);
    }

    #[test]
    fn test_keyword_overlap_empty_source() {
        assert!(keyword_overlap(&[], &strings(&["x"])).abs() < f64::EPSILON);
    }

    #[test]
    fn test_title_similarity_exact() {
        assert!((title_similarity("API Tokens", "api tokens") - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_title_similarity_partial_excludes_noise_words() {
        // "guide" is noise, so the comparison is tokens-vs-tokens-rotation.
        let score = title_similarity("Tokens Guide", "Tokens Rotation");
        assert!((score - 0.15).abs() < 1e-9);
    }

    #[test]
    fn test_title_similarity_disjoint() {
        assert!(title_similarity("Gardening", "Kubernetes").abs() < f64::EPSILON);
    }

    #[test_case("api/specs", "api/specs", 0.2 ; "exact match")]
    #[test_case("api", "api/guides", 0.15 ; "parent child")]
    #[test_case("api/specs", "api/guides", 0.1 ; "siblings")]
    #[test_case("api", "frontend", 0.0 ; "unrelated")]
    fn test_namespace_affinity_table(a: &str, b: &str, expected: f64) {
        assert!((namespace_affinity(a, b) - expected).abs() < f64::EPSILON);
    }

    #[test]
    fn test_namespace_affinity_no_prefix_false_positive() {
        // "api2" is not a child of "api".
        assert!((namespace_affinity("api", "api2/guides") - 0.0).abs() < f64::EPSILON);
    }

    #[test_case(1, 0.1 ; "one day old")]
    #[test_case(20, 0.05 ; "twenty days old")]
    #[test_case(60, 0.02 ; "sixty days old")]
    #[test_case(200, 0.0 ; "two hundred days old")]
    fn test_recency_boost_table(age_days: i64, expected: f64) {
        let now = Utc::now();
        let score = recency_boost(Some(now - Duration::days(age_days)), now);
        assert!((score - expected).abs() < f64::EPSILON);
    }

    #[test]
    fn test_recency_boost_unknown_mtime() {
        assert!(recency_boost(None, Utc::now()).abs() < f64::EPSILON);
    }

    #[test]
    fn test_link_graph_boost_patterns() {
        let content = "See [auth](api/auth.md) for details.";
        assert!((link_graph_boost(content, "api/auth.md") - 0.3).abs() < f64::EPSILON);
        assert!((link_graph_boost("See [[api/auth]].", "api/auth.md") - 0.3).abs() < f64::EPSILON);
        assert!(link_graph_boost("No links here.", "api/auth.md").abs() < f64::EPSILON);
    }
}
