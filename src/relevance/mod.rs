//! Multi-factor relevance scoring.
//!
//! Turns a pair of document signal bundles into one bounded score plus a
//! short explanation of the factors that drove it.

mod keywords;
mod score;

pub use keywords::extract_weighted_keywords;
pub use score::{
    keyword_overlap, link_graph_boost, namespace_affinity, recency_boost, title_similarity,
};

use crate::config::FeatureFlags;
use crate::models::{DocumentSignals, RelevanceScore};
use chrono::Utc;

/// Per-factor thresholds below which a factor is not worth explaining.
const EXPLAIN_KEYWORD_MIN: f64 = 0.1;
const EXPLAIN_TITLE_MIN: f64 = 0.05;
const EXPLAIN_NAMESPACE_MIN: f64 = 0.05;
const EXPLAIN_RECENCY_MIN: f64 = 0.01;
const EXPLAIN_LINK_MIN: f64 = 0.1;

/// Computes bounded relevance scores between document pairs.
#[derive(Debug, Clone, Default)]
pub struct RelevanceEngine {
    features: FeatureFlags,
}

impl RelevanceEngine {
    /// Creates an engine with the given feature flags.
    #[must_use]
    pub const fn new(features: FeatureFlags) -> Self {
        Self { features }
    }

    /// Scores how relevant `target` is to `source`.
    ///
    /// The total is the capped sum of five independently bounded factors
    /// and never exceeds 1.0. Factors fed unusable input contribute 0.0
    /// rather than failing the score.
    #[must_use]
    pub fn score(&self, source: &DocumentSignals, target: &DocumentSignals) -> RelevanceScore {
        let target_keywords: Vec<String> = target
            .keywords
            .iter()
            .map(|k| k.keyword.clone())
            .collect();

        let keyword_overlap = score::keyword_overlap(&source.keywords, &target_keywords);
        let title_similarity = score::title_similarity(&source.title, &target.title);
        let namespace_affinity = score::namespace_affinity(&source.namespace, &target.namespace);
        let recency = score::recency_boost(target.modified, Utc::now());
        let link_graph = if self.features.link_graph_boost {
            score::link_graph_boost(&source.content, &target.path)
        } else {
            0.0
        };

        let total =
            (keyword_overlap + title_similarity + namespace_affinity + recency + link_graph)
                .min(1.0);

        RelevanceScore {
            keyword_overlap,
            title_similarity,
            namespace_affinity,
            recency,
            link_graph,
            total,
        }
    }

    /// Renders the score's primary factors as a short phrase.
    ///
    /// Factors must clear a per-factor threshold to be mentioned; the top
    /// three by contribution are kept. When nothing clears its threshold
    /// the explanation falls back to a generic namespace reference.
    #[must_use]
    pub fn explain(&self, score: &RelevanceScore, target_namespace: &str) -> String {
        let mut factors: Vec<(f64, String)> = Vec::new();

        if score.keyword_overlap > EXPLAIN_KEYWORD_MIN {
            let phrase = if score.keyword_overlap >= 0.5 {
                "strong keyword overlap"
            } else {
                "shared keywords"
            };
            factors.push((score.keyword_overlap, phrase.to_string()));
        }
        if score.title_similarity > EXPLAIN_TITLE_MIN {
            factors.push((score.title_similarity, "similar titles".to_string()));
        }
        if score.namespace_affinity > EXPLAIN_NAMESPACE_MIN {
            let phrase = if score.namespace_affinity >= 0.2 {
                "same namespace"
            } else {
                "nearby namespace"
            };
            factors.push((score.namespace_affinity, phrase.to_string()));
        }
        if score.recency > EXPLAIN_RECENCY_MIN {
            factors.push((score.recency, "recently updated".to_string()));
        }
        if score.link_graph > EXPLAIN_LINK_MIN {
            factors.push((score.link_graph, "directly referenced".to_string()));
        }

        factors.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        factors.truncate(3);

        if factors.is_empty() {
            return format!("related documentation in {target_namespace}");
        }

        let phrases: Vec<String> = factors.into_iter().map(|(_, phrase)| phrase).collect();
        match phrases.len() {
            1 => phrases[0].clone(),
            2 => format!("{} with {}", phrases[0], phrases[1]),
            _ => format!("{} with {} and {}", phrases[0], phrases[1], phrases[2]),
        }
    }
}
