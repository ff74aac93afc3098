//! Relevance-scoring models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where an extracted keyword came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeywordSource {
    /// Declared in YAML front matter (authoritative).
    Frontmatter,
    /// Taken from the document title.
    Title,
    /// Taken from heading text.
    Heading,
    /// Taken from bold or italic spans.
    Emphasis,
    /// Taken from general body content.
    Content,
}

impl KeywordSource {
    /// The weight this source contributes to a keyword.
    #[must_use]
    pub const fn weight(self) -> f64 {
        match self {
            Self::Frontmatter => 5.0,
            Self::Title => 3.0,
            Self::Heading => 2.0,
            Self::Emphasis => 1.5,
            Self::Content => 1.0,
        }
    }
}

/// A keyword with its strongest source weight and full provenance.
///
/// When the same keyword arises from multiple sources its weight is the
/// maximum across sources, not a sum, and `sources` accumulates every
/// contributing origin for explainability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedKeyword {
    /// The normalized keyword.
    pub keyword: String,
    /// Maximum weight across contributing sources.
    pub weight: f64,
    /// All sources that produced this keyword, in discovery order.
    pub sources: Vec<KeywordSource>,
}

/// The signals the relevance engine scores a document pair from.
#[derive(Debug, Clone)]
pub struct DocumentSignals {
    /// Relative path ("" for a not-yet-created document).
    pub path: String,
    /// Document title.
    pub title: String,
    /// Namespace derived from the path.
    pub namespace: String,
    /// Weighted keywords extracted from the document.
    pub keywords: Vec<WeightedKeyword>,
    /// Raw content (used by the link-graph factor).
    pub content: String,
    /// Filesystem mtime, when known.
    pub modified: Option<DateTime<Utc>>,
}

/// A bounded multi-factor relevance score.
///
/// Each factor is independently bounded; the total is the capped sum and
/// never exceeds 1.0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RelevanceScore {
    /// Weighted keyword-match ratio, 0.0–1.0.
    pub keyword_overlap: f64,
    /// Title similarity, 0.0–0.3.
    pub title_similarity: f64,
    /// Namespace affinity tier, 0.0–0.2.
    pub namespace_affinity: f64,
    /// Recency boost, 0.0–0.1.
    pub recency: f64,
    /// Link-graph boost, 0.0 or 0.3 (feature-gated).
    pub link_graph: f64,
    /// Capped sum of all factors.
    pub total: f64,
}

/// One ranked suggestion produced by discovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelatedDocument {
    /// Relative path of the suggested document.
    pub path: String,
    /// The suggested document's title.
    pub title: String,
    /// Namespace of the suggested document.
    pub namespace: String,
    /// The full factor breakdown.
    pub score: RelevanceScore,
    /// Human-readable explanation of the primary factors.
    pub reason: String,
}
