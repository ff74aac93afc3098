//! Two-stage related-document discovery.
//!
//! Stage 1 filters the corpus with a cheap fingerprint-overlap pass and
//! caps the survivor set; Stage 2 loads the survivors' full content and
//! runs the complete relevance engine. Discovery is an enhancement, never
//! a blocking dependency: any I/O failure is converted into a structured
//! "suggestions unavailable" outcome instead of an error.

use crate::cache::DocumentCache;
use crate::config::DiscoverySettings;
use crate::models::{
    AccessContext, DocumentSignals, FingerprintListOptions, RelatedDocument, namespace_of,
};
use crate::relevance::{RelevanceEngine, extract_weighted_keywords, keyword_overlap};
use crate::Result;
use std::sync::Arc;
use tracing::{debug, warn};

/// Input to a discovery run, describing a document that may not exist yet.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryQuery {
    /// Working title of the document under creation or review.
    pub title: String,
    /// Free-text overview or summary of its intended content.
    pub overview: String,
    /// Path to exclude from suggestions, typically the document itself.
    pub exclude_path: Option<String>,
    /// Returned-list cap; defaults to the configured maximum.
    pub limit: Option<usize>,
}

/// Result of a discovery run.
#[derive(Debug, Clone)]
pub enum DiscoveryOutcome {
    /// Ranked suggestions, possibly empty.
    Suggestions(Vec<RelatedDocument>),
    /// Discovery could not run; callers proceed without suggestions.
    Unavailable {
        /// The original query, returned so the caller can carry on.
        query: DiscoveryQuery,
        /// Why discovery failed.
        reason: String,
    },
}

impl DiscoveryOutcome {
    /// The suggestions, treating unavailability as empty.
    #[must_use]
    pub fn suggestions(&self) -> &[RelatedDocument] {
        match self {
            Self::Suggestions(list) => list,
            Self::Unavailable { .. } => &[],
        }
    }
}

/// Orchestrates two-stage discovery over the document cache.
pub struct DiscoveryService {
    cache: Arc<DocumentCache>,
    engine: RelevanceEngine,
    settings: DiscoverySettings,
}

impl DiscoveryService {
    /// Creates a discovery service.
    #[must_use]
    pub const fn new(
        cache: Arc<DocumentCache>,
        engine: RelevanceEngine,
        settings: DiscoverySettings,
    ) -> Self {
        Self {
            cache,
            engine,
            settings,
        }
    }

    /// Finds documents related to the query's title and overview.
    ///
    /// Never returns an error: failures produce
    /// [`DiscoveryOutcome::Unavailable`] carrying the query back to the
    /// caller.
    pub async fn find_related(&self, query: DiscoveryQuery) -> DiscoveryOutcome {
        match self.run(&query).await {
            Ok(suggestions) => DiscoveryOutcome::Suggestions(suggestions),
            Err(error) => {
                warn!(%error, title = %query.title, "discovery unavailable");
                DiscoveryOutcome::Unavailable {
                    reason: error.to_string(),
                    query,
                }
            }
        }
    }

    async fn run(&self, query: &DiscoveryQuery) -> Result<Vec<RelatedDocument>> {
        let source = self.source_signals(query);
        let candidates = self.stage_one(query, &source).await?;
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let mut suggestions = self.stage_two(&source, &candidates).await?;
        suggestions.sort_by(|a, b| {
            b.score
                .total
                .partial_cmp(&a.score.total)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.path.cmp(&b.path))
        });
        suggestions.truncate(query.limit.unwrap_or(self.settings.max_suggestions));
        Ok(suggestions)
    }

    /// Builds the source signal bundle for a not-yet-created document.
    ///
    /// There is no front matter at this stage, so extraction always runs
    /// on the title and overview text. The namespace is borrowed from the
    /// excluded path when one is given.
    fn source_signals(&self, query: &DiscoveryQuery) -> DocumentSignals {
        let namespace = query
            .exclude_path
            .as_deref()
            .map(namespace_of)
            .unwrap_or_default();
        DocumentSignals {
            path: query.exclude_path.clone().unwrap_or_default(),
            title: query.title.clone(),
            namespace,
            keywords: extract_weighted_keywords(&query.title, &query.overview),
            content: query.overview.clone(),
            modified: None,
        }
    }

    /// Stage 1: cheap fingerprint-overlap filter with a candidate cap.
    ///
    /// Stale fingerprints are refreshed first (unless configured off), so
    /// edits that slipped past the watcher and poller are scored with
    /// their current keywords. With no fingerprints at all (fresh
    /// install), falls back to the full document tree so Stage 2 can scan
    /// everything directly.
    async fn stage_one(
        &self,
        query: &DiscoveryQuery,
        source: &DocumentSignals,
    ) -> Result<Vec<String>> {
        let entries = self
            .cache
            .list_fingerprints(FingerprintListOptions {
                refresh_stale: self.settings.refresh_stale_fingerprints,
                namespace: None,
            })
            .await?;

        if entries.is_empty() {
            let all = crate::index::list_markdown_files(self.cache.store().root())?;
            debug!(
                documents = all.len(),
                "no fingerprints available; scanning full tree"
            );
            return Ok(all
                .into_iter()
                .filter(|path| Some(path) != query.exclude_path.as_ref())
                .collect());
        }

        let mut scored: Vec<(f64, String)> = entries
            .into_iter()
            .filter(|entry| Some(&entry.path) != query.exclude_path.as_ref())
            .map(|entry| {
                let overlap = keyword_overlap(&source.keywords, &entry.keywords);
                (overlap, entry.path)
            })
            .filter(|(overlap, _)| *overlap >= self.settings.candidate_threshold)
            .collect();

        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.1.cmp(&b.1))
        });
        scored.truncate(self.settings.max_candidates);

        debug!(candidates = scored.len(), "stage one complete");
        Ok(scored.into_iter().map(|(_, path)| path).collect())
    }

    /// Stage 2: full scoring of the surviving candidates.
    async fn stage_two(
        &self,
        source: &DocumentSignals,
        candidates: &[String],
    ) -> Result<Vec<RelatedDocument>> {
        let mut suggestions = Vec::with_capacity(candidates.len());

        for path in candidates {
            let Some(document) = self
                .cache
                .get_document(path, AccessContext::Search)
                .await?
            else {
                // Deleted between stages.
                continue;
            };
            let Some(content) = self.cache.get_document_content(path).await? else {
                continue;
            };

            let metadata = &document.metadata;
            let target = DocumentSignals {
                path: metadata.path.clone(),
                title: metadata.title.clone(),
                namespace: metadata.namespace.clone(),
                keywords: extract_weighted_keywords(&metadata.title, &content),
                content,
                modified: Some(metadata.last_modified),
            };

            let score = self.engine.score(source, &target);
            let reason = self.engine.explain(&score, &target.namespace);
            suggestions.push(RelatedDocument {
                path: target.path,
                title: target.title,
                namespace: target.namespace,
                score,
                reason,
            });
        }

        Ok(suggestions)
    }
}
