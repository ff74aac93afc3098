//! Integration tests for two-stage related-document discovery.
#![allow(clippy::expect_used, clippy::unwrap_used)]

use docdex::{
    AccessContext, DiscoveryOutcome, DiscoveryQuery, DiscoveryService, DocdexConfig,
    DocumentCache, FeatureFlags, RelevanceEngine,
};
use std::sync::Arc;
use tempfile::TempDir;

fn write_doc(dir: &TempDir, rel: &str, content: &str) {
    let path = dir.path().join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

fn corpus() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_doc(
        &dir,
        "api/auth.md",
        "# Authentication\n\nToken rotation, revocation, and refresh flows.\n",
    );
    write_doc(
        &dir,
        "api/sessions.md",
        "# Sessions\n\nSession tokens expire after refresh.\n",
    );
    write_doc(
        &dir,
        "api/rate-limits.md",
        "# Rate Limits\n\nThrottling windows and quota buckets.\n",
    );
    write_doc(
        &dir,
        "guides/gardening.md",
        "# Gardening\n\nPrune roses in early spring.\n",
    );
    dir
}

async fn service_with_warm_cache(
    dir: &TempDir,
    features: FeatureFlags,
) -> (Arc<DocumentCache>, DiscoveryService) {
    let config = DocdexConfig::new()
        .with_root(dir.path())
        .with_features(features);
    let cache = Arc::new(DocumentCache::new(&config));
    for path in [
        "api/auth.md",
        "api/sessions.md",
        "api/rate-limits.md",
        "guides/gardening.md",
    ] {
        cache
            .get_document(path, AccessContext::Direct)
            .await
            .unwrap();
    }
    let service = DiscoveryService::new(
        Arc::clone(&cache),
        RelevanceEngine::new(config.features),
        config.discovery.clone(),
    );
    (cache, service)
}

#[tokio::test]
async fn test_related_documents_ranked_by_relevance() {
    let dir = corpus();
    let (_cache, service) = service_with_warm_cache(&dir, FeatureFlags::default()).await;

    let outcome = service
        .find_related(DiscoveryQuery {
            title: "Token Refresh".to_string(),
            overview: "How authentication tokens are rotated and refreshed.".to_string(),
            ..DiscoveryQuery::default()
        })
        .await;

    let suggestions = outcome.suggestions();
    assert!(suggestions.len() >= 2);
    assert_eq!(suggestions[0].path, "api/auth.md");
    assert!(suggestions.iter().any(|s| s.path == "api/sessions.md"));
    assert!(suggestions.iter().all(|s| s.path != "guides/gardening.md"));

    // Scores are bounded and descending.
    for pair in suggestions.windows(2) {
        assert!(pair[0].score.total >= pair[1].score.total);
    }
    assert!(suggestions.iter().all(|s| s.score.total <= 1.0));
    assert!(suggestions.iter().all(|s| !s.reason.is_empty()));
}

#[tokio::test]
async fn test_self_suggestion_excluded_during_review() {
    let dir = corpus();
    let (_cache, service) = service_with_warm_cache(&dir, FeatureFlags::default()).await;

    let outcome = service
        .find_related(DiscoveryQuery {
            title: "Authentication".to_string(),
            overview: "Token rotation, revocation, and refresh flows.".to_string(),
            exclude_path: Some("api/auth.md".to_string()),
            limit: None,
        })
        .await;

    assert!(
        outcome
            .suggestions()
            .iter()
            .all(|s| s.path != "api/auth.md")
    );
}

#[tokio::test]
async fn test_link_graph_boost_changes_ranking() {
    let dir = TempDir::new().unwrap();
    write_doc(
        &dir,
        "api/a.md",
        "# Tokens A\n\nToken notes without links.\n",
    );
    write_doc(&dir, "api/b.md", "# Tokens B\n\nToken notes too.\n");

    let flags = FeatureFlags::default().with_link_graph_boost(true);
    let (_cache, service) = service_with_warm_cache_paths(&dir, flags, &["api/a.md", "api/b.md"])
        .await;

    let outcome = service
        .find_related(DiscoveryQuery {
            title: "Tokens".to_string(),
            overview: "Token notes. See [b](api/b.md) for details.".to_string(),
            ..DiscoveryQuery::default()
        })
        .await;

    let suggestions = outcome.suggestions();
    assert_eq!(suggestions[0].path, "api/b.md");
    assert!((suggestions[0].score.link_graph - 0.3).abs() < f64::EPSILON);
}

async fn service_with_warm_cache_paths(
    dir: &TempDir,
    features: FeatureFlags,
    paths: &[&str],
) -> (Arc<DocumentCache>, DiscoveryService) {
    let config = DocdexConfig::new()
        .with_root(dir.path())
        .with_features(features);
    let cache = Arc::new(DocumentCache::new(&config));
    for path in paths {
        cache
            .get_document(path, AccessContext::Direct)
            .await
            .unwrap();
    }
    let service = DiscoveryService::new(
        Arc::clone(&cache),
        RelevanceEngine::new(config.features),
        config.discovery.clone(),
    );
    (cache, service)
}

#[tokio::test]
async fn test_discovery_survives_document_deletion_mid_flight() {
    let dir = corpus();
    let (cache, service) = service_with_warm_cache(&dir, FeatureFlags::default()).await;

    // No invalidation: the fingerprint still lists the file until stage
    // one's refresh pass discovers the deletion and drops the entry.
    std::fs::remove_file(dir.path().join("api/sessions.md")).unwrap();
    assert!(
        cache
            .tracked_paths()
            .unwrap()
            .contains(&"api/sessions.md".to_string())
    );

    let outcome = service
        .find_related(DiscoveryQuery {
            title: "Token Refresh".to_string(),
            overview: "Authentication token rotation and refresh.".to_string(),
            ..DiscoveryQuery::default()
        })
        .await;

    let suggestions = outcome.suggestions();
    assert!(!suggestions.is_empty());
    assert!(suggestions.iter().all(|s| s.path != "api/sessions.md"));
    assert!(
        !cache
            .tracked_paths()
            .unwrap()
            .contains(&"api/sessions.md".to_string())
    );
}

#[tokio::test]
async fn test_discovery_scores_edits_made_behind_the_cache() {
    let dir = corpus();
    let (_cache, service) = service_with_warm_cache(&dir, FeatureFlags::default()).await;

    // Rewrite the document on disk with no invalidation event. The old
    // fingerprint knows nothing about webhooks, so only the stage-one
    // refresh pass can let this query find it.
    write_doc(
        &dir,
        "api/rate-limits.md",
        "# Webhook Delivery\n\nWebhooks retry failed callback deliveries with backoff.\n",
    );

    let outcome = service
        .find_related(DiscoveryQuery {
            title: "Webhooks".to_string(),
            overview: "Configuring webhooks and callback delivery retries.".to_string(),
            ..DiscoveryQuery::default()
        })
        .await;

    let suggestions = outcome.suggestions();
    assert!(
        suggestions.iter().any(|s| s.path == "api/rate-limits.md"),
        "refreshed fingerprint should surface the rewritten document"
    );
    let hit = suggestions
        .iter()
        .find(|s| s.path == "api/rate-limits.md")
        .unwrap();
    assert!(hit.score.keyword_overlap > 0.0);
    assert_eq!(hit.title, "Webhook Delivery");
}

#[tokio::test]
async fn test_frontmatter_keywords_dominate_discovery() {
    let dir = TempDir::new().unwrap();
    write_doc(
        &dir,
        "api/opaque.md",
        "---\nkeywords: [webhooks, callbacks]\n---\n# Internal Notes\n\nMiscellaneous text.\n",
    );
    write_doc(
        &dir,
        "api/other.md",
        "# Miscellaneous\n\nMiscellaneous text about notes.\n",
    );

    let (_cache, service) = service_with_warm_cache_paths(
        &dir,
        FeatureFlags::default(),
        &["api/opaque.md", "api/other.md"],
    )
    .await;

    let outcome = service
        .find_related(DiscoveryQuery {
            title: "Webhooks".to_string(),
            overview: "Configuring webhooks and callbacks.".to_string(),
            ..DiscoveryQuery::default()
        })
        .await;

    let suggestions = outcome.suggestions();
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].path, "api/opaque.md");
}

#[tokio::test]
async fn test_unavailable_outcome_carries_query_back() {
    let dir = TempDir::new().unwrap();
    let config = DocdexConfig::new().with_root(dir.path().join("nonexistent"));
    let cache = Arc::new(DocumentCache::new(&config));
    let service = DiscoveryService::new(
        Arc::clone(&cache),
        RelevanceEngine::new(config.features),
        config.discovery.clone(),
    );

    let outcome = service
        .find_related(DiscoveryQuery {
            title: "Anything".to_string(),
            overview: "Overview text.".to_string(),
            ..DiscoveryQuery::default()
        })
        .await;

    match outcome {
        DiscoveryOutcome::Unavailable { query, reason } => {
            assert_eq!(query.title, "Anything");
            assert_eq!(query.overview, "Overview text.");
            assert!(!reason.is_empty());
        }
        DiscoveryOutcome::Suggestions(_) => panic!("expected unavailable outcome"),
    }
}
