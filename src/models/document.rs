//! Cached document metadata and access classification.

use crate::models::structure::DocumentStructure;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The purpose under which a document was accessed.
///
/// Drives boost-aware eviction: documents pulled in as references of another
/// document are costlier to re-fetch contextually and default to a stronger
/// boost than search- or direct-driven accesses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessContext {
    /// Accessed while serving a search request.
    Search,
    /// Fetched directly by path.
    Direct,
    /// Loaded because another document references it.
    Reference,
}

/// Which end of the boosted recency ordering gets evicted first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionPolicy {
    /// Evict the entry with the lowest boosted recency score.
    #[default]
    Lru,
    /// Evict the entry with the highest boosted recency score.
    Mru,
}

impl EvictionPolicy {
    /// Parses a policy name, defaulting to LRU for unknown values.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "mru" => Self::Mru,
            _ => Self::Lru,
        }
    }
}

/// Metadata for one cached document path.
///
/// `content_hash` tracks the full document bytes while `preview_hash` and
/// `keywords` are regenerated together from the fingerprint pass; the latter
/// two must never be updated independently or staleness checks against the
/// live file become unsound.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Relative, namespace-qualified path.
    pub path: String,
    /// Document title (first H1, falling back to the file stem).
    pub title: String,
    /// Filesystem mtime at load time.
    pub last_modified: DateTime<Utc>,
    /// File size in bytes at load time.
    pub size: u64,
    /// Truncated digest of the full raw bytes.
    pub content_hash: String,
    /// Whitespace-delimited word count.
    pub word_count: usize,
    /// Markdown link count.
    pub link_count: usize,
    /// Fenced code block count.
    pub code_block_count: usize,
    /// Cache generation the entry was created under.
    pub cache_generation: u64,
    /// Logical grouping derived from the path's directory segments.
    pub namespace: String,
    /// Fingerprint keywords (bounded, lowercase, stop-word filtered).
    pub keywords: Vec<String>,
    /// Truncated digest of the content preview the fingerprint was built from.
    pub preview_hash: String,
    /// When the fingerprint (keywords + preview hash) was last generated.
    pub fingerprint_generated: DateTime<Utc>,
}

impl DocumentMetadata {
    /// Applies a freshly computed fingerprint.
    ///
    /// Keywords and the preview hash change as a unit; this is the only
    /// sanctioned way to update either.
    pub fn apply_fingerprint(&mut self, fingerprint: crate::models::Fingerprint) {
        self.keywords = fingerprint.keywords;
        self.preview_hash = fingerprint.content_hash;
        self.fingerprint_generated = Utc::now();
    }
}

/// A fully parsed, cached document.
///
/// Owned exclusively by the cache; callers receive shared read-only views.
/// Replaced wholesale on invalidation, never patched in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedDocument {
    /// Per-path metadata.
    pub metadata: DocumentMetadata,
    /// Parsed headings, table of contents, and slug index.
    pub structure: DocumentStructure,
}

/// Diagnostic counters for the document cache.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of currently cached documents.
    pub cached_documents: usize,
    /// Number of tracked fingerprint entries.
    pub fingerprint_entries: usize,
    /// Cache hits since startup.
    pub hits: u64,
    /// Cache misses since startup.
    pub misses: u64,
    /// Entries evicted since startup.
    pub evictions: u64,
    /// Entries invalidated since startup.
    pub invalidations: u64,
    /// Current cache generation.
    pub generation: u64,
}

/// Derives the namespace from a document path's directory segments.
///
/// `api/specs/auth.md` → `api/specs`; a file at the tree root lands in the
/// `root` namespace.
#[must_use]
pub fn namespace_of(path: &str) -> String {
    let normalized = path.replace('\\', "/");
    match normalized.rsplit_once('/') {
        Some((dir, _)) if !dir.is_empty() => dir.to_string(),
        _ => "root".to_string(),
    }
}

/// Derives a human-readable fallback title from a file path's stem.
#[must_use]
pub fn title_from_path(path: &str) -> String {
    std::path::Path::new(path)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(path)
        .replace(['-', '_'], " ")
}
