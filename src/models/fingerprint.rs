//! Fingerprint records used for cheap candidate filtering.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Output of a fingerprint pass: bounded keywords plus a short content hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    /// Extracted keywords (≤ 20, lowercase, stop-word filtered).
    pub keywords: Vec<String>,
    /// Truncated digest of the scanned bytes.
    pub content_hash: String,
}

/// Lightweight per-document record held by the fingerprint index and the
/// cache's fingerprint listing.
///
/// A fingerprint entry is a preview-based approximation: it is built from a
/// bounded content prefix and may diverge from the full document. Staleness
/// is independently verifiable by comparing `last_modified`/`content_hash`
/// against a live filesystem stat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FingerprintEntry {
    /// Relative document path.
    pub path: String,
    /// Keywords extracted from the preview (≤ 20).
    pub keywords: Vec<String>,
    /// Filesystem mtime when the fingerprint was taken.
    pub last_modified: DateTime<Utc>,
    /// File size in bytes when the fingerprint was taken.
    pub size: u64,
    /// Truncated digest of the scanned preview bytes.
    pub content_hash: String,
    /// Namespace derived from the path.
    pub namespace: String,
}

/// Options for listing document fingerprints.
#[derive(Debug, Clone, Default)]
pub struct FingerprintListOptions {
    /// Re-fingerprint entries whose mtime disagrees with the live file.
    pub refresh_stale: bool,
    /// Restrict the listing to one namespace.
    pub namespace: Option<String>,
}

/// Diagnostic statistics for the fingerprint index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexStats {
    /// Number of fingerprinted documents.
    pub documents: usize,
    /// Number of distinct keywords with live postings.
    pub keywords: usize,
    /// Mean keywords per document.
    pub avg_keywords_per_document: f64,
}
