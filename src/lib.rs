//! # Docdex
//!
//! An in-memory document cache and related-document discovery engine for
//! Markdown documentation servers.
//!
//! Docdex keeps an invalidation-safe, size-bounded representation of a tree of
//! Markdown documents (headings, table of contents, O(1) section lookup) and
//! finds documents related to a piece of text using a cheap fingerprint
//! pre-filter followed by multi-factor relevance scoring.
//!
//! ## Features
//!
//! - Lazy document parsing with boost-aware LRU/MRU eviction
//! - File-watcher-driven invalidation with a polling fallback
//! - Inverted keyword index built from bounded content previews
//! - Weighted keyword extraction with front-matter short-circuit
//! - Bounded five-factor relevance score with human-readable explanations
//! - Two-stage related-document discovery that degrades gracefully
//!
//! ## Example
//!
//! ```rust,ignore
//! use docdex::{AccessContext, DiscoveryQuery, DiscoveryService, DocumentCache};
//!
//! let cache = Arc::new(DocumentCache::new(&config));
//! let doc = cache.get_document("api/authentication.md", AccessContext::Direct).await?;
//! let discovery = DiscoveryService::new(cache, engine, settings);
//! let related = discovery.find_related(DiscoveryQuery {
//!     title: "Token refresh".to_string(),
//!     overview: "Rotating OAuth tokens without downtime".to_string(),
//!     ..Default::default()
//! }).await;
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

use std::path::PathBuf;
use thiserror::Error as ThisError;

// Module declarations
pub mod cache;
pub mod config;
pub mod discovery;
pub mod fingerprint;
pub mod index;
pub mod io;
pub mod markdown;
pub mod models;
pub mod observability;
pub mod relevance;

// Re-exports for convenience
pub use cache::{CacheWatchdog, DocumentCache, WatchMode, WatchdogHandle};
pub use config::{CacheSettings, DiscoverySettings, DocdexConfig, FeatureFlags, WatchSettings};
pub use discovery::{DiscoveryOutcome, DiscoveryQuery, DiscoveryService};
pub use index::FingerprintIndex;
pub use models::{
    AccessContext, CachedDocument, DocumentMetadata, EvictionPolicy, FingerprintEntry,
    InvalidationEvent, InvalidationKind, RelatedDocument, RelevanceScore, WeightedKeyword,
};
pub use relevance::RelevanceEngine;

/// Error type for docdex operations.
///
/// Uses `thiserror` for automatic `Display` and `Error` trait implementations.
///
/// Absence (a missing document or section) is never an error: lookups return
/// `Ok(None)` and callers branch on the option. Errors are reserved for
/// malformed caller input, genuine I/O failures, write-precondition conflicts,
/// and internal structural failures.
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    ///
    /// Raised when:
    /// - Front matter is present but its YAML cannot be parsed
    /// - Non-string or otherwise malformed content reaches a parser
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A section slug does not match the expected slug syntax.
    ///
    /// Slugs are lowercase alphanumerics separated by single hyphens. This is
    /// a caller error, distinct from a well-formed slug that simply is not
    /// present in a document (which yields `Ok(None)`).
    #[error("invalid slug syntax: '{slug}'")]
    InvalidSlug {
        /// The offending slug value.
        slug: String,
    },

    /// A structural limit was exceeded while parsing a document.
    ///
    /// Raised when a document carries more headings than the configured
    /// ceiling, or a heading title exceeds the maximum length.
    #[error("{what} limit exceeded: {actual} > {limit}")]
    LimitExceeded {
        /// What was limited (e.g. "heading count").
        what: &'static str,
        /// The observed value.
        actual: usize,
        /// The enforced limit.
        limit: usize,
    },

    /// An I/O operation failed for a reason other than absence.
    ///
    /// Permission errors, disk failures, and encoding failures land here.
    /// A file that does not exist is reported as `Ok(None)` by lookups, never
    /// as this variant.
    #[error("i/o failure during {operation} on {path}: {source}")]
    Io {
        /// The operation that failed.
        operation: &'static str,
        /// The path involved.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A write precondition failed because the file changed since it was read.
    ///
    /// Surfaced distinctly so the manager layer can decide retry-vs-abort.
    #[error("write conflict: {path} was modified since last read")]
    WriteConflict {
        /// The path that was concurrently modified.
        path: PathBuf,
    },

    /// An operation failed.
    ///
    /// Raised when:
    /// - A lock is poisoned
    /// - Directory enumeration fails wholesale
    /// - Configuration cannot be read or parsed
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

impl Error {
    /// Builds a lock-poisoning error for the named operation.
    pub(crate) fn lock_poisoned(operation: &str) -> Self {
        Self::OperationFailed {
            operation: operation.to_string(),
            cause: "lock poisoned".to_string(),
        }
    }
}

/// Result type alias for docdex operations.
pub type Result<T> = std::result::Result<T, Error>;
