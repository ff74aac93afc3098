//! Core domain models.

mod document;
mod events;
mod fingerprint;
mod relevance;
mod structure;

pub use document::{
    AccessContext, CacheStats, CachedDocument, DocumentMetadata, EvictionPolicy, namespace_of,
    title_from_path,
};
pub use events::{InvalidationEvent, InvalidationKind};
pub use fingerprint::{Fingerprint, FingerprintEntry, FingerprintListOptions, IndexStats};
pub use relevance::{
    DocumentSignals, KeywordSource, RelatedDocument, RelevanceScore, WeightedKeyword,
};
pub use structure::{DocumentStructure, Heading, TocNode};
