//! Cache invalidation events.
//!
//! The cache publishes these on a broadcast channel instead of exposing
//! emitter semantics; consumers such as the fingerprint index subscribe
//! explicitly.

use serde::{Deserialize, Serialize};

/// What happened to a document on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvalidationKind {
    /// A new file appeared.
    Added,
    /// An existing file's content changed.
    Changed,
    /// The file was removed.
    Removed,
}

/// A single invalidation notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidationEvent {
    /// Relative document path.
    pub path: String,
    /// What happened.
    pub kind: InvalidationKind,
    /// Cache generation after the event was applied.
    pub generation: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = InvalidationEvent {
            path: "api/auth.md".to_string(),
            kind: InvalidationKind::Changed,
            generation: 7,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("changed"));
        assert!(json.contains("api/auth.md"));
    }
}
