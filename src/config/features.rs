//! Runtime feature flags.

/// Feature flags controlling optional scoring behavior.
///
/// Flags default to the conservative setting; enabling one is an explicit
/// decision by the embedding server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureFlags {
    /// Whether the link-graph relevance factor participates in scoring.
    ///
    /// The factor detects explicit reference tokens with a cheap pattern
    /// match rather than full reference resolution, so it stays off until
    /// the embedding server opts in.
    pub link_graph_boost: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            link_graph_boost: false,
        }
    }
}

impl FeatureFlags {
    /// Creates flags with everything at its default.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables the link-graph boost factor.
    #[must_use]
    pub const fn with_link_graph_boost(mut self, enabled: bool) -> Self {
        self.link_graph_boost = enabled;
        self
    }
}
