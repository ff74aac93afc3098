//! Configuration management.

mod features;

pub use features::FeatureFlags;

use crate::models::EvictionPolicy;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration for docdex.
///
/// One `DocdexConfig` is built per server/session and handed to every
/// consumer; there is no ambient global configuration.
#[derive(Debug, Clone)]
pub struct DocdexConfig {
    /// Root of the Markdown document tree.
    pub root: PathBuf,
    /// Document cache settings.
    pub cache: CacheSettings,
    /// Watcher and polling-fallback settings.
    pub watch: WatchSettings,
    /// Related-document discovery settings.
    pub discovery: DiscoverySettings,
    /// Feature flags.
    pub features: FeatureFlags,
}

/// Settings for the document cache.
#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// Maximum number of cached documents before eviction kicks in.
    pub max_cache_size: usize,
    /// Which end of the boosted recency ordering gets evicted.
    pub eviction_policy: EvictionPolicy,
    /// Per-access-context boost multipliers.
    pub boosts: AccessBoosts,
    /// Maximum headings accepted per document.
    pub max_headings: usize,
    /// Maximum length of a single heading title, in characters.
    pub max_heading_title_len: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_cache_size: 100,
            eviction_policy: EvictionPolicy::Lru,
            boosts: AccessBoosts::default(),
            max_headings: 1000,
            max_heading_title_len: 200,
        }
    }
}

/// Multiplicative boost factors applied to an access's recency score.
///
/// Reference-loaded documents are costlier to re-fetch contextually than
/// search hits, so they default to a stronger boost and survive
/// search-driven churn longer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccessBoosts {
    /// Boost for accesses made while serving a search.
    pub search: f64,
    /// Boost for direct document fetches.
    pub direct: f64,
    /// Boost for documents pulled in as references of another document.
    pub reference: f64,
}

impl Default for AccessBoosts {
    fn default() -> Self {
        Self {
            search: 1.0,
            direct: 1.0,
            reference: 2.0,
        }
    }
}

/// Settings for watcher-driven invalidation and its polling fallback.
#[derive(Debug, Clone)]
pub struct WatchSettings {
    /// Interval between filesystem re-stats once in polling mode.
    pub poll_interval: Duration,
    /// Watcher restart attempts before switching to polling permanently.
    pub max_watch_retries: u32,
    /// Base delay for exponential watcher-restart backoff.
    pub backoff_base: Duration,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            max_watch_retries: 5,
            backoff_base: Duration::from_secs(1),
        }
    }
}

/// Settings for two-stage related-document discovery.
///
/// The threshold and caps are bounding mechanisms, not load-bearing
/// correctness constants; their defaults were chosen empirically.
#[derive(Debug, Clone)]
pub struct DiscoverySettings {
    /// Minimum Stage-1 fingerprint overlap for a document to survive.
    pub candidate_threshold: f64,
    /// Maximum candidates passed to Stage-2 full scoring.
    pub max_candidates: usize,
    /// Default cap on the returned suggestion list.
    pub max_suggestions: usize,
    /// Re-fingerprint stale entries before Stage-1 filtering, so changes
    /// that slipped past the watcher and poller still surface.
    pub refresh_stale_fingerprints: bool,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            candidate_threshold: 0.1,
            max_candidates: 20,
            max_suggestions: 5,
            refresh_stale_fingerprints: true,
        }
    }
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Document tree root.
    pub root: Option<String>,
    /// Cache section.
    pub cache: Option<ConfigFileCache>,
    /// Watch section.
    pub watch: Option<ConfigFileWatch>,
    /// Discovery section.
    pub discovery: Option<ConfigFileDiscovery>,
    /// Feature flags.
    pub features: Option<ConfigFileFeatures>,
}

/// Cache section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileCache {
    /// Maximum cached documents.
    pub max_cache_size: Option<usize>,
    /// Eviction policy name ("lru" or "mru").
    pub eviction_policy: Option<String>,
    /// Search access boost.
    pub search_boost: Option<f64>,
    /// Direct access boost.
    pub direct_boost: Option<f64>,
    /// Reference access boost.
    pub reference_boost: Option<f64>,
}

/// Watch section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileWatch {
    /// Polling interval in seconds.
    pub poll_interval_secs: Option<u64>,
    /// Watcher restart attempts before polling.
    pub max_watch_retries: Option<u32>,
}

/// Discovery section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileDiscovery {
    /// Stage-1 overlap threshold.
    pub candidate_threshold: Option<f64>,
    /// Stage-2 candidate cap.
    pub max_candidates: Option<usize>,
    /// Suggestion list cap.
    pub max_suggestions: Option<usize>,
    /// Refresh stale fingerprints before Stage 1.
    pub refresh_stale_fingerprints: Option<bool>,
}

/// Features section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileFeatures {
    /// Link-graph boost factor.
    pub link_graph_boost: Option<bool>,
}

impl Default for DocdexConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            cache: CacheSettings::default(),
            watch: WatchSettings::default(),
            discovery: DiscoverySettings::default(),
            features: FeatureFlags::default(),
        }
    }
}

impl DocdexConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &std::path::Path) -> crate::Result<Self> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| crate::Error::OperationFailed {
                operation: "read_config_file".to_string(),
                cause: e.to_string(),
            })?;

        let file: ConfigFile =
            toml::from_str(&contents).map_err(|e| crate::Error::OperationFailed {
                operation: "parse_config_file".to_string(),
                cause: e.to_string(),
            })?;

        Ok(Self::from_config_file(file))
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the platform-specific config dir first, then an XDG-style
    /// `~/.config/docdex/` for Unix compatibility. Returns the default
    /// configuration if no config file is found.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };

        let platform_config = base_dirs.config_dir().join("docdex").join("config.toml");
        if platform_config.exists() {
            if let Ok(config) = Self::load_from_file(&platform_config) {
                return config;
            }
        }

        let xdg_config = base_dirs
            .home_dir()
            .join(".config")
            .join("docdex")
            .join("config.toml");
        if xdg_config.exists() {
            if let Ok(config) = Self::load_from_file(&xdg_config) {
                return config;
            }
        }

        Self::default()
    }

    /// Converts a `ConfigFile` to `DocdexConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(root) = file.root {
            config.root = PathBuf::from(root);
        }
        if let Some(cache) = file.cache {
            if let Some(v) = cache.max_cache_size {
                config.cache.max_cache_size = v;
            }
            if let Some(policy) = cache.eviction_policy {
                config.cache.eviction_policy = EvictionPolicy::parse(&policy);
            }
            if let Some(v) = cache.search_boost {
                config.cache.boosts.search = v;
            }
            if let Some(v) = cache.direct_boost {
                config.cache.boosts.direct = v;
            }
            if let Some(v) = cache.reference_boost {
                config.cache.boosts.reference = v;
            }
        }
        if let Some(watch) = file.watch {
            if let Some(secs) = watch.poll_interval_secs {
                config.watch.poll_interval = Duration::from_secs(secs);
            }
            if let Some(v) = watch.max_watch_retries {
                config.watch.max_watch_retries = v;
            }
        }
        if let Some(discovery) = file.discovery {
            if let Some(v) = discovery.candidate_threshold {
                config.discovery.candidate_threshold = v;
            }
            if let Some(v) = discovery.max_candidates {
                config.discovery.max_candidates = v;
            }
            if let Some(v) = discovery.max_suggestions {
                config.discovery.max_suggestions = v;
            }
            if let Some(v) = discovery.refresh_stale_fingerprints {
                config.discovery.refresh_stale_fingerprints = v;
            }
        }
        if let Some(features) = file.features {
            if let Some(v) = features.link_graph_boost {
                config.features.link_graph_boost = v;
            }
        }

        config
    }

    /// Sets the document tree root.
    #[must_use]
    pub fn with_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.root = path.into();
        self
    }

    /// Sets the cache settings.
    #[must_use]
    pub fn with_cache(mut self, cache: CacheSettings) -> Self {
        self.cache = cache;
        self
    }

    /// Sets the discovery settings.
    #[must_use]
    pub fn with_discovery(mut self, discovery: DiscoverySettings) -> Self {
        self.discovery = discovery;
        self
    }

    /// Sets the feature flags.
    #[must_use]
    pub const fn with_features(mut self, features: FeatureFlags) -> Self {
        self.features = features;
        self
    }
}

impl AccessBoosts {
    /// Returns the boost multiplier for an access context.
    #[must_use]
    pub const fn for_context(&self, context: crate::models::AccessContext) -> f64 {
        match context {
            crate::models::AccessContext::Search => self.search,
            crate::models::AccessContext::Direct => self.direct,
            crate::models::AccessContext::Reference => self.reference,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AccessContext;

    #[test]
    fn test_default_boosts() {
        let boosts = AccessBoosts::default();
        assert!((boosts.for_context(AccessContext::Search) - 1.0).abs() < f64::EPSILON);
        assert!((boosts.for_context(AccessContext::Direct) - 1.0).abs() < f64::EPSILON);
        assert!((boosts.for_context(AccessContext::Reference) - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_config_from_toml() {
        let toml = r#"
root = "/srv/docs"

[cache]
max_cache_size = 50
eviction_policy = "mru"
reference_boost = 3.0

[watch]
poll_interval_secs = 10
max_watch_retries = 2

[discovery]
candidate_threshold = 0.25
max_candidates = 8
refresh_stale_fingerprints = false

[features]
link_graph_boost = true
"#;
        let file: ConfigFile = toml::from_str(toml).unwrap();
        let config = DocdexConfig::from_config_file(file);

        assert_eq!(config.root, PathBuf::from("/srv/docs"));
        assert_eq!(config.cache.max_cache_size, 50);
        assert_eq!(config.cache.eviction_policy, EvictionPolicy::Mru);
        assert!((config.cache.boosts.reference - 3.0).abs() < f64::EPSILON);
        assert_eq!(config.watch.poll_interval, Duration::from_secs(10));
        assert_eq!(config.watch.max_watch_retries, 2);
        assert!((config.discovery.candidate_threshold - 0.25).abs() < f64::EPSILON);
        assert_eq!(config.discovery.max_candidates, 8);
        assert_eq!(config.discovery.max_suggestions, 5); // untouched default
        assert!(!config.discovery.refresh_stale_fingerprints);
        assert!(config.features.link_graph_boost);
    }

    #[test]
    fn test_builder_methods() {
        let config = DocdexConfig::new()
            .with_root("/tmp/docs")
            .with_features(FeatureFlags::new().with_link_graph_boost(true));
        assert_eq!(config.root, PathBuf::from("/tmp/docs"));
        assert!(config.features.link_graph_boost);
    }
}
