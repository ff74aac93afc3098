//! Document cache: the authoritative, invalidation-safe, size-bounded
//! in-memory store of parsed document structure.
//!
//! Each cache slot moves through Absent → Loading → Cached and back to
//! Absent via invalidation or eviction. There is no cached-but-dirty
//! state: any detected change drops the whole entry, and the next access
//! re-reads from source.

mod watcher;

pub use watcher::{CacheWatchdog, WatchMode, WatchdogHandle};

use crate::config::{CacheSettings, DocdexConfig};
use crate::fingerprint::{fingerprint, preview_of, short_hash};
use crate::io::{FileSnapshot, FileStore};
use crate::markdown::{HeadingScanner, StructureParser};
use crate::models::{
    AccessContext, CacheStats, CachedDocument, DocumentMetadata, DocumentStructure, EvictionPolicy,
    FingerprintEntry, FingerprintListOptions, InvalidationEvent, InvalidationKind, namespace_of,
    title_from_path,
};
use crate::{Error, Result};
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Capacity of the invalidation broadcast channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Slug syntax accepted by section lookup: hyphen-separated runs of
/// lowercase or uncased letters, combining marks, and digits. Covers the
/// full alphabet the built-in scanner emits, non-ASCII headings included.
static SLUG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[\p{Ll}\p{Lo}\p{Lm}\p{M}\p{N}]+(?:-[\p{Ll}\p{Lo}\p{Lm}\p{M}\p{N}]+)*$")
        .expect("slug regex")
});

/// Markdown inline links, counted for metadata.
static LINK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[[^\]]*\]\([^)]*\)").expect("link regex"));

/// Per-entry access bookkeeping. Destroyed with the entry.
#[derive(Debug, Clone, Copy)]
struct AccessRecord {
    /// Monotonic access tick; higher means more recent.
    tick: u64,
    /// Context of the most recent access.
    context: AccessContext,
}

/// Mutable cache state behind one lock.
#[derive(Default)]
struct CacheState {
    documents: HashMap<String, Arc<CachedDocument>>,
    access: HashMap<String, AccessRecord>,
    fingerprints: HashMap<String, FingerprintEntry>,
    tick: u64,
    generation: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
    invalidations: u64,
}

/// In-memory cache of parsed Markdown documents.
pub struct DocumentCache {
    store: FileStore,
    parser: Arc<dyn StructureParser>,
    settings: CacheSettings,
    state: RwLock<CacheState>,
    events: broadcast::Sender<InvalidationEvent>,
}

impl DocumentCache {
    /// Creates a cache for the configured document root.
    #[must_use]
    pub fn new(config: &DocdexConfig) -> Self {
        let parser = HeadingScanner::new(
            config.cache.max_headings,
            config.cache.max_heading_title_len,
        );
        Self::with_parser(config, Arc::new(parser))
    }

    /// Creates a cache with an explicit structure parser.
    #[must_use]
    pub fn with_parser(config: &DocdexConfig, parser: Arc<dyn StructureParser>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            store: FileStore::new(&config.root),
            parser,
            settings: config.cache.clone(),
            state: RwLock::new(CacheState::default()),
            events,
        }
    }

    /// The underlying file store.
    #[must_use]
    pub fn store(&self) -> &FileStore {
        &self.store
    }

    /// Subscribes to the cache's invalidation feed.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<InvalidationEvent> {
        self.events.subscribe()
    }

    /// Fetches a document, loading and parsing it on first access.
    ///
    /// Records the access under `context` for boost-aware eviction and
    /// returns a shared read-only view. A missing file yields `Ok(None)`;
    /// I/O and parse failures propagate.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure, structural-limit violations, or a
    /// poisoned lock.
    pub async fn get_document(
        &self,
        path: &str,
        context: AccessContext,
    ) -> Result<Option<Arc<CachedDocument>>> {
        // Fast path: already cached.
        {
            let mut state = self
                .state
                .write()
                .map_err(|_| Error::lock_poisoned("get_document"))?;
            if let Some(doc) = state.documents.get(path).cloned() {
                state.hits += 1;
                record_access(&mut state, path, context);
                return Ok(Some(doc));
            }
        }

        let Some(snapshot) = self.store.read_snapshot(path).await? else {
            let mut state = self
                .state
                .write()
                .map_err(|_| Error::lock_poisoned("get_document"))?;
            state.misses += 1;
            return Ok(None);
        };

        let document = self.parse_document(path, &snapshot)?;
        let entry = fingerprint_entry_of(&document.metadata);
        let document = Arc::new(document);

        let mut state = self
            .state
            .write()
            .map_err(|_| Error::lock_poisoned("get_document"))?;
        state.misses += 1;
        state.documents.insert(path.to_string(), Arc::clone(&document));
        state.fingerprints.insert(path.to_string(), entry);
        record_access(&mut state, path, context);
        self.enforce_size_limit(&mut state);

        Ok(Some(document))
    }

    /// Re-reads a document's raw content without touching the cache.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure.
    pub async fn get_document_content(&self, path: &str) -> Result<Option<String>> {
        Ok(self
            .store
            .read_snapshot(path)
            .await?
            .map(|snapshot| snapshot.content))
    }

    /// Extracts one section's body by slug.
    ///
    /// Slug existence is checked against the O(1) slug index before any
    /// extraction. Section bodies are never cached; each call re-reads and
    /// re-slices the source. Absent documents or slugs yield `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSlug` for malformed slug syntax, or an I/O error if
    /// the re-read fails.
    pub async fn get_section_content(&self, path: &str, slug: &str) -> Result<Option<String>> {
        if !SLUG_RE.is_match(slug) {
            return Err(Error::InvalidSlug {
                slug: slug.to_string(),
            });
        }

        let Some(document) = self.get_document(path, AccessContext::Direct).await? else {
            return Ok(None);
        };
        let Some(heading) = document.structure.heading_by_slug(slug) else {
            return Ok(None);
        };

        let Some(snapshot) = self.store.read_snapshot(path).await? else {
            return Ok(None);
        };

        let end_line = document
            .structure
            .headings
            .iter()
            .skip(heading.index + 1)
            .find(|h| h.depth <= heading.depth)
            .map(|h| h.line);

        let section: Vec<&str> = snapshot
            .content
            .lines()
            .enumerate()
            .filter(|&(line_no, _)| line_no >= heading.line && end_line.is_none_or(|e| line_no < e))
            .map(|(_, line)| line)
            .collect();

        Ok(Some(section.join("\n")))
    }

    /// Invalidates one document, dropping every trace of it.
    ///
    /// The cached entry, its access record, and its fingerprint entry are
    /// removed together; the generation counter is bumped and an event is
    /// published for subscribers such as the fingerprint index. Returns
    /// whether anything was actually tracked.
    ///
    /// # Errors
    ///
    /// Returns an error if a lock is poisoned.
    pub fn invalidate_document(&self, path: &str) -> Result<bool> {
        self.invalidate_with_kind(path, InvalidationKind::Changed)
    }

    /// Invalidates every tracked document whose path starts with a prefix.
    ///
    /// Used for folder-level moves and archives. Returns the number of
    /// documents invalidated.
    ///
    /// # Errors
    ///
    /// Returns an error if a lock is poisoned.
    pub fn invalidate_by_prefix(&self, prefix: &str) -> Result<usize> {
        let tracked: Vec<String> = {
            let state = self
                .state
                .read()
                .map_err(|_| Error::lock_poisoned("invalidate_by_prefix"))?;
            state
                .documents
                .keys()
                .chain(state.fingerprints.keys())
                .filter(|p| p.starts_with(prefix))
                .cloned()
                .collect::<std::collections::HashSet<_>>()
                .into_iter()
                .collect()
        };

        let mut count = 0;
        for path in tracked {
            if self.invalidate_with_kind(&path, InvalidationKind::Changed)? {
                count += 1;
            }
        }
        info!(prefix = %prefix, count, "invalidated by prefix");
        Ok(count)
    }

    /// Applies one filesystem event observed by the watcher or poller.
    ///
    /// # Errors
    ///
    /// Returns an error if a lock is poisoned.
    pub fn note_file_event(&self, path: &str, kind: InvalidationKind) -> Result<()> {
        match kind {
            InvalidationKind::Added => {
                // Nothing cached yet; just announce the new file.
                let generation = {
                    let state = self
                        .state
                        .read()
                        .map_err(|_| Error::lock_poisoned("note_file_event"))?;
                    state.generation
                };
                let _ = self.events.send(InvalidationEvent {
                    path: path.to_string(),
                    kind,
                    generation,
                });
            }
            InvalidationKind::Changed | InvalidationKind::Removed => {
                self.invalidate_with_kind(path, kind)?;
            }
        }
        Ok(())
    }

    /// Checks whether a cached fingerprint disagrees with the live file.
    ///
    /// Compares the recorded mtime and size against a fresh stat first and
    /// falls back to re-hashing the bounded preview when only the mtime
    /// moved. Never forces a full document reload. An untracked path or a
    /// deleted file is reported stale.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure or a poisoned lock.
    pub async fn is_fingerprint_stale(&self, path: &str) -> Result<bool> {
        let entry = {
            let state = self
                .state
                .read()
                .map_err(|_| Error::lock_poisoned("is_fingerprint_stale"))?;
            state.fingerprints.get(path).cloned()
        };
        let Some(entry) = entry else {
            return Ok(true);
        };

        let Some(stat) = self.store.stat(path).await? else {
            return Ok(true);
        };
        if stat.size != entry.size {
            return Ok(true);
        }
        if stat.modified == entry.last_modified {
            return Ok(false);
        }

        // The mtime moved (e.g. a touch or an in-place rewrite); confirm
        // via the preview hash before declaring staleness.
        let Some((preview, _)) = self.store.read_preview(path).await? else {
            return Ok(true);
        };
        Ok(short_hash(preview.as_bytes()) != entry.content_hash)
    }

    /// Lists tracked fingerprint entries.
    ///
    /// With `refresh_stale`, entries whose files changed are
    /// re-fingerprinted in place (keywords and preview hash together) and
    /// entries for deleted files are invalidated and omitted.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure or a poisoned lock.
    pub async fn list_fingerprints(
        &self,
        options: FingerprintListOptions,
    ) -> Result<Vec<FingerprintEntry>> {
        let snapshot: Vec<FingerprintEntry> = {
            let state = self
                .state
                .read()
                .map_err(|_| Error::lock_poisoned("list_fingerprints"))?;
            state.fingerprints.values().cloned().collect()
        };

        let mut result = Vec::with_capacity(snapshot.len());
        for entry in snapshot {
            if let Some(namespace) = &options.namespace {
                if &entry.namespace != namespace {
                    continue;
                }
            }

            if options.refresh_stale && self.is_fingerprint_stale(&entry.path).await? {
                match self.refresh_fingerprint(&entry.path).await? {
                    Some(refreshed) => result.push(refreshed),
                    None => {
                        self.invalidate_with_kind(&entry.path, InvalidationKind::Removed)?;
                    }
                }
            } else {
                result.push(entry);
            }
        }

        result.sort_unstable_by(|a, b| a.path.cmp(&b.path));
        Ok(result)
    }

    /// Paths the cache currently tracks fingerprints for.
    ///
    /// # Errors
    ///
    /// Returns an error if a lock is poisoned.
    pub fn tracked_paths(&self) -> Result<Vec<String>> {
        let state = self
            .state
            .read()
            .map_err(|_| Error::lock_poisoned("tracked_paths"))?;
        let mut paths: Vec<String> = state.fingerprints.keys().cloned().collect();
        paths.sort_unstable();
        Ok(paths)
    }

    /// Re-stats every tracked path and invalidates disagreeing entries.
    ///
    /// This is the polling fallback's consistency pass; it also serves
    /// after bulk operations when watcher delivery is in doubt. Returns
    /// the number of invalidated documents.
    ///
    /// # Errors
    ///
    /// Returns an error if a lock is poisoned. Per-path stat failures are
    /// treated as removals rather than propagated.
    pub async fn poll_for_changes(&self) -> Result<usize> {
        let tracked = {
            let state = self
                .state
                .read()
                .map_err(|_| Error::lock_poisoned("poll_for_changes"))?;
            state.fingerprints.clone()
        };

        let mut invalidated = 0;
        for (path, entry) in tracked {
            let stat = match self.store.stat(&path).await {
                Ok(stat) => stat,
                Err(_) => None,
            };
            match stat {
                None => {
                    self.invalidate_with_kind(&path, InvalidationKind::Removed)?;
                    invalidated += 1;
                }
                Some(stat)
                    if stat.modified != entry.last_modified || stat.size != entry.size =>
                {
                    self.invalidate_with_kind(&path, InvalidationKind::Changed)?;
                    invalidated += 1;
                }
                Some(_) => {}
            }
        }

        if invalidated > 0 {
            debug!(invalidated, "polling pass invalidated documents");
        }
        Ok(invalidated)
    }

    /// Diagnostic counters.
    ///
    /// # Errors
    ///
    /// Returns an error if a lock is poisoned.
    pub fn stats(&self) -> Result<CacheStats> {
        let state = self
            .state
            .read()
            .map_err(|_| Error::lock_poisoned("stats"))?;
        Ok(CacheStats {
            cached_documents: state.documents.len(),
            fingerprint_entries: state.fingerprints.len(),
            hits: state.hits,
            misses: state.misses,
            evictions: state.evictions,
            invalidations: state.invalidations,
            generation: state.generation,
        })
    }

    fn invalidate_with_kind(&self, path: &str, kind: InvalidationKind) -> Result<bool> {
        let (removed, generation) = {
            let mut state = self
                .state
                .write()
                .map_err(|_| Error::lock_poisoned("invalidate_document"))?;
            let removed = state.documents.remove(path).is_some()
                | state.access.remove(path).is_some()
                | state.fingerprints.remove(path).is_some();
            state.generation += 1;
            if removed {
                state.invalidations += 1;
            }
            (removed, state.generation)
        };

        let _ = self.events.send(InvalidationEvent {
            path: path.to_string(),
            kind,
            generation,
        });
        debug!(path = %path, ?kind, removed, "invalidated document");
        Ok(removed)
    }

    async fn refresh_fingerprint(&self, path: &str) -> Result<Option<FingerprintEntry>> {
        let Some((preview, stat)) = self.store.read_preview(path).await? else {
            return Ok(None);
        };

        let title = title_from_path(path);
        let fp = fingerprint(&title, &preview);
        let entry = FingerprintEntry {
            path: path.to_string(),
            keywords: fp.keywords,
            last_modified: stat.modified,
            size: stat.size,
            content_hash: fp.content_hash,
            namespace: namespace_of(path),
        };

        let mut state = self
            .state
            .write()
            .map_err(|_| Error::lock_poisoned("refresh_fingerprint"))?;
        state.fingerprints.insert(path.to_string(), entry.clone());
        // The parsed structure may no longer match the refreshed file.
        if state.documents.remove(path).is_some() {
            state.access.remove(path);
            state.invalidations += 1;
            state.generation += 1;
        }
        Ok(Some(entry))
    }

    fn parse_document(&self, path: &str, snapshot: &FileSnapshot) -> Result<CachedDocument> {
        let content = &snapshot.content;
        let headings = self.parser.list_headings(content)?;
        let toc = self.parser.build_toc(content)?;

        let title = headings
            .iter()
            .find(|h| h.depth == 1)
            .map_or_else(|| title_from_path(path), |h| h.title.clone());

        let fp = fingerprint(&title, content);
        let preview_hash = short_hash(preview_of(content).as_bytes());

        let generation = {
            let state = self
                .state
                .read()
                .map_err(|_| Error::lock_poisoned("parse_document"))?;
            state.generation
        };

        let metadata = DocumentMetadata {
            path: path.to_string(),
            title,
            last_modified: snapshot.stat.modified,
            size: snapshot.stat.size,
            content_hash: short_hash(content.as_bytes()),
            word_count: content.split_whitespace().count(),
            link_count: LINK_RE.find_iter(content).count(),
            code_block_count: count_code_blocks(content),
            cache_generation: generation,
            namespace: namespace_of(path),
            keywords: fp.keywords,
            preview_hash,
            fingerprint_generated: Utc::now(),
        };

        Ok(CachedDocument {
            metadata,
            structure: DocumentStructure::new(headings, toc),
        })
    }

    /// Evicts entries until the cache is back under its size limit.
    fn enforce_size_limit(&self, state: &mut CacheState) {
        while state.documents.len() > self.settings.max_cache_size {
            let victim = select_victim(state, self.settings.eviction_policy, &self.settings);
            let Some(path) = victim else { break };
            state.documents.remove(&path);
            state.access.remove(&path);
            // The file itself is unchanged, so its fingerprint stays valid
            // and remains available to discovery.
            state.evictions += 1;
            debug!(path = %path, "evicted document");
        }
    }
}

/// Picks the eviction victim under the boosted recency ordering.
fn select_victim(
    state: &CacheState,
    policy: EvictionPolicy,
    settings: &CacheSettings,
) -> Option<String> {
    let scored = state.documents.keys().map(|path| {
        let score = state.access.get(path).map_or(0.0, |record| {
            #[allow(clippy::cast_precision_loss)]
            let recency = record.tick as f64;
            recency * settings.boosts.for_context(record.context)
        });
        (path, score)
    });

    let victim = match policy {
        EvictionPolicy::Lru => scored.min_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(b.0))
        }),
        EvictionPolicy::Mru => scored.max_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.0.cmp(a.0))
        }),
    };

    victim.map(|(path, _)| path.clone())
}

fn record_access(state: &mut CacheState, path: &str, context: AccessContext) {
    state.tick += 1;
    let tick = state.tick;
    state
        .access
        .insert(path.to_string(), AccessRecord { tick, context });
}

fn fingerprint_entry_of(metadata: &DocumentMetadata) -> FingerprintEntry {
    FingerprintEntry {
        path: metadata.path.clone(),
        keywords: metadata.keywords.clone(),
        last_modified: metadata.last_modified,
        size: metadata.size,
        content_hash: metadata.preview_hash.clone(),
        namespace: metadata.namespace.clone(),
    }
}

fn count_code_blocks(content: &str) -> usize {
    let fences = content
        .lines()
        .filter(|line| {
            let trimmed = line.trim_start();
            trimmed.starts_with("```") || trimmed.starts_with("~~~")
        })
        .count();
    fences / 2
}
