//! Fingerprint index: inverted keyword → document mapping.
//!
//! Built by scanning the document tree once, reading only a bounded preview
//! of each file, then kept current by subscribing to the cache's
//! invalidation feed. Candidate lookup takes the union of postings for the
//! query's tokens: the cheap first pass maximizes recall, and precision is
//! restored by full relevance scoring afterwards.

use crate::fingerprint::{fingerprint, tokenize_keywords};
use crate::io::FileStore;
use crate::models::{
    FingerprintEntry, IndexStats, InvalidationEvent, InvalidationKind, namespace_of, title_from_path,
};
use crate::{Error, Result};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// Inverted index over document fingerprints.
pub struct FingerprintIndex {
    store: FileStore,
    /// keyword → posting set of document paths.
    postings: RwLock<HashMap<String, HashSet<String>>>,
    /// path → fingerprint entry.
    entries: RwLock<HashMap<String, FingerprintEntry>>,
    initialized: AtomicBool,
}

impl FingerprintIndex {
    /// Creates an empty index over the given store.
    #[must_use]
    pub fn new(store: FileStore) -> Self {
        Self {
            store,
            postings: RwLock::new(HashMap::new()),
            entries: RwLock::new(HashMap::new()),
            initialized: AtomicBool::new(false),
        }
    }

    /// Scans the document tree and populates the index.
    ///
    /// Reads only the first preview bytes of each Markdown file. Unreadable
    /// files are logged and skipped so one bad file cannot block indexing
    /// the rest. Calling twice is a no-op with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if the tree cannot be enumerated at all or a lock
    /// is poisoned.
    pub async fn initialize(&self) -> Result<()> {
        if self.initialized.swap(true, Ordering::SeqCst) {
            warn!("fingerprint index already initialized, ignoring");
            return Ok(());
        }

        let files = list_markdown_files(self.store.root())?;
        let mut indexed = 0usize;
        for path in files {
            match self.index_document(&path).await {
                Ok(true) => indexed += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(path = %path, error = %e, "skipping unreadable document");
                }
            }
        }

        info!(documents = indexed, "fingerprint index initialized");
        Ok(())
    }

    /// Whether `initialize` has completed (or started).
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Fingerprints one document and adds it to the index.
    ///
    /// Returns `false` when the file no longer exists. The fingerprint
    /// entry is stored before its postings so the index never points at a
    /// path without an entry.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure or a poisoned lock.
    pub async fn index_document(&self, path: &str) -> Result<bool> {
        let Some((preview, stat)) = self.store.read_preview(path).await? else {
            return Ok(false);
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

        {
            let mut entries = self
                .entries
                .write()
                .map_err(|_| Error::lock_poisoned("index_document"))?;
            entries.insert(path.to_string(), entry.clone());
        }
        {
            let mut postings = self
                .postings
                .write()
                .map_err(|_| Error::lock_poisoned("index_document"))?;
            for keyword in &entry.keywords {
                postings
                    .entry(keyword.clone())
                    .or_default()
                    .insert(path.to_string());
            }
        }

        debug!(path = %path, keywords = entry.keywords.len(), "indexed document");
        Ok(true)
    }

    /// Finds candidate documents whose fingerprint contains any query token.
    ///
    /// Union semantics, not intersection. An uninitialized index fails open
    /// and returns every known path with a warning; a query with no
    /// meaningful tokens cannot discriminate and also returns everything;
    /// tokens that match no postings produce a true-negative empty result.
    ///
    /// # Errors
    ///
    /// Returns an error if a lock is poisoned.
    pub fn find_candidates(&self, query: &str) -> Result<Vec<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| Error::lock_poisoned("find_candidates"))?;

        if !self.is_initialized() {
            warn!("find_candidates called before initialization, returning all known paths");
            return Ok(sorted_keys(&entries));
        }

        let tokens = tokenize_keywords(query);
        if tokens.is_empty() {
            return Ok(sorted_keys(&entries));
        }

        let postings = self
            .postings
            .read()
            .map_err(|_| Error::lock_poisoned("find_candidates"))?;

        let mut candidates: HashSet<&str> = HashSet::new();
        for token in &tokens {
            if let Some(paths) = postings.get(token) {
                candidates.extend(paths.iter().map(String::as_str));
            }
        }

        let mut result: Vec<String> = candidates.into_iter().map(str::to_string).collect();
        result.sort_unstable();
        Ok(result)
    }

    /// Removes a document from every posting set and drops its entry.
    ///
    /// Emptied posting sets are deleted to bound memory. Must run before
    /// re-indexing a changed file so no stale postings survive.
    ///
    /// # Errors
    ///
    /// Returns an error if a lock is poisoned.
    pub fn invalidate_document(&self, path: &str) -> Result<()> {
        {
            let mut postings = self
                .postings
                .write()
                .map_err(|_| Error::lock_poisoned("invalidate_document"))?;
            for paths in postings.values_mut() {
                paths.remove(path);
            }
            postings.retain(|_, paths| !paths.is_empty());
        }
        {
            let mut entries = self
                .entries
                .write()
                .map_err(|_| Error::lock_poisoned("invalidate_document"))?;
            entries.remove(path);
        }
        Ok(())
    }

    /// Applies one invalidation event from the cache's feed.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure or a poisoned lock.
    pub async fn apply_event(&self, event: &InvalidationEvent) -> Result<()> {
        match event.kind {
            InvalidationKind::Added => {
                self.index_document(&event.path).await?;
            }
            InvalidationKind::Changed => {
                self.invalidate_document(&event.path)?;
                self.index_document(&event.path).await?;
            }
            InvalidationKind::Removed => {
                self.invalidate_document(&event.path)?;
            }
        }
        Ok(())
    }

    /// Spawns a task applying the cache's invalidation feed to this index.
    ///
    /// The task ends when the sending side is dropped. Lagged receivers
    /// log and continue; a lost event only delays convergence until the
    /// next touch of the same path.
    pub fn spawn_subscriber(
        self: &std::sync::Arc<Self>,
        mut receiver: tokio::sync::broadcast::Receiver<InvalidationEvent>,
    ) -> tokio::task::JoinHandle<()> {
        let index = std::sync::Arc::clone(self);
        tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => {
                        if let Err(e) = index.apply_event(&event).await {
                            warn!(path = %event.path, error = %e, "failed to apply invalidation");
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "invalidation feed lagged");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// Returns a snapshot of one fingerprint entry.
    ///
    /// # Errors
    ///
    /// Returns an error if a lock is poisoned.
    pub fn entry(&self, path: &str) -> Result<Option<FingerprintEntry>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| Error::lock_poisoned("entry"))?;
        Ok(entries.get(path).cloned())
    }

    /// Diagnostic statistics. No correctness dependency.
    ///
    /// # Errors
    ///
    /// Returns an error if a lock is poisoned.
    pub fn stats(&self) -> Result<IndexStats> {
        let entries = self
            .entries
            .read()
            .map_err(|_| Error::lock_poisoned("stats"))?;
        let postings = self
            .postings
            .read()
            .map_err(|_| Error::lock_poisoned("stats"))?;

        let documents = entries.len();
        let total_keywords: usize = entries.values().map(|e| e.keywords.len()).sum();
        #[allow(clippy::cast_precision_loss)]
        let avg = if documents == 0 {
            0.0
        } else {
            total_keywords as f64 / documents as f64
        };

        Ok(IndexStats {
            documents,
            keywords: postings.len(),
            avg_keywords_per_document: avg,
        })
    }
}

/// Enumerates Markdown files under a root, skipping dot-directories.
///
/// Returns root-relative paths with forward slashes. Unreadable entries are
/// logged and skipped; only a completely unreadable root is an error.
pub(crate) fn list_markdown_files(root: &Path) -> Result<Vec<String>> {
    if !root.is_dir() {
        return Err(Error::OperationFailed {
            operation: "list_markdown_files".to_string(),
            cause: format!("not a directory: {}", root.display()),
        });
    }

    let mut files = Vec::new();
    let walker = walkdir::WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            // Never filter the root itself, whatever it is named.
            entry.depth() == 0
                || !entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| name.starts_with('.'))
        });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "skipping unreadable tree entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let is_markdown = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("md"));
        if !is_markdown {
            continue;
        }
        if let Ok(relative) = entry.path().strip_prefix(root) {
            files.push(relative.to_string_lossy().replace('\\', "/"));
        }
    }

    files.sort_unstable();
    Ok(files)
}

fn sorted_keys(entries: &HashMap<String, FingerprintEntry>) -> Vec<String> {
    let mut keys: Vec<String> = entries.keys().cloned().collect();
    keys.sort_unstable();
    keys
}
