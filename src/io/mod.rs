//! File I/O collaborator.
//!
//! All paths handed to [`FileStore`] are relative to its root; absolute
//! paths and parent-directory escapes are rejected before touching the
//! filesystem. Absence is reported as `Ok(None)`, while genuine I/O
//! failures surface as [`crate::Error::Io`] so callers can tell the two
//! apart.

use crate::fingerprint::PREVIEW_BYTES;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use std::path::{Component, Path, PathBuf};
use tokio::io::AsyncReadExt;

/// Stat result for one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    /// Filesystem mtime.
    pub modified: DateTime<Utc>,
    /// File size in bytes.
    pub size: u64,
}

/// A file's content together with the stat it was read under.
#[derive(Debug, Clone)]
pub struct FileSnapshot {
    /// Best-effort UTF-8 content.
    pub content: String,
    /// Stat taken with the read.
    pub stat: FileStat,
}

/// Root-jailed async file access.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Creates a store rooted at the given directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The store's root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a relative path inside the root.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for absolute paths or paths that escape the
    /// root via parent components.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf> {
        let candidate = Path::new(relative);
        if candidate.is_absolute() {
            return Err(Error::InvalidInput(format!(
                "absolute path not allowed: {relative}"
            )));
        }
        for component in candidate.components() {
            if matches!(component, Component::ParentDir) {
                return Err(Error::InvalidInput(format!(
                    "path escapes document root: {relative}"
                )));
            }
        }
        Ok(self.root.join(candidate))
    }

    /// Reads a file's full content and stat in one pass.
    ///
    /// # Errors
    ///
    /// Returns an I/O error for failures other than absence.
    pub async fn read_snapshot(&self, relative: &str) -> Result<Option<FileSnapshot>> {
        let path = self.resolve(relative)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::Io {
                    operation: "read",
                    path,
                    source: e,
                });
            }
        };
        let stat = match self.stat(relative).await? {
            Some(stat) => stat,
            // Deleted between read and stat; treat as absent.
            None => return Ok(None),
        };
        Ok(Some(FileSnapshot {
            content: String::from_utf8_lossy(&bytes).into_owned(),
            stat,
        }))
    }

    /// Reads at most the first [`PREVIEW_BYTES`] of a file plus its stat.
    ///
    /// # Errors
    ///
    /// Returns an I/O error for failures other than absence.
    pub async fn read_preview(&self, relative: &str) -> Result<Option<(String, FileStat)>> {
        let path = self.resolve(relative)?;
        let file = match tokio::fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::Io {
                    operation: "open",
                    path,
                    source: e,
                });
            }
        };

        let metadata = file.metadata().await.map_err(|e| Error::Io {
            operation: "stat",
            path: path.clone(),
            source: e,
        })?;

        let mut buffer = Vec::with_capacity(PREVIEW_BYTES.min(metadata.len() as usize + 1));
        let mut limited = file.take(PREVIEW_BYTES as u64);
        limited.read_to_end(&mut buffer).await.map_err(|e| Error::Io {
            operation: "read",
            path,
            source: e,
        })?;

        let stat = FileStat {
            modified: metadata
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now()),
            size: metadata.len(),
        };
        Ok(Some((
            String::from_utf8_lossy(&buffer).into_owned(),
            stat,
        )))
    }

    /// Stats a file without reading it.
    ///
    /// # Errors
    ///
    /// Returns an I/O error for failures other than absence.
    pub async fn stat(&self, relative: &str) -> Result<Option<FileStat>> {
        let path = self.resolve(relative)?;
        match tokio::fs::metadata(&path).await {
            Ok(metadata) => Ok(Some(FileStat {
                modified: metadata
                    .modified()
                    .map(DateTime::<Utc>::from)
                    .unwrap_or_else(|_| Utc::now()),
                size: metadata.len(),
            })),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Io {
                operation: "stat",
                path,
                source: e,
            }),
        }
    }

    /// Checks whether a file exists.
    ///
    /// # Errors
    ///
    /// Returns an I/O error for failures other than absence.
    pub async fn exists(&self, relative: &str) -> Result<bool> {
        Ok(self.stat(relative).await?.is_some())
    }

    /// Ensures a directory (and its parents) exists under the root.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if creation fails.
    pub async fn ensure_dir(&self, relative: &str) -> Result<()> {
        let path = self.resolve(relative)?;
        tokio::fs::create_dir_all(&path).await.map_err(|e| Error::Io {
            operation: "create_dir",
            path,
            source: e,
        })
    }

    /// Writes a file only if its mtime still matches the expected snapshot.
    ///
    /// The cache itself never writes; this exists for the manager layer,
    /// which must invalidate the cache entry after a successful write.
    ///
    /// # Errors
    ///
    /// Returns `WriteConflict` when the file changed since it was read, or
    /// an I/O error if the write fails.
    pub async fn write_if_unmodified(
        &self,
        relative: &str,
        content: &str,
        expected_modified: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let path = self.resolve(relative)?;

        if let Some(expected) = expected_modified {
            if let Some(stat) = self.stat(relative).await? {
                if stat.modified != expected {
                    return Err(Error::WriteConflict { path });
                }
            }
        }

        tokio::fs::write(&path, content).await.map_err(|e| Error::Io {
            operation: "write",
            path,
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, FileStore) {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());
        (dir, store)
    }

    #[tokio::test]
    async fn test_read_snapshot_missing_file_is_none() {
        let (_dir, store) = store();
        let snapshot = store.read_snapshot("missing.md").await.unwrap();
        assert!(snapshot.is_none());
    }

    #[tokio::test]
    async fn test_read_snapshot_returns_content_and_stat() {
        let (dir, store) = store();
        std::fs::write(dir.path().join("doc.md"), "# Hello\n").unwrap();

        let snapshot = store.read_snapshot("doc.md").await.unwrap().unwrap();
        assert_eq!(snapshot.content, "# Hello\n");
        assert_eq!(snapshot.stat.size, 8);
    }

    #[tokio::test]
    async fn test_read_preview_bounded() {
        let (dir, store) = store();
        let content = "x".repeat(PREVIEW_BYTES * 3);
        std::fs::write(dir.path().join("big.md"), &content).unwrap();

        let (preview, stat) = store.read_preview("big.md").await.unwrap().unwrap();
        assert_eq!(preview.len(), PREVIEW_BYTES);
        assert_eq!(stat.size, (PREVIEW_BYTES * 3) as u64);
    }

    #[tokio::test]
    async fn test_resolve_rejects_escapes() {
        let (_dir, store) = store();
        assert!(store.resolve("../outside.md").is_err());
        assert!(store.resolve("/etc/passwd").is_err());
        assert!(store.resolve("docs/../../outside.md").is_err());
    }

    #[tokio::test]
    async fn test_write_if_unmodified_conflict() {
        let (dir, store) = store();
        let path = dir.path().join("doc.md");
        std::fs::write(&path, "v1").unwrap();

        let stat = store.stat("doc.md").await.unwrap().unwrap();

        // Concurrent modification with a different mtime.
        let new_time = std::time::SystemTime::now() + std::time::Duration::from_secs(5);
        std::fs::write(&path, "v2").unwrap();
        let file = std::fs::File::options().write(true).open(&path).unwrap();
        file.set_modified(new_time).unwrap();

        let result = store
            .write_if_unmodified("doc.md", "v3", Some(stat.modified))
            .await;
        assert!(matches!(result, Err(Error::WriteConflict { .. })));
    }

    #[tokio::test]
    async fn test_write_if_unmodified_success() {
        let (dir, store) = store();
        std::fs::write(dir.path().join("doc.md"), "v1").unwrap();
        let stat = store.stat("doc.md").await.unwrap().unwrap();

        store
            .write_if_unmodified("doc.md", "v2", Some(stat.modified))
            .await
            .unwrap();
        let snapshot = store.read_snapshot("doc.md").await.unwrap().unwrap();
        assert_eq!(snapshot.content, "v2");
    }

    #[test]
    fn test_ensure_dir_and_exists() {
        let (_dir, store) = store();
        tokio_test::block_on(async {
            store.ensure_dir("api/specs").await.unwrap();
            assert!(!store.exists("api/specs/auth.md").await.unwrap());
        });
    }
}
