//! Filesystem watchdog feeding the document cache.
//!
//! Starts a native filesystem watcher, retries with exponential backoff
//! when it fails, and degrades permanently to interval polling once the
//! retry budget is exhausted. Cache correctness never depends on the
//! watcher: it only accelerates invalidation that polling would perform
//! anyway.

use crate::cache::DocumentCache;
use crate::config::WatchSettings;
use crate::models::InvalidationKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Component, Path};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Current mode of the watchdog's degradation state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchMode {
    /// Native watcher running.
    Watching,
    /// Watcher failed; waiting out backoff before retry `attempt`.
    BackingOff {
        /// Restart attempt number, starting at 1.
        attempt: u32,
    },
    /// Retry budget exhausted; polling on an interval permanently.
    Polling,
}

impl WatchMode {
    /// Next mode after a watcher failure.
    #[must_use]
    pub const fn after_failure(self, max_retries: u32) -> Self {
        match self {
            Self::Watching => {
                if max_retries == 0 {
                    Self::Polling
                } else {
                    Self::BackingOff { attempt: 1 }
                }
            }
            Self::BackingOff { attempt } => {
                if attempt >= max_retries {
                    Self::Polling
                } else {
                    Self::BackingOff {
                        attempt: attempt + 1,
                    }
                }
            }
            Self::Polling => Self::Polling,
        }
    }

    /// Backoff delay before the retry this mode represents.
    #[must_use]
    pub fn backoff_delay(self, base: Duration) -> Duration {
        match self {
            Self::BackingOff { attempt } => base * 2u32.saturating_pow(attempt.saturating_sub(1)),
            _ => Duration::ZERO,
        }
    }
}

/// Handle to a running watchdog task.
pub struct WatchdogHandle {
    task: JoinHandle<()>,
    mode: Arc<RwLock<WatchMode>>,
}

impl WatchdogHandle {
    /// The watchdog's current mode.
    #[must_use]
    pub fn mode(&self) -> WatchMode {
        self.mode
            .read()
            .map_or(WatchMode::Polling, |mode| *mode)
    }

    /// Stops the watchdog.
    pub fn shutdown(&self) {
        self.task.abort();
    }
}

impl Drop for WatchdogHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Spawns the cache watchdog.
pub struct CacheWatchdog;

impl CacheWatchdog {
    /// Starts watching the cache's document root.
    #[must_use]
    pub fn spawn(cache: Arc<DocumentCache>, settings: WatchSettings) -> WatchdogHandle {
        let mode = Arc::new(RwLock::new(WatchMode::Watching));
        let task_mode = Arc::clone(&mode);
        let task = tokio::spawn(async move {
            run(cache, settings, task_mode).await;
        });
        WatchdogHandle { task, mode }
    }
}

async fn run(cache: Arc<DocumentCache>, settings: WatchSettings, mode: Arc<RwLock<WatchMode>>) {
    let root = cache.store().root().to_path_buf();

    loop {
        let current = {
            let guard = mode.read();
            guard.map_or(WatchMode::Polling, |m| *m)
        };

        match current {
            WatchMode::Watching | WatchMode::BackingOff { .. } => {
                if let WatchMode::BackingOff { attempt } = current {
                    let delay = current.backoff_delay(settings.backoff_base);
                    info!(attempt, ?delay, "watcher restart pending");
                    tokio::time::sleep(delay).await;
                }

                match watch_until_failure(&cache, &root).await {
                    Ok(()) => {
                        // Channel closed without an error; treat as failure.
                        transition(&mode, current.after_failure(settings.max_watch_retries));
                    }
                    Err(error) => {
                        warn!(%error, "filesystem watcher failed");
                        transition(&mode, current.after_failure(settings.max_watch_retries));
                    }
                }
            }
            WatchMode::Polling => {
                tokio::time::sleep(settings.poll_interval).await;
                if let Err(error) = cache.poll_for_changes().await {
                    warn!(%error, "polling pass failed");
                }
            }
        }
    }
}

fn transition(mode: &Arc<RwLock<WatchMode>>, next: WatchMode) {
    if let Ok(mut guard) = mode.write() {
        if *guard != next {
            info!(from = ?*guard, to = ?next, "watchdog mode change");
            if next == WatchMode::Polling {
                warn!("watcher retries exhausted; degrading to interval polling");
            }
        }
        *guard = next;
    }
}

/// Runs the native watcher until it errors or its channel closes.
async fn watch_until_failure(cache: &DocumentCache, root: &Path) -> notify::Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel::<notify::Result<Event>>();

    let mut watcher = RecommendedWatcher::new(
        move |event| {
            let _ = tx.send(event);
        },
        notify::Config::default(),
    )?;
    watcher.watch(root, RecursiveMode::Recursive)?;
    info!(root = %root.display(), "filesystem watcher started");

    while let Some(event) = rx.recv().await {
        let event = event?;
        let Some(kind) = invalidation_kind_of(&event.kind) else {
            continue;
        };
        for path in &event.paths {
            let Some(relative) = relative_markdown_path(root, path) else {
                continue;
            };
            debug!(path = %relative, ?kind, "watcher event");
            if let Err(error) = cache.note_file_event(&relative, kind) {
                warn!(%error, path = %relative, "failed to apply watcher event");
            }
        }
    }
    Ok(())
}

fn invalidation_kind_of(kind: &EventKind) -> Option<InvalidationKind> {
    match kind {
        EventKind::Create(_) => Some(InvalidationKind::Added),
        EventKind::Modify(_) => Some(InvalidationKind::Changed),
        EventKind::Remove(_) => Some(InvalidationKind::Removed),
        _ => None,
    }
}

/// Maps an absolute event path to a root-relative Markdown path.
///
/// Non-Markdown files and anything under a dot-directory are ignored.
fn relative_markdown_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;

    let is_markdown = relative
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("md"));
    if !is_markdown {
        return None;
    }

    let mut parts = Vec::new();
    for component in relative.components() {
        let Component::Normal(part) = component else {
            return None;
        };
        let part = part.to_str()?;
        if part.starts_with('.') {
            return None;
        }
        parts.push(part);
    }
    Some(parts.join("/"))
}
