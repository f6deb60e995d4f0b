//! File system notifications for configuration files.
//!
//! [`FileWatcher`] wraps a `notify` watcher and turns its events into a
//! debounced async stream. [`LocalSource`](crate::LocalSource) uses it to wake
//! its change detection early; the file fingerprint stays the authority on
//! whether a configuration actually changed.
//!
//! # Example
//!
//! ```no_run
//! use confmap_source::FileWatcher;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), confmap_source::SourceError> {
//! let mut watcher = FileWatcher::builder()
//!     .with_debounce(Duration::from_millis(200))
//!     .watch_path("/etc/app")?
//!     .watch_extensions(&["toml", "json"])
//!     .build()?;
//!
//! while let Some(event) = watcher.next().await {
//!     println!("{:?} {}", event.kind, event.path.display());
//! }
//! # Ok(())
//! # }
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::SourceError;

// Pending events beyond this are dropped; a wakeup is already queued.
const EVENT_BUFFER: usize = 64;

/// A debounced file change.
#[derive(Debug, Clone)]
pub struct WatchEvent {
    /// Path of the changed file.
    pub path: PathBuf,
    /// Kind of change.
    pub kind: WatchEventKind,
    /// When the change was received.
    pub at: Instant,
}

/// Kind of file change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEventKind {
    /// File was created.
    Created,
    /// File was modified.
    Modified,
    /// File was removed.
    Removed,
}

impl WatchEventKind {
    fn from_event(kind: &EventKind) -> Option<Self> {
        match kind {
            EventKind::Create(_) => Some(Self::Created),
            EventKind::Modify(_) => Some(Self::Modified),
            EventKind::Remove(_) => Some(Self::Removed),
            EventKind::Access(_) | EventKind::Other | EventKind::Any => None,
        }
    }
}

/// Settings of a [`FileWatcher`].
#[derive(Debug, Clone)]
pub struct FileWatcherConfig {
    /// Files or directories to watch.
    pub paths: Vec<PathBuf>,
    /// Events for the same path within this window are coalesced.
    pub debounce: Duration,
    /// Whether directories are watched recursively.
    pub recursive: bool,
    /// Extensions to report; empty reports every file.
    pub extensions: HashSet<String>,
}

impl Default for FileWatcherConfig {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            debounce: Duration::from_millis(100),
            recursive: false,
            extensions: HashSet::new(),
        }
    }
}

/// Builder for [`FileWatcher`].
#[derive(Debug, Default)]
pub struct FileWatcherBuilder {
    config: FileWatcherConfig,
}

impl FileWatcherBuilder {
    /// Create a builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the debounce window.
    #[must_use]
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.config.debounce = debounce;
        self
    }

    /// Add a file or directory to watch.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Read`] if the path does not exist.
    pub fn watch_path(mut self, path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SourceError::read(
                path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "path does not exist"),
            ));
        }
        self.config.paths.push(path.to_path_buf());
        Ok(self)
    }

    /// Set whether directories are watched recursively.
    #[must_use]
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.config.recursive = recursive;
        self
    }

    /// Restrict events to files with these extensions.
    #[must_use]
    pub fn watch_extensions(mut self, extensions: &[&str]) -> Self {
        self.config.extensions = extensions.iter().map(|e| e.to_ascii_lowercase()).collect();
        self
    }

    /// Start watching.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Watch`] if no path was added or the platform
    /// watcher cannot be created.
    pub fn build(self) -> Result<FileWatcher, SourceError> {
        if self.config.paths.is_empty() {
            return Err(SourceError::watch("no paths configured for file watcher"));
        }

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            match res {
                // A full buffer already holds a pending wakeup.
                Ok(event) => {
                    let _ = tx.try_send(event);
                }
                Err(e) => tracing::warn!(error = %e, "file watcher reported an error"),
            }
        })
        .map_err(|e| SourceError::watch(format!("failed to create file watcher: {e}")))?;

        let mode = if self.config.recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };

        for path in &self.config.paths {
            watcher.watch(path, mode).map_err(|e| {
                SourceError::watch(format!("failed to watch {}: {e}", path.display()))
            })?;
        }

        tracing::debug!(paths = ?self.config.paths, "file watcher started");

        Ok(FileWatcher {
            _watcher: watcher,
            rx,
            config: self.config,
            last_event: None,
        })
    }
}

/// Debounced stream of file changes.
pub struct FileWatcher {
    // Dropping the platform watcher stops event delivery.
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<Event>,
    config: FileWatcherConfig,
    last_event: Option<(PathBuf, Instant)>,
}

impl std::fmt::Debug for FileWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWatcher")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl FileWatcher {
    /// Create a builder.
    pub fn builder() -> FileWatcherBuilder {
        FileWatcherBuilder::new()
    }

    /// Settings in use.
    pub fn config(&self) -> &FileWatcherConfig {
        &self.config
    }

    /// Returns a pending change without waiting.
    pub fn poll(&mut self) -> Option<WatchEvent> {
        while let Ok(event) = self.rx.try_recv() {
            if let Some(change) = self.process_event(event) {
                return Some(change);
            }
        }
        None
    }

    /// Waits for the next change.
    ///
    /// Returns `None` once the platform watcher has shut down.
    pub async fn next(&mut self) -> Option<WatchEvent> {
        loop {
            let event = self.rx.recv().await?;
            if let Some(change) = self.process_event(event) {
                return Some(change);
            }
        }
    }

    fn process_event(&mut self, event: Event) -> Option<WatchEvent> {
        let kind = WatchEventKind::from_event(&event.kind)?;
        let path = event.paths.first()?.clone();

        if !self.config.extensions.is_empty() {
            let extension = path.extension()?.to_str()?.to_ascii_lowercase();
            if !self.config.extensions.contains(&extension) {
                return None;
            }
        }

        let now = Instant::now();
        if let Some((last_path, last_time)) = &self.last_event {
            if last_path == &path && now.duration_since(*last_time) < self.config.debounce {
                return None;
            }
        }
        self.last_event = Some((path.clone(), now));

        Some(WatchEvent {
            path,
            kind,
            at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, DataChange, ModifyKind, RemoveKind};
    use std::fs;
    use tempfile::TempDir;

    fn event(kind: EventKind, path: &Path) -> Event {
        Event::new(kind).add_path(path.to_path_buf())
    }

    fn test_watcher(dir: &TempDir, extensions: &[&str]) -> FileWatcher {
        FileWatcher::builder()
            .with_debounce(Duration::from_secs(60))
            .watch_path(dir.path())
            .unwrap()
            .watch_extensions(extensions)
            .build()
            .unwrap()
    }

    #[test]
    fn test_event_kind_mapping() {
        assert_eq!(
            WatchEventKind::from_event(&EventKind::Create(CreateKind::File)),
            Some(WatchEventKind::Created)
        );
        assert_eq!(
            WatchEventKind::from_event(&EventKind::Modify(ModifyKind::Data(DataChange::Any))),
            Some(WatchEventKind::Modified)
        );
        assert_eq!(
            WatchEventKind::from_event(&EventKind::Remove(RemoveKind::File)),
            Some(WatchEventKind::Removed)
        );
        assert_eq!(
            WatchEventKind::from_event(&EventKind::Access(AccessKind::Any)),
            None
        );
    }

    #[test]
    fn test_default_config() {
        let config = FileWatcherConfig::default();
        assert!(config.paths.is_empty());
        assert_eq!(config.debounce, Duration::from_millis(100));
        assert!(!config.recursive);
        assert!(config.extensions.is_empty());
    }

    #[test]
    fn test_builder_settings() {
        let builder = FileWatcherBuilder::new()
            .with_debounce(Duration::from_secs(1))
            .recursive(true)
            .watch_extensions(&["TOML", "json"]);

        assert_eq!(builder.config.debounce, Duration::from_secs(1));
        assert!(builder.config.recursive);
        assert!(builder.config.extensions.contains("toml"));
        assert!(builder.config.extensions.contains("json"));
    }

    #[test]
    fn test_watch_path_not_found() {
        let err = FileWatcherBuilder::new()
            .watch_path("/nonexistent/confmap/path")
            .unwrap_err();
        match err {
            SourceError::Read { source, .. } => {
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("expected read error, got {other:?}"),
        }
    }

    #[test]
    fn test_build_without_paths() {
        let err = FileWatcherBuilder::new().build().unwrap_err();
        assert!(matches!(err, SourceError::Watch { .. }));
    }

    #[test]
    fn test_process_event_filters_and_debounces() {
        let dir = TempDir::new().unwrap();
        let mut watcher = test_watcher(&dir, &["toml"]);
        let config = dir.path().join("redis.toml");
        let notes = dir.path().join("notes.txt");

        let modify = EventKind::Modify(ModifyKind::Data(DataChange::Content));

        assert!(watcher.process_event(event(modify, &notes)).is_none());
        assert!(watcher
            .process_event(event(EventKind::Access(AccessKind::Any), &config))
            .is_none());

        let first = watcher.process_event(event(modify, &config)).unwrap();
        assert_eq!(first.path, config);
        assert_eq!(first.kind, WatchEventKind::Modified);

        // Same path inside the debounce window.
        assert!(watcher.process_event(event(modify, &config)).is_none());
    }

    #[tokio::test]
    async fn test_file_change_detection() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("orm.toml");
        fs::write(&path, "dsn = \"a\"").unwrap();

        let mut watcher = FileWatcher::builder()
            .with_debounce(Duration::from_millis(10))
            .watch_path(dir.path())
            .unwrap()
            .build()
            .unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        fs::write(&path, "dsn = \"postgres://b\"").unwrap();

        // File system events can be unreliable in CI; only check what arrives.
        if let Ok(Some(event)) = tokio::time::timeout(Duration::from_secs(2), watcher.next()).await {
            let expected = path.canonicalize().unwrap();
            let actual = event.path.canonicalize().unwrap_or(event.path);
            assert_eq!(actual, expected);
        }
    }
}
