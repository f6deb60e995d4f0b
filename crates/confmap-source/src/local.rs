//! Local file configuration source.
//!
//! Configurations are files under a root directory, addressed by file name
//! (`redis.toml`, `orm.json`). The format follows the extension.
//!
//! Change detection compares a fingerprint of the file (modification time,
//! length and a SHA-256 digest of the content) with the one recorded by the
//! last fetch. The digest catches same-length rewrites landing within the
//! timestamp granularity. The fingerprint is checked every poll interval; when
//! file events are enabled a [`FileWatcher`] on the root directory wakes the
//! check early.

use std::collections::HashMap;
use std::fs::Metadata;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use confmap_core::Value;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};

use crate::watcher::FileWatcher;
use crate::{ConfigSource, Format, SourceError};

/// Settings of a [`LocalSource`].
#[derive(Debug, Clone)]
pub struct LocalSourceConfig {
    /// Directory holding the configuration files.
    pub root: PathBuf,
    /// How often file fingerprints are compared while waiting.
    pub poll_interval: Duration,
    /// Whether to use file system notifications to wake early.
    pub watch_events: bool,
    /// Debounce window of the file watcher.
    pub debounce: Duration,
}

impl Default for LocalSourceConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            poll_interval: Duration::from_secs(1),
            watch_events: true,
            debounce: Duration::from_millis(100),
        }
    }
}

impl LocalSourceConfig {
    /// Set the root directory.
    #[must_use]
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Set the poll interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Enable or disable file system notifications.
    #[must_use]
    pub fn with_watch_events(mut self, enabled: bool) -> Self {
        self.watch_events = enabled;
        self
    }

    /// Set the watcher debounce window.
    #[must_use]
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fingerprint {
    modified: Option<SystemTime>,
    len: u64,
    digest: [u8; 32],
    exists: bool,
}

impl Fingerprint {
    const MISSING: Self = Self {
        modified: None,
        len: 0,
        digest: [0; 32],
        exists: false,
    };

    fn new(meta: &Metadata, content: &[u8]) -> Self {
        let mut digest = [0; 32];
        digest.copy_from_slice(&Sha256::digest(content));
        Self {
            modified: meta.modified().ok(),
            len: meta.len(),
            digest,
            exists: true,
        }
    }

    async fn of(path: &Path) -> Result<Self, SourceError> {
        let Some((meta, content)) = load(path).await? else {
            return Ok(Self::MISSING);
        };
        Ok(Self::new(&meta, &content))
    }
}

/// Reads metadata, then content. `None` when the file does not exist.
async fn load(path: &Path) -> Result<Option<(Metadata, Vec<u8>)>, SourceError> {
    let meta = match tokio::fs::metadata(path).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(SourceError::read(path, e)),
    };
    match tokio::fs::read(path).await {
        Ok(content) => Ok(Some((meta, content))),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(SourceError::read(path, e)),
    }
}

/// Configuration files in a local directory.
///
/// # Example
///
/// ```no_run
/// use confmap_source::{read, LocalSource};
/// use std::time::Duration;
///
/// # #[derive(Default, confmap_macros::Config)]
/// # #[confmap(crate = "confmap_core")]
/// # struct RedisConfig {
/// #     #[confmap(default = "127.0.0.1:6379")]
/// #     host_port: String,
/// # }
/// # async fn example() -> Result<(), confmap_source::SourceError> {
/// let source = LocalSource::new("/etc/app");
/// let redis = read::<RedisConfig, _>(&source, "redis.toml", Duration::from_secs(20)).await?;
/// println!("{}", redis.value.host_port);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct LocalSource {
    config: LocalSourceConfig,
    seen: Mutex<HashMap<PathBuf, Fingerprint>>,
    watcher: Option<tokio::sync::Mutex<FileWatcher>>,
}

impl LocalSource {
    /// Create a source over `root` with default settings.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_config(LocalSourceConfig::default().with_root(root))
    }

    /// Create a source from explicit settings.
    ///
    /// A watcher that cannot be started is logged and the source falls back
    /// to polling.
    pub fn with_config(config: LocalSourceConfig) -> Self {
        let watcher = if config.watch_events {
            match start_watcher(&config) {
                Ok(watcher) => Some(tokio::sync::Mutex::new(watcher)),
                Err(e) => {
                    tracing::warn!(
                        root = %config.root.display(),
                        error = %e,
                        "file events unavailable; polling for configuration changes"
                    );
                    None
                }
            }
        } else {
            None
        };

        Self {
            config,
            seen: Mutex::new(HashMap::new()),
            watcher,
        }
    }

    /// Settings in use.
    pub fn config(&self) -> &LocalSourceConfig {
        &self.config
    }

    /// Path of the named configuration.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.config.root.join(name)
    }

    fn record(&self, path: &Path, fingerprint: Fingerprint) {
        self.seen.lock().insert(path.to_path_buf(), fingerprint);
    }

    async fn baseline(&self, path: &Path) -> Result<Fingerprint, SourceError> {
        let recorded = self.seen.lock().get(path).copied();
        match recorded {
            Some(fingerprint) => Ok(fingerprint),
            None => {
                let fingerprint = Fingerprint::of(path).await?;
                self.record(path, fingerprint);
                Ok(fingerprint)
            }
        }
    }

    async fn poll_change(&self, path: &Path) -> Result<(), SourceError> {
        let baseline = self.baseline(path).await?;
        loop {
            if Fingerprint::of(path).await? != baseline {
                return Ok(());
            }
            self.idle().await;
        }
    }

    async fn idle(&self) {
        let interval = self.config.poll_interval;
        let Some(watcher) = &self.watcher else {
            tokio::time::sleep(interval).await;
            return;
        };

        let mut watcher = watcher.lock().await;
        tokio::select! {
            event = watcher.next() => {
                if event.is_none() {
                    // Platform watcher gone; fall back to the poll interval.
                    tokio::time::sleep(interval).await;
                }
            }
            () = tokio::time::sleep(interval) => {}
        }
    }
}

fn start_watcher(config: &LocalSourceConfig) -> Result<FileWatcher, SourceError> {
    FileWatcher::builder()
        .with_debounce(config.debounce)
        .watch_path(&config.root)?
        .watch_extensions(Format::EXTENSIONS)
        .build()
}

#[async_trait]
impl ConfigSource for LocalSource {
    fn kind(&self) -> &'static str {
        "local"
    }

    async fn fetch(&self, name: &str) -> Result<Value, SourceError> {
        let path = self.path_for(name);
        let format = Format::from_path(&path)?;

        // Metadata is taken before the read: a write racing it shows up as a change.
        let Some((meta, content)) = load(&path).await? else {
            self.record(&path, Fingerprint::MISSING);
            return Err(SourceError::not_found(name));
        };

        // Recorded before parsing so a broken file is not re-read until it changes.
        self.record(&path, Fingerprint::new(&meta, &content));

        let text = String::from_utf8(content)
            .map_err(|e| SourceError::read(&path, std::io::Error::new(ErrorKind::InvalidData, e)))?;

        let value = format.parse(name, &text)?;
        tracing::debug!(config = name, path = %path.display(), %format, "configuration file loaded");
        Ok(value)
    }

    async fn wait_for_change(&self, name: &str, timeout: Duration) -> Result<(), SourceError> {
        let path = self.path_for(name);
        tokio::time::timeout(timeout, self.poll_change(&path))
            .await
            .map_err(|_| SourceError::timeout(name, timeout))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn polling_source(dir: &TempDir) -> LocalSource {
        LocalSource::with_config(
            LocalSourceConfig::default()
                .with_root(dir.path())
                .with_poll_interval(Duration::from_millis(10))
                .with_watch_events(false),
        )
    }

    #[test]
    fn test_default_config() {
        let config = LocalSourceConfig::default();
        assert_eq!(config.root, PathBuf::from("."));
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert!(config.watch_events);
    }

    #[tokio::test]
    async fn test_fetch_toml_and_json() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("redis.toml"), "hostPort = \"10.0.0.1:6379\"").unwrap();
        fs::write(dir.path().join("orm.json"), r#"{"maxIdleConns": 4}"#).unwrap();
        let source = polling_source(&dir);

        let redis = source.fetch("redis.toml").await.unwrap();
        assert_eq!(redis.get("hostport").and_then(Value::as_str), Some("10.0.0.1:6379"));

        let orm = source.fetch("orm.json").await.unwrap();
        assert_eq!(orm.get("maxidleconns").and_then(Value::as_i64), Some(4));
        assert_eq!(source.kind(), "local");
    }

    #[tokio::test]
    async fn test_fetch_errors() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("broken.toml"), "= nope").unwrap();
        fs::write(dir.path().join("app.ini"), "a=1").unwrap();
        let source = polling_source(&dir);

        assert!(matches!(
            source.fetch("missing.toml").await,
            Err(SourceError::NotFound { .. })
        ));
        assert!(matches!(
            source.fetch("broken.toml").await,
            Err(SourceError::Parse { .. })
        ));
        assert!(matches!(
            source.fetch("app.ini").await,
            Err(SourceError::UnsupportedFormat { .. })
        ));
    }

    #[tokio::test]
    async fn test_wait_detects_rewrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("redis.toml");
        fs::write(&path, "db = 0").unwrap();
        let source = polling_source(&dir);
        source.fetch("redis.toml").await.unwrap();

        fs::write(&path, "db = 1\npassword = \"secret\"").unwrap();

        source
            .wait_for_change("redis.toml", Duration::from_secs(2))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_wait_detects_same_length_rewrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("redis.toml");
        fs::write(&path, "db = 1").unwrap();
        let source = polling_source(&dir);
        source.fetch("redis.toml").await.unwrap();

        // Same length, and the original modification time restored.
        let modified = fs::metadata(&path).unwrap().modified().unwrap();
        fs::write(&path, "db = 2").unwrap();
        fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(modified)
            .unwrap();

        source
            .wait_for_change("redis.toml", Duration::from_secs(2))
            .await
            .unwrap();
        let value = source.fetch("redis.toml").await.unwrap();
        assert_eq!(value.get("db").and_then(Value::as_i64), Some(2));
    }

    #[test]
    fn test_fingerprint_covers_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.toml");
        fs::write(&path, "x").unwrap();
        let meta = fs::metadata(&path).unwrap();

        assert_eq!(Fingerprint::new(&meta, b"db = 1"), Fingerprint::new(&meta, b"db = 1"));
        assert_ne!(Fingerprint::new(&meta, b"db = 1"), Fingerprint::new(&meta, b"db = 2"));
        assert_ne!(Fingerprint::new(&meta, b""), Fingerprint::MISSING);
    }

    #[tokio::test]
    async fn test_wait_times_out_when_unchanged() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("redis.toml"), "db = 0").unwrap();
        let source = polling_source(&dir);
        source.fetch("redis.toml").await.unwrap();

        let err = source
            .wait_for_change("redis.toml", Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn test_missing_file_appearing_is_a_change() {
        let dir = TempDir::new().unwrap();
        let source = polling_source(&dir);
        assert!(source.fetch("late.toml").await.is_err());

        fs::write(dir.path().join("late.toml"), "ready = true").unwrap();

        source
            .wait_for_change("late.toml", Duration::from_secs(2))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_broken_file_is_not_reported_again_until_it_changes() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("orm.json"), "{").unwrap();
        let source = polling_source(&dir);
        assert!(source.fetch("orm.json").await.is_err());

        assert!(source
            .wait_for_change("orm.json", Duration::from_millis(50))
            .await
            .unwrap_err()
            .is_timeout());
    }

    #[tokio::test]
    async fn test_watcher_enabled_source_still_detects_changes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, r#"{"ttl": 1}"#).unwrap();
        let source = LocalSource::with_config(
            LocalSourceConfig::default()
                .with_root(dir.path())
                .with_poll_interval(Duration::from_millis(20)),
        );
        source.fetch("cache.json").await.unwrap();

        fs::write(&path, r#"{"ttl": 120}"#).unwrap();

        source
            .wait_for_change("cache.json", Duration::from_secs(2))
            .await
            .unwrap();
    }
}
