//! Background hot-reload of a named configuration.
//!
//! [`watch_config`] performs the initial read, then spawns a task that loops
//! wait-for-change, read, publish. Every successful reload is published as a
//! new immutable [`Snapshot`]; readers never observe a half-decoded value.
//!
//! # Example
//!
//! ```no_run
//! use confmap_source::{watch_config, LocalSource, ReloadConfig};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # #[derive(Default, confmap_macros::Config)]
//! # #[confmap(crate = "confmap_core")]
//! # struct OrmConfig {
//! #     #[confmap(default = 10)]
//! #     max_idle_conns: u32,
//! # }
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let source = Arc::new(LocalSource::new("/etc/app"));
//! let mut handle = watch_config::<OrmConfig, _>(source, "orm.toml", ReloadConfig::default()).await?;
//!
//! println!("idle conns: {}", handle.current().config.max_idle_conns);
//!
//! loop {
//!     match handle.changed(Duration::from_secs(20)).await {
//!         Ok(snapshot) => println!("reloaded revision {}", snapshot.revision),
//!         Err(confmap_source::ListenError::Timeout { .. }) => continue,
//!         Err(confmap_source::ListenError::Closed) => break,
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use confmap_core::{Config, Decoded, Decoder, Diagnostics};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

use crate::source::read_with;
use crate::{ConfigSource, ListenError, SourceError};

/// Settings of the reload loop.
#[derive(Debug, Clone)]
pub struct ReloadConfig {
    /// Bound of each wait for a change. Expiry is silent; the loop waits again.
    pub listen_timeout: Duration,
    /// Bound of each read.
    pub read_timeout: Duration,
    /// Pause after a failed wait or read.
    pub retry_delay: Duration,
}

impl Default for ReloadConfig {
    fn default() -> Self {
        Self {
            listen_timeout: Duration::from_secs(20),
            read_timeout: Duration::from_secs(20),
            retry_delay: Duration::from_secs(1),
        }
    }
}

impl ReloadConfig {
    /// Set the listen timeout.
    #[must_use]
    pub fn with_listen_timeout(mut self, timeout: Duration) -> Self {
        self.listen_timeout = timeout;
        self
    }

    /// Set the read timeout.
    #[must_use]
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set the retry delay.
    #[must_use]
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }
}

/// One decoded version of a configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<T> {
    /// 0 for the initial read, incremented by every reload.
    pub revision: u64,
    /// The decoded configuration.
    pub config: T,
    /// Diagnostics of the decode that produced it.
    pub diagnostics: Diagnostics,
}

impl<T> Snapshot<T> {
    fn new(revision: u64, decoded: Decoded<T>) -> Self {
        let (config, diagnostics) = decoded.into_parts();
        Self {
            revision,
            config,
            diagnostics,
        }
    }
}

/// Handle to a configuration kept up to date by a background task.
///
/// Dropping the handle stops the task.
#[derive(Debug)]
pub struct ConfigHandle<T> {
    name: String,
    rx: watch::Receiver<Arc<Snapshot<T>>>,
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl<T> ConfigHandle<T> {
    /// Configuration name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Latest snapshot.
    pub fn current(&self) -> Arc<Snapshot<T>> {
        Arc::clone(&self.rx.borrow())
    }

    /// A receiver for callers that want to await changes elsewhere.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot<T>>> {
        self.rx.clone()
    }

    /// Waits for the next reload.
    ///
    /// Fails with [`ListenError::Timeout`] when nothing is published within
    /// `timeout`, and with [`ListenError::Closed`] once the loop has stopped.
    pub async fn changed(&mut self, timeout: Duration) -> Result<Arc<Snapshot<T>>, ListenError> {
        match tokio::time::timeout(timeout, self.rx.changed()).await {
            Err(_) => Err(ListenError::Timeout { after: timeout }),
            Ok(Err(_)) => Err(ListenError::Closed),
            Ok(Ok(())) => Ok(Arc::clone(&self.rx.borrow_and_update())),
        }
    }

    /// Stops the reload loop and waits for it to exit.
    pub async fn shutdown(mut self) {
        self.signal_stop();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(config = %self.name, error = %e, "configuration reload task failed");
            }
        }
    }

    fn signal_stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}

impl<T> Drop for ConfigHandle<T> {
    fn drop(&mut self) {
        self.signal_stop();
    }
}

/// Reads the named configuration and keeps it up to date.
///
/// The initial read must succeed: schema errors, a missing configuration or
/// unparseable data are returned and no task is started. Afterwards failures
/// are logged and the previous snapshot stays current.
///
/// Must be called within a tokio runtime.
pub async fn watch_config<T, S>(
    source: Arc<S>,
    name: impl Into<String>,
    config: ReloadConfig,
) -> Result<ConfigHandle<T>, SourceError>
where
    T: Config + Send + Sync + 'static,
    S: ConfigSource + ?Sized + 'static,
{
    let name = name.into();
    let decoder = Decoder::<T>::new()?;
    let initial = read_with(&decoder, &*source, &name, config.read_timeout).await?;
    tracing::info!(config = %name, source = source.kind(), "configuration loaded");

    let (tx, rx) = watch::channel(Arc::new(Snapshot::new(0, initial)));
    let (stop_tx, stop_rx) = oneshot::channel();

    let task = tokio::spawn(reload_loop(
        source,
        name.clone(),
        decoder,
        config,
        tx,
        stop_rx,
    ));

    Ok(ConfigHandle {
        name,
        rx,
        stop: Some(stop_tx),
        task: Some(task),
    })
}

async fn reload_loop<T, S>(
    source: Arc<S>,
    name: String,
    decoder: Decoder<T>,
    config: ReloadConfig,
    tx: watch::Sender<Arc<Snapshot<T>>>,
    mut stop: oneshot::Receiver<()>,
) where
    T: Config + Send + Sync + 'static,
    S: ConfigSource + ?Sized + 'static,
{
    tracing::debug!(config = %name, "configuration reload loop started");
    let mut revision = 0u64;

    loop {
        let changed = tokio::select! {
            _ = &mut stop => break,
            result = source.wait_for_change(&name, config.listen_timeout) => result,
        };

        match changed {
            Ok(()) => {}
            Err(e) if e.is_timeout() => continue,
            Err(e) => {
                tracing::error!(config = %name, error = %e, "failed to listen for configuration changes");
                if pause(&mut stop, config.retry_delay).await {
                    break;
                }
                continue;
            }
        }

        match read_with(&decoder, &*source, &name, config.read_timeout).await {
            Ok(decoded) => {
                revision += 1;
                tx.send_replace(Arc::new(Snapshot::new(revision, decoded)));
                tracing::info!(config = %name, revision, "configuration reloaded");
            }
            Err(e) => {
                tracing::error!(
                    config = %name,
                    error = %e,
                    "failed to reload configuration; keeping previous snapshot"
                );
                if pause(&mut stop, config.retry_delay).await {
                    break;
                }
            }
        }
    }

    tracing::debug!(config = %name, "configuration reload loop stopped");
}

/// Sleeps for `delay`; returns `true` if a stop arrived first.
async fn pause(stop: &mut oneshot::Receiver<()>, delay: Duration) -> bool {
    tokio::select! {
        _ = stop => true,
        () = tokio::time::sleep(delay) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemorySource;
    use confmap_core::{Field, FieldSchema, Slot, StructSchema, Value};

    #[derive(Debug, Default, Clone, PartialEq)]
    struct CacheConfig {
        ttl: u32,
    }

    impl Config for CacheConfig {
        fn schema() -> StructSchema {
            StructSchema::new("CacheConfig")
                .field(FieldSchema::of::<u32>("ttl", "ttl").with_default("60"))
        }

        fn field_mut(&mut self, index: usize) -> Slot<'_> {
            match index {
                0 => self.ttl.slot(),
                _ => Slot::Opaque,
            }
        }
    }

    fn ttl(value: i64) -> Value {
        [("ttl", Value::from(value))].into_iter().collect()
    }

    fn fast() -> ReloadConfig {
        ReloadConfig::default()
            .with_listen_timeout(Duration::from_millis(20))
            .with_retry_delay(Duration::from_millis(10))
    }

    #[test]
    fn test_default_reload_config() {
        let config = ReloadConfig::default();
        assert_eq!(config.listen_timeout, Duration::from_secs(20));
        assert_eq!(config.read_timeout, Duration::from_secs(20));
    }

    #[tokio::test]
    async fn test_initial_snapshot() {
        let source = Arc::new(MemorySource::new().with_config("cache", ttl(5)));
        let handle = watch_config::<CacheConfig, _>(source, "cache", fast())
            .await
            .unwrap();

        let snapshot = handle.current();
        assert_eq!(snapshot.revision, 0);
        assert_eq!(snapshot.config.ttl, 5);
        assert_eq!(handle.name(), "cache");
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_initial_read_failure_is_returned() {
        let source = Arc::new(MemorySource::new());
        let err = watch_config::<CacheConfig, _>(source, "cache", fast())
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_reload_publishes_new_snapshot() {
        let source = Arc::new(MemorySource::new().with_config("cache", ttl(5)));
        let mut handle = watch_config::<CacheConfig, _>(Arc::clone(&source), "cache", fast())
            .await
            .unwrap();

        source.set("cache", ttl(30));

        let snapshot = handle.changed(Duration::from_secs(5)).await.unwrap();
        assert_eq!(snapshot.revision, 1);
        assert_eq!(snapshot.config.ttl, 30);
        assert_eq!(handle.current().config.ttl, 30);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_previous_snapshot() {
        let source = Arc::new(MemorySource::new().with_config("cache", ttl(5)));
        let mut handle = watch_config::<CacheConfig, _>(Arc::clone(&source), "cache", fast())
            .await
            .unwrap();

        source.set("cache", Value::from("not a mapping"));
        assert!(matches!(
            handle.changed(Duration::from_millis(100)).await,
            Err(ListenError::Timeout { .. })
        ));
        assert_eq!(handle.current().config.ttl, 5);

        source.set("cache", ttl(7));
        let snapshot = handle.changed(Duration::from_secs(5)).await.unwrap();
        assert_eq!(snapshot.config.ttl, 7);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_changed_reports_closed_after_loop_stops() {
        let source = Arc::new(MemorySource::new().with_config("cache", ttl(5)));
        let handle = watch_config::<CacheConfig, _>(source, "cache", fast())
            .await
            .unwrap();
        let mut receiver = handle.subscribe();

        handle.shutdown().await;

        assert!(receiver.changed().await.is_err());
    }
}
