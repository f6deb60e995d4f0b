//! In-memory configuration source.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use confmap_core::Value;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::{ConfigSource, SourceError};

/// A source whose configurations are set programmatically.
///
/// Useful for tests and for bridging push-based backends: whatever receives
/// the remote update calls [`set`](MemorySource::set), which wakes every
/// pending [`wait_for_change`](ConfigSource::wait_for_change).
///
/// # Example
///
/// ```
/// use confmap_core::Value;
/// use confmap_source::MemorySource;
///
/// let source = MemorySource::new();
/// source.set("cache", [("ttl", Value::from(30))].into_iter().collect::<Value>());
/// assert!(source.get("cache").is_some());
/// ```
#[derive(Debug, Default)]
pub struct MemorySource {
    state: Mutex<State>,
    changed: Notify,
}

#[derive(Debug, Default)]
struct State {
    values: HashMap<String, Value>,
    // Bumped on every set/remove; never dropped so removals are observable.
    versions: HashMap<String, u64>,
    // Version each name had when it was last fetched.
    fetched: HashMap<String, u64>,
}

impl State {
    fn version(&self, name: &str) -> u64 {
        self.versions.get(name).copied().unwrap_or(0)
    }

    fn bump(&mut self, name: &str) {
        *self.versions.entry(name.to_owned()).or_insert(0) += 1;
    }
}

impl MemorySource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a configuration while building the source.
    #[must_use]
    pub fn with_config(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Stores a configuration and wakes listeners.
    pub fn set(&self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        {
            let mut state = self.state.lock();
            state.bump(&name);
            state.values.insert(name.clone(), value.into());
        }
        tracing::debug!(config = %name, "memory configuration updated");
        self.changed.notify_waiters();
    }

    /// Removes a configuration and wakes listeners.
    pub fn remove(&self, name: &str) -> Option<Value> {
        let removed = {
            let mut state = self.state.lock();
            let removed = state.values.remove(name);
            if removed.is_some() {
                state.bump(name);
            }
            removed
        };
        if removed.is_some() {
            self.changed.notify_waiters();
        }
        removed
    }

    /// Returns a copy of the stored configuration.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.state.lock().values.get(name).cloned()
    }

    /// Returns `true` when `name` changed since it was last fetched.
    fn is_stale(&self, name: &str) -> bool {
        let mut state = self.state.lock();
        let current = state.version(name);
        match state.fetched.get(name) {
            Some(seen) => *seen != current,
            None => {
                // Nothing fetched yet: the current version is the baseline.
                state.fetched.insert(name.to_owned(), current);
                false
            }
        }
    }
}

#[async_trait]
impl ConfigSource for MemorySource {
    fn kind(&self) -> &'static str {
        "memory"
    }

    async fn fetch(&self, name: &str) -> Result<Value, SourceError> {
        let mut state = self.state.lock();
        let version = state.version(name);
        state.fetched.insert(name.to_owned(), version);
        state
            .values
            .get(name)
            .cloned()
            .ok_or_else(|| SourceError::not_found(name))
    }

    async fn wait_for_change(&self, name: &str, timeout: Duration) -> Result<(), SourceError> {
        let wait = async {
            loop {
                let notified = self.changed.notified();
                tokio::pin!(notified);
                // Register before checking so a concurrent `set` is not missed.
                notified.as_mut().enable();
                if self.is_stale(name) {
                    return;
                }
                notified.await;
            }
        };

        tokio::time::timeout(timeout, wait)
            .await
            .map_err(|_| SourceError::timeout(name, timeout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn ttl(value: i64) -> Value {
        [("ttl", Value::from(value))].into_iter().collect()
    }

    #[tokio::test]
    async fn test_fetch() {
        let source = MemorySource::new().with_config("cache", ttl(1));
        assert_eq!(source.fetch("cache").await.unwrap(), ttl(1));
        assert!(matches!(
            source.fetch("other").await,
            Err(SourceError::NotFound { .. })
        ));
        assert_eq!(source.kind(), "memory");
    }

    #[tokio::test]
    async fn test_wait_returns_after_set() {
        let source = Arc::new(MemorySource::new().with_config("cache", ttl(1)));
        source.fetch("cache").await.unwrap();

        let writer = Arc::clone(&source);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            writer.set("cache", ttl(2));
        });

        source
            .wait_for_change("cache", Duration::from_secs(5))
            .await
            .unwrap();
        handle.await.unwrap();
        assert_eq!(source.fetch("cache").await.unwrap(), ttl(2));
    }

    #[tokio::test]
    async fn test_change_before_wait_is_not_lost() {
        let source = MemorySource::new().with_config("cache", ttl(1));
        source.fetch("cache").await.unwrap();
        source.set("cache", ttl(2));

        source
            .wait_for_change("cache", Duration::from_millis(50))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_wait_times_out() {
        let source = MemorySource::new().with_config("cache", ttl(1));
        source.fetch("cache").await.unwrap();

        let err = source
            .wait_for_change("cache", Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn test_changes_to_other_names_do_not_wake() {
        let source = MemorySource::new()
            .with_config("cache", ttl(1))
            .with_config("orm", ttl(1));
        source.fetch("cache").await.unwrap();
        source.set("orm", ttl(5));

        assert!(source
            .wait_for_change("cache", Duration::from_millis(30))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_remove_is_a_change() {
        let source = MemorySource::new().with_config("cache", ttl(1));
        source.fetch("cache").await.unwrap();

        assert_eq!(source.remove("cache"), Some(ttl(1)));
        assert_eq!(source.remove("cache"), None);
        source
            .wait_for_change("cache", Duration::from_millis(50))
            .await
            .unwrap();
        assert!(source.fetch("cache").await.is_err());
    }
}
