//! The configuration source boundary.
//!
//! A [`ConfigSource`] produces parsed [`Value`] trees by name and reports when
//! a named configuration changes. [`read`] and [`listen`] funnel source data
//! into exactly one decode each.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use confmap_core::{Config, Decoded, Decoder, Diagnostics, Value};

use crate::SourceError;

/// A backend that stores named configurations.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    /// Short backend name used in logs (`local`, `memory`, ...).
    fn kind(&self) -> &'static str;

    /// Loads and parses the named configuration.
    async fn fetch(&self, name: &str) -> Result<Value, SourceError>;

    /// Resolves once the named configuration differs from what the last
    /// [`fetch`](ConfigSource::fetch) returned.
    ///
    /// Fails with [`SourceError::Timeout`] when nothing changes within
    /// `timeout`.
    async fn wait_for_change(&self, name: &str, timeout: Duration) -> Result<(), SourceError>;
}

#[async_trait]
impl<S: ConfigSource + ?Sized> ConfigSource for Arc<S> {
    fn kind(&self) -> &'static str {
        (**self).kind()
    }

    async fn fetch(&self, name: &str) -> Result<Value, SourceError> {
        (**self).fetch(name).await
    }

    async fn wait_for_change(&self, name: &str, timeout: Duration) -> Result<(), SourceError> {
        (**self).wait_for_change(name, timeout).await
    }
}

/// Reads the named configuration into a fresh `T`.
///
/// The schema of `T` is validated before the source is touched. Diagnostics
/// are logged as warnings and returned with the value.
pub async fn read<T, S>(source: &S, name: &str, timeout: Duration) -> Result<Decoded<T>, SourceError>
where
    T: Config,
    S: ConfigSource + ?Sized,
{
    let decoder = Decoder::<T>::new()?;
    read_with(&decoder, source, name, timeout).await
}

/// Reads the named configuration into an existing `target`.
pub async fn read_into<T, S>(
    source: &S,
    name: &str,
    target: &mut T,
    timeout: Duration,
) -> Result<Diagnostics, SourceError>
where
    T: Config,
    S: ConfigSource + ?Sized,
{
    let decoder = Decoder::<T>::new()?;
    let value = fetch_with_timeout(source, name, timeout).await?;
    let diagnostics = decoder.decode_into(&value, target)?;
    diagnostics.log(name);
    Ok(diagnostics)
}

/// Waits for the named configuration to change, then decodes it into
/// `target`.
///
/// `timeout` bounds the wait and the read separately.
pub async fn listen<T, S>(
    source: &S,
    name: &str,
    target: &mut T,
    timeout: Duration,
) -> Result<Diagnostics, SourceError>
where
    T: Config,
    S: ConfigSource + ?Sized,
{
    source.wait_for_change(name, timeout).await?;
    tracing::debug!(config = name, source = source.kind(), "configuration change detected");
    read_into(source, name, target, timeout).await
}

pub(crate) async fn read_with<T, S>(
    decoder: &Decoder<T>,
    source: &S,
    name: &str,
    timeout: Duration,
) -> Result<Decoded<T>, SourceError>
where
    T: Config,
    S: ConfigSource + ?Sized,
{
    let value = fetch_with_timeout(source, name, timeout).await?;
    let decoded = decoder.decode(&value)?;
    decoded.diagnostics.log(name);
    Ok(decoded)
}

async fn fetch_with_timeout<S>(source: &S, name: &str, timeout: Duration) -> Result<Value, SourceError>
where
    S: ConfigSource + ?Sized,
{
    tokio::time::timeout(timeout, source.fetch(name))
        .await
        .map_err(|_| SourceError::timeout(name, timeout))?
}
