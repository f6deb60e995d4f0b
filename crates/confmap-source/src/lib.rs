//! Configuration sources and hot-reload for confmap.
//!
//! This crate connects the decode engine in `confmap-core` to the places
//! configurations live:
//! - Local TOML and JSON files (YAML with the `yaml` feature)
//! - In-memory configurations set by the application
//! - Change notification with per-call timeouts
//! - A background reload loop publishing immutable snapshots
//!
//! # Overview
//!
//! - [`ConfigSource`] - fetch a named configuration, wait for it to change
//! - [`LocalSource`] - files under a root directory, polled and woken by [`FileWatcher`]
//! - [`MemorySource`] - programmatic configurations
//! - [`read`] / [`read_into`] / [`listen`] - one-shot reads into a typed structure
//! - [`watch_config`] - keep a typed configuration current in the background
//!
//! Every read validates the target type's schema before touching the source
//! and logs its diagnostics as warnings.
//!
//! # Example
//!
//! ```no_run
//! use confmap_source::{read, LocalSource};
//! use std::time::Duration;
//!
//! # #[derive(Default, confmap_macros::Config)]
//! # #[confmap(crate = "confmap_core")]
//! # struct RedisConfig {
//! #     #[confmap(default = "127.0.0.1:6379")]
//! #     host_port: String,
//! #     #[confmap(default = 0)]
//! #     db: i64,
//! # }
//! # async fn example() -> Result<(), confmap_source::SourceError> {
//! let source = LocalSource::new("/etc/app");
//! let redis = read::<RedisConfig, _>(&source, "redis.toml", Duration::from_secs(20)).await?;
//!
//! if !redis.diagnostics.is_clean() {
//!     eprintln!("redis.toml drifted from RedisConfig: {:?}", redis.diagnostics);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod error;
mod format;
mod local;
mod memory;
mod reload;
mod source;
mod watcher;

pub use error::{ListenError, SourceError};
pub use format::Format;
pub use local::{LocalSource, LocalSourceConfig};
pub use memory::MemorySource;
pub use reload::{watch_config, ConfigHandle, ReloadConfig, Snapshot};
pub use source::{listen, read, read_into, ConfigSource};
pub use watcher::{FileWatcher, FileWatcherBuilder, FileWatcherConfig, WatchEvent, WatchEventKind};
