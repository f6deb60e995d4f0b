//! # confmap
//!
//! **Schema-validating configuration decoding for typed Rust structures**
//!
//! confmap maps loosely-typed configuration data onto strongly-typed structs:
//!
//! - **Declared defaults** - every scalar field names its default; missing keys fall back to it
//! - **Case-insensitive keys** - `hostPort`, `HOSTPORT` and `hostport` address the same field
//! - **Drift diagnostics** - spare keys, spare fields and rejected values are reported, never fatal
//! - **Up-front validation** - a defective struct fails before any data is read, with every defect listed
//! - **Hot reload** - local files or in-memory sources, republished as immutable snapshots
//!
//! ## Quick Start
//!
//! ```
//! use confmap::{decode, Config, Value};
//!
//! #[derive(Debug, Default, Config)]
//! #[confmap(rename_all = "camelCase")]
//! struct RedisConfig {
//!     #[confmap(default = "127.0.0.1:6379")]
//!     host_port: String,
//!     #[confmap(default = 0)]
//!     db: i64,
//!     #[confmap(default = 8)]
//!     pool_size: u32,
//! }
//!
//! let source: Value = [("HostPort", Value::from("redis:6380")), ("db", Value::from("two"))]
//!     .into_iter()
//!     .collect();
//!
//! let decoded = decode::<RedisConfig>(&source).unwrap();
//! assert_eq!(decoded.value.host_port, "redis:6380");
//! assert_eq!(decoded.value.db, 0);
//! assert_eq!(decoded.value.pool_size, 8);
//! assert_eq!(decoded.diagnostics.spare_fields, vec!["poolsize".to_owned()]);
//! assert_eq!(decoded.diagnostics.mismatches[0].path, "db");
//! ```
//!
//! ## Reading from files
//!
//! ```no_run
//! use confmap::source::{watch_config, LocalSource, ReloadConfig};
//! use confmap::Config;
//! use std::sync::Arc;
//!
//! #[derive(Debug, Default, Config)]
//! struct OrmConfig {
//!     #[confmap(default = 10)]
//!     max_idle_conns: u32,
//! }
//!
//! # async fn example() -> Result<(), confmap::source::SourceError> {
//! let source = Arc::new(LocalSource::new("/etc/app"));
//! let handle = watch_config::<OrmConfig, _>(source, "orm.toml", ReloadConfig::default()).await?;
//! println!("{}", handle.current().config.max_idle_conns);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! source (file / memory) → Value tree → Decoder<T> → T + Diagnostics
//!                                           ↑
//!                      #[derive(Config)] → StructSchema (validated once)
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export the decode engine
pub use confmap_core::{
    apply_defaults, decode, decode_into, defaults, validate, validate_schema, Config,
    DecodeError, Decoded, Decoder, Diagnostics, DynConfig, Fallback, Field, FieldKind,
    FieldSchema, Mapping, Mismatch, Scalar, ScalarKind, ScalarSlot, SchemaError, SchemaErrors,
    SchemaFn, SequenceSlot, Slot, StructSchema, Value, ValueKind,
};

// Re-export the derive macro
pub use confmap_macros::Config;

// Re-export sources and hot-reload
pub use confmap_source as source;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```
/// use confmap::prelude::*;
///
/// #[derive(Default, Config)]
/// struct Limits {
///     #[confmap(default = 64)]
///     max_conns: u32,
/// }
///
/// assert_eq!(defaults::<Limits>().unwrap().max_conns, 64);
/// ```
pub mod prelude {
    pub use confmap_core::{
        decode, decode_into, defaults, Config, Decoded, Decoder, Diagnostics, Value,
    };
    pub use confmap_macros::Config;
    pub use confmap_source::{
        read, watch_config, ConfigHandle, ConfigSource, LocalSource, MemorySource, ReloadConfig,
        SourceError,
    };
}
