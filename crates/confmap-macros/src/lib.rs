//! Derive macro for confmap configuration structures.
//!
//! `#[derive(Config)]` generates the decode schema of a struct at compile
//! time, so the engine never needs runtime type inspection.
//!
//! # Example
//!
//! ```rust,ignore
//! use confmap::Config;
//!
//! #[derive(Debug, Default, Config)]
//! #[confmap(rename_all = "camelCase")]
//! struct RedisConfig {
//!     #[confmap(default = "127.0.0.1:6379")]
//!     host_port: String,
//!     #[confmap(default = 0)]
//!     db: i64,
//!     #[confmap(name = "TLS", default = false)]
//!     use_tls: bool,
//!     #[confmap(skip)]
//!     generation: u64,
//! }
//! ```
//!
//! # Attributes
//!
//! Field attributes:
//! - `name = "..."`: decode name (matched case-insensitively)
//! - `default = ...`: default literal; a string or a bare number/bool literal
//! - `skip`: exclude the field from validation and decoding
//!
//! Container attributes:
//! - `rename_all = "..."`: `snake_case`, `camelCase`, `PascalCase` or `kebab-case`
//! - `crate = "..."`: path of the runtime crate, `::confmap` by default

mod derive;
mod parse;

use proc_macro::TokenStream;

/// Derives `Config` and `Field` for a struct with named fields.
///
/// The struct must also implement `Default`; fresh decodes start from
/// `Default::default()`.
///
/// # Generated Code
///
/// ```rust,ignore
/// impl ::confmap::Config for RedisConfig {
///     fn schema() -> ::confmap::StructSchema {
///         ::confmap::StructSchema::new(::core::any::type_name::<Self>())
///             .field(::confmap::FieldSchema::of::<String>("host_port", "hostPort")
///                 .with_default("127.0.0.1:6379"))
///             .field(::confmap::FieldSchema::skipped::<u64>("generation"))
///     }
///
///     fn field_mut(&mut self, index: usize) -> ::confmap::Slot<'_> {
///         match index {
///             0 => ::confmap::Field::slot(&mut self.host_port),
///             _ => ::confmap::Slot::Opaque,
///         }
///     }
/// }
/// ```
#[proc_macro_derive(Config, attributes(confmap))]
pub fn derive_config(input: TokenStream) -> TokenStream {
    derive::expand_config(input.into())
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
