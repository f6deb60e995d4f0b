//! Schema-validating configuration decoder.
//!
//! `confmap-core` maps loosely-typed configuration data (a [`Value`] tree
//! parsed from TOML, JSON, YAML or any other serde format) onto strongly-typed
//! structures, filling declared defaults and reporting drift between the code
//! and its configuration source.
//!
//! # Overview
//!
//! - [`Value`] / [`Mapping`] - the untyped input tree, with case-insensitive keys
//! - [`StructSchema`] / [`FieldSchema`] - the decodable shape of a structure
//! - [`validate`] - structural checks, run once per type, aggregating every defect
//! - [`Decoder`] / [`decode`] - merges a tree into a structure
//! - [`defaults`] / [`apply_defaults`] - declared defaults, cascading into nested structures
//! - [`Diagnostics`] - spare keys, spare fields and rejected values
//!
//! Schemas are usually generated by `#[derive(Config)]` from the `confmap`
//! crate; implementing [`Config`] by hand is the manual registration path.
//!
//! # Decoding rules
//!
//! | Input | Field kind | Result |
//! |-------|------------|--------|
//! | key missing | any | default applied, path listed in `spare_fields` |
//! | matching kind | scalar | value assigned (integers widen to floats) |
//! | wrong kind | scalar | default applied, mismatch recorded |
//! | mapping | structure | decoded recursively |
//! | not a mapping | structure | defaults cascaded, mismatch recorded |
//! | sequence | sequence | contents replaced element by element |
//! | not a sequence | sequence | field untouched, mismatch recorded |
//! | key no field claims | - | listed in `spare_keys` |
//!
//! A scalar sequence element that fails to convert is skipped; a structure
//! element that is not a mapping receives its defaults and keeps its position.
//!
//! # Example
//!
//! ```
//! use confmap_core::{decode, Config, Field, FieldSchema, Slot, StructSchema, Value};
//!
//! #[derive(Default)]
//! struct RedisConfig {
//!     host_port: String,
//!     db: i64,
//! }
//!
//! impl Config for RedisConfig {
//!     fn schema() -> StructSchema {
//!         StructSchema::new("RedisConfig")
//!             .field(FieldSchema::of::<String>("host_port", "hostPort").with_default("127.0.0.1:6379"))
//!             .field(FieldSchema::of::<i64>("db", "db").with_default("0"))
//!     }
//!
//!     fn field_mut(&mut self, index: usize) -> Slot<'_> {
//!         match index {
//!             0 => self.host_port.slot(),
//!             1 => self.db.slot(),
//!             _ => Slot::Opaque,
//!         }
//!     }
//! }
//!
//! let source: Value = toml_like();
//! let decoded = decode::<RedisConfig>(&source).unwrap();
//!
//! assert_eq!(decoded.value.host_port, "redis:6379");
//! assert_eq!(decoded.value.db, 0);
//! assert_eq!(decoded.diagnostics.spare_fields, vec!["db".to_owned()]);
//! assert_eq!(decoded.diagnostics.spare_keys, vec!["password".to_owned()]);
//!
//! # fn toml_like() -> Value {
//! #     [("hostPort", "redis:6379"), ("password", "secret")].into_iter().collect()
//! # }
//! ```

#![warn(missing_docs)]

mod decode;
mod default;
mod diagnostics;
mod error;
mod field;
mod schema;
mod validate;
mod value;

#[cfg(test)]
mod testing;

pub use decode::{decode, decode_into, Decoded, Decoder};
pub use default::{apply_defaults, defaults};
pub use diagnostics::{Diagnostics, Fallback, Mismatch};
pub use error::{DecodeError, SchemaError, SchemaErrors};
pub use field::{Config, DynConfig, Field, Scalar, ScalarSlot, SequenceSlot, Slot};
pub use schema::{FieldKind, FieldSchema, ScalarKind, SchemaFn, StructSchema};
pub use validate::{validate, validate_schema};
pub use value::{Mapping, Value, ValueKind};
