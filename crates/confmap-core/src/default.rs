//! Default synthesis.
//!
//! Scalars take their declared literal, nested structures are filled
//! recursively, and sequences are left as they are: a sequence has no
//! default at the sequence level.

use crate::error::SchemaErrors;
use crate::field::{Config, DynConfig, ScalarSlot, Slot};
use crate::schema::{FieldKind, FieldSchema, StructSchema};
use crate::validate::validate_schema;

/// Fills every decodable field of `target` with its declared default.
///
/// The schema of `T` is validated first; on failure `target` is untouched.
pub fn apply_defaults<T: Config>(target: &mut T) -> Result<(), SchemaErrors> {
    let schema = T::schema();
    validate_schema(&schema)?;
    apply_struct_defaults(&schema, target);
    Ok(())
}

/// Builds a `T` holding only declared defaults.
///
/// ```
/// use confmap_core::{defaults, Config, Field, FieldSchema, Slot, StructSchema};
///
/// #[derive(Default)]
/// struct Limits {
///     max_conns: u32,
/// }
///
/// impl Config for Limits {
///     fn schema() -> StructSchema {
///         StructSchema::new("Limits")
///             .field(FieldSchema::of::<u32>("max_conns", "maxConns").with_default("64"))
///     }
///
///     fn field_mut(&mut self, index: usize) -> Slot<'_> {
///         match index {
///             0 => self.max_conns.slot(),
///             _ => Slot::Opaque,
///         }
///     }
/// }
///
/// let limits: Limits = defaults().unwrap();
/// assert_eq!(limits.max_conns, 64);
/// ```
pub fn defaults<T: Config>() -> Result<T, SchemaErrors> {
    let mut target = T::default();
    apply_defaults(&mut target)?;
    Ok(target)
}

/// Applies defaults to every non-excluded field of a validated structure.
pub(crate) fn apply_struct_defaults(schema: &StructSchema, target: &mut dyn DynConfig) {
    for (index, field) in schema.fields().iter().enumerate() {
        if field.is_excluded() {
            continue;
        }
        apply_field_default(field, target.slot_at(index));
    }
}

/// Applies the default of one field.
pub(crate) fn apply_field_default(field: &FieldSchema, slot: Slot<'_>) {
    match (field.kind(), slot) {
        (FieldKind::Scalar(_), Slot::Scalar(scalar)) => assign_default(field, scalar),
        (FieldKind::Struct(schema_fn), Slot::Struct(nested)) => {
            apply_struct_defaults(&schema_fn(), nested);
        }
        _ => {}
    }
}

/// Assigns the declared literal of a scalar field.
pub(crate) fn assign_default(field: &FieldSchema, scalar: &mut dyn ScalarSlot) {
    let Some(literal) = field.default_literal() else {
        return;
    };
    // Validation has already parsed the literal; a failure here means the
    // schema and the slot disagree on the field's type.
    if let Err(reason) = scalar.assign_literal(literal) {
        tracing::error!(
            field = field.ident(),
            literal,
            %reason,
            "default literal rejected by field"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Node, Pool, Server};

    #[test]
    fn test_defaults_fill_scalars_and_nested_structs() {
        let server: Server = defaults().unwrap();

        assert_eq!(server.host_port, "127.0.0.1:6379");
        assert!(server.use_tls);
        assert_eq!(server.retries, 3);
        assert!((server.ratio - 0.5).abs() < f64::EPSILON);
        assert_eq!(
            server.pool,
            Pool {
                size: 8,
                name: "primary".to_owned(),
            }
        );
    }

    #[test]
    fn test_sequences_and_excluded_fields_are_untouched() {
        let mut server = Server {
            tags: vec!["keep".to_owned()],
            replicas: vec![Pool::default()],
            generation: 7,
            ..Server::default()
        };

        apply_defaults(&mut server).unwrap();

        assert_eq!(server.tags, vec!["keep".to_owned()]);
        assert_eq!(server.replicas, vec![Pool::default()]);
        assert_eq!(server.generation, 7);
    }

    #[test]
    fn test_invalid_schema_leaves_target_untouched() {
        let mut node = Node {
            label: "custom".to_owned(),
            children: Vec::new(),
        };

        assert!(apply_defaults(&mut node).is_err());
        assert_eq!(node.label, "custom");
    }

    #[test]
    fn test_apply_defaults_overwrites_previous_values() {
        let mut pool = Pool {
            size: 1,
            name: "old".to_owned(),
        };
        apply_defaults(&mut pool).unwrap();
        assert_eq!(pool.size, 8);
        assert_eq!(pool.name, "primary");
    }
}
