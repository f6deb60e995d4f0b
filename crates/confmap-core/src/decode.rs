//! The decoder: merges a [`Value`] tree into a [`Config`] structure.
//!
//! Decoding walks the schema and the input mapping in lock-step. Keys are
//! matched case-insensitively against field tags. Missing keys and rejected
//! values fall back to declared defaults; nothing found in the input can make
//! a decode fail once the schema has been validated.

use std::collections::HashSet;
use std::fmt;
use std::marker::PhantomData;

use crate::default::{apply_field_default, apply_struct_defaults, assign_default};
use crate::diagnostics::{child_path, index_path, Diagnostics, Fallback, Mismatch};
use crate::error::{DecodeError, SchemaErrors};
use crate::field::{Config, DynConfig, SequenceSlot, Slot};
use crate::schema::{FieldKind, FieldSchema, StructSchema};
use crate::validate::validate_schema;
use crate::value::{Mapping, Value};

/// A freshly decoded structure and what the decode noticed along the way.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded<T> {
    /// The populated structure.
    pub value: T,
    /// Spare keys, spare fields and rejected values.
    pub diagnostics: Diagnostics,
}

impl<T> Decoded<T> {
    /// Discards the diagnostics.
    pub fn into_inner(self) -> T {
        self.value
    }

    /// Splits into the value and its diagnostics.
    pub fn into_parts(self) -> (T, Diagnostics) {
        (self.value, self.diagnostics)
    }
}

/// Decoder for one target type, holding its validated schema.
///
/// Validation runs once in [`Decoder::new`]; every decode afterwards reuses
/// the schema. Reload loops should keep one decoder per target type.
///
/// ```
/// use confmap_core::{Config, Decoder, Field, FieldSchema, Slot, StructSchema, Value};
///
/// #[derive(Default)]
/// struct Limits {
///     max_conns: u32,
///     compress: bool,
/// }
///
/// impl Config for Limits {
///     fn schema() -> StructSchema {
///         StructSchema::new("Limits")
///             .field(FieldSchema::of::<u32>("max_conns", "maxConns").with_default("64"))
///             .field(FieldSchema::of::<bool>("compress", "compress").with_default("false"))
///     }
///
///     fn field_mut(&mut self, index: usize) -> Slot<'_> {
///         match index {
///             0 => self.max_conns.slot(),
///             1 => self.compress.slot(),
///             _ => Slot::Opaque,
///         }
///     }
/// }
///
/// let decoder = Decoder::<Limits>::new().unwrap();
/// let source: Value = [("MAXCONNS", Value::from(128))].into_iter().collect();
///
/// let decoded = decoder.decode(&source).unwrap();
/// assert_eq!(decoded.value.max_conns, 128);
/// assert!(!decoded.value.compress);
/// assert_eq!(decoded.diagnostics.spare_fields, vec!["compress".to_owned()]);
/// ```
pub struct Decoder<T> {
    schema: StructSchema,
    _target: PhantomData<fn() -> T>,
}

impl<T: Config> Decoder<T> {
    /// Validates the schema of `T`.
    pub fn new() -> Result<Self, SchemaErrors> {
        let schema = T::schema();
        validate_schema(&schema)?;
        Ok(Self {
            schema,
            _target: PhantomData,
        })
    }

    /// The validated schema.
    pub fn schema(&self) -> &StructSchema {
        &self.schema
    }

    /// Decodes into a fresh `T::default()`.
    pub fn decode(&self, source: &Value) -> Result<Decoded<T>, DecodeError> {
        Ok(self.decode_mapping(root_mapping(source)?))
    }

    /// Decodes a mapping into a fresh `T::default()`.
    pub fn decode_mapping(&self, mapping: &Mapping) -> Decoded<T> {
        let mut value = T::default();
        let diagnostics = self.decode_mapping_into(mapping, &mut value);
        Decoded { value, diagnostics }
    }

    /// Decodes into an existing instance, mutating it in place.
    ///
    /// Sequence fields whose key is missing keep their previous contents.
    pub fn decode_into(&self, source: &Value, target: &mut T) -> Result<Diagnostics, DecodeError> {
        Ok(self.decode_mapping_into(root_mapping(source)?, target))
    }

    /// Decodes a mapping into an existing instance.
    pub fn decode_mapping_into(&self, mapping: &Mapping, target: &mut T) -> Diagnostics {
        let mut walker = Walker::default();
        walker.decode_struct("", &self.schema, mapping, target);
        walker.diagnostics
    }

    /// Builds a `T` holding only declared defaults.
    pub fn defaults(&self) -> T {
        let mut value = T::default();
        apply_struct_defaults(&self.schema, &mut value);
        value
    }
}

impl<T> Clone for Decoder<T> {
    fn clone(&self) -> Self {
        Self {
            schema: self.schema.clone(),
            _target: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Decoder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decoder")
            .field("type_name", &self.schema.type_name())
            .field("fields", &self.schema.fields().len())
            .finish()
    }
}

/// Validates `T` and decodes `source` into a fresh instance.
pub fn decode<T: Config>(source: &Value) -> Result<Decoded<T>, DecodeError> {
    Decoder::<T>::new()?.decode(source)
}

/// Validates `T` and decodes `source` into `target` in place.
///
/// On a schema error or a non-mapping root, `target` is untouched.
pub fn decode_into<T: Config>(source: &Value, target: &mut T) -> Result<Diagnostics, DecodeError> {
    Decoder::<T>::new()?.decode_into(source, target)
}

fn root_mapping(source: &Value) -> Result<&Mapping, DecodeError> {
    source
        .as_mapping()
        .ok_or_else(|| DecodeError::not_a_mapping(source.kind()))
}

#[derive(Default)]
struct Walker {
    diagnostics: Diagnostics,
}

impl Walker {
    fn decode_struct(
        &mut self,
        path: &str,
        schema: &StructSchema,
        mapping: &Mapping,
        target: &mut dyn DynConfig,
    ) {
        let mut claimed: HashSet<&str> = HashSet::new();

        for (index, field) in schema.fields().iter().enumerate() {
            if field.is_excluded() {
                continue;
            }

            let field_path = child_path(path, field.tag());
            let slot = target.slot_at(index);

            match mapping.get(field.tag()) {
                Some(value) => {
                    claimed.insert(field.tag());
                    self.decode_field(&field_path, field, value, slot);
                }
                None => {
                    apply_field_default(field, slot);
                    self.diagnostics.spare_fields.push(field_path);
                }
            }
        }

        for (folded, original) in mapping.folded_keys() {
            if !claimed.contains(folded) {
                self.diagnostics.spare_keys.push(child_path(path, original));
            }
        }
    }

    fn decode_field(&mut self, path: &str, field: &FieldSchema, value: &Value, slot: Slot<'_>) {
        match (field.kind(), slot) {
            (FieldKind::Scalar(kind), Slot::Scalar(scalar)) => {
                if scalar.assign(value).is_err() {
                    self.mismatch(path, kind.name(), value, Fallback::Default);
                    assign_default(field, scalar);
                }
            }
            (FieldKind::Struct(schema_fn), Slot::Struct(nested)) => {
                let schema = schema_fn();
                match value {
                    Value::Map(mapping) => self.decode_struct(path, &schema, mapping, nested),
                    other => {
                        self.mismatch(path, "mapping", other, Fallback::Default);
                        apply_struct_defaults(&schema, nested);
                    }
                }
            }
            (FieldKind::Sequence(element), Slot::Sequence(sequence)) => match value {
                Value::Seq(items) => self.decode_sequence(path, element, items, sequence),
                other => self.mismatch(path, "sequence", other, Fallback::Untouched),
            },
            (kind, slot) => {
                tracing::error!(
                    path,
                    expected = %kind.describe(),
                    ?slot,
                    "field slot does not match its schema; field left untouched"
                );
            }
        }
    }

    fn decode_sequence(
        &mut self,
        path: &str,
        element: &FieldKind,
        items: &[Value],
        sequence: &mut dyn SequenceSlot,
    ) {
        sequence.clear();
        let mut element_schema: Option<StructSchema> = None;

        for (index, item) in items.iter().enumerate() {
            let item_path = index_path(path, index);

            let keep = match (element, sequence.push_default()) {
                (FieldKind::Scalar(kind), Slot::Scalar(scalar)) => {
                    if scalar.assign(item).is_ok() {
                        true
                    } else {
                        self.mismatch(&item_path, kind.name(), item, Fallback::Skipped);
                        false
                    }
                }
                (FieldKind::Struct(schema_fn), Slot::Struct(nested)) => {
                    let schema = element_schema.get_or_insert_with(*schema_fn);
                    match item {
                        Value::Map(mapping) => {
                            self.decode_struct(&item_path, schema, mapping, nested);
                        }
                        other => {
                            self.mismatch(&item_path, "mapping", other, Fallback::Default);
                            apply_struct_defaults(schema, nested);
                        }
                    }
                    true
                }
                (kind, slot) => {
                    tracing::error!(
                        path = %item_path,
                        expected = %kind.describe(),
                        ?slot,
                        "sequence element does not match its schema; element skipped"
                    );
                    false
                }
            };

            if !keep {
                sequence.pop();
            }
        }
    }

    fn mismatch(&mut self, path: &str, expected: &str, found: &Value, fallback: Fallback) {
        tracing::debug!(
            path,
            expected,
            found = %found.kind(),
            %fallback,
            "configuration value rejected"
        );
        self.diagnostics.mismatches.push(Mismatch {
            path: path.to_owned(),
            expected: expected.to_owned(),
            found: found.kind(),
            fallback,
        });
    }
}
