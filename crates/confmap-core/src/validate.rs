//! Schema validation.
//!
//! Validation walks a type's schema once, recursing into nested structures
//! and sequence element types, and collects every defect instead of stopping
//! at the first one. A type that fails validation is never decoded.

use std::collections::HashSet;

use crate::diagnostics::child_path;
use crate::error::{SchemaError, SchemaErrors};
use crate::field::Config;
use crate::schema::{FieldKind, ScalarKind, SchemaFn, StructSchema};

/// Validates the schema of `T`.
///
/// # Example
///
/// ```
/// use confmap_core::{validate, Config, Field, FieldSchema, Slot, StructSchema};
///
/// #[derive(Default)]
/// struct Broken {
///     port: u16,
/// }
///
/// impl Config for Broken {
///     fn schema() -> StructSchema {
///         // No default literal for a scalar field.
///         StructSchema::new("Broken").field(FieldSchema::of::<u16>("port", "port"))
///     }
///
///     fn field_mut(&mut self, index: usize) -> Slot<'_> {
///         match index {
///             0 => self.port.slot(),
///             _ => Slot::Opaque,
///         }
///     }
/// }
///
/// let errors = validate::<Broken>().unwrap_err();
/// assert_eq!(errors.len(), 1);
/// ```
pub fn validate<T: Config>() -> Result<(), SchemaErrors> {
    validate_schema(&T::schema())
}

/// Validates an explicit schema value.
pub fn validate_schema(schema: &StructSchema) -> Result<(), SchemaErrors> {
    let mut validator = Validator::default();
    validator.check_struct("", schema);

    if validator.errors.is_empty() {
        Ok(())
    } else {
        Err(SchemaErrors::new(schema.type_name(), validator.errors))
    }
}

#[derive(Default)]
struct Validator {
    errors: Vec<SchemaError>,
    // Types currently being checked; guards against self-containing schemas.
    stack: Vec<&'static str>,
}

impl Validator {
    fn check_struct(&mut self, path: &str, schema: &StructSchema) {
        self.stack.push(schema.type_name());
        let mut seen: HashSet<&str> = HashSet::new();

        for field in schema.fields() {
            if field.is_excluded() {
                continue;
            }

            let field_path = child_path(path, field.tag());

            // The first field keeps the tag; later ones are reported.
            if !seen.insert(field.tag()) {
                self.errors.push(SchemaError::DuplicateTag {
                    path: field_path,
                    tag: field.tag().to_owned(),
                });
                continue;
            }

            if !field.is_settable() {
                self.errors.push(SchemaError::NotSettable { path: field_path });
                continue;
            }

            match field.kind() {
                FieldKind::Scalar(kind) => {
                    self.check_default(field_path, *kind, field.default_literal());
                }
                FieldKind::Struct(schema_fn) => self.check_nested(&field_path, *schema_fn),
                FieldKind::Sequence(element) => self.check_sequence(&field_path, element),
                FieldKind::Unsupported(type_name) => {
                    self.errors.push(SchemaError::Unsupported {
                        path: field_path,
                        type_name: (*type_name).to_owned(),
                    });
                }
            }
        }

        self.stack.pop();
    }

    fn check_default(&mut self, path: String, kind: ScalarKind, literal: Option<&str>) {
        match literal {
            None => self.errors.push(SchemaError::MissingDefault { path }),
            Some(literal) => {
                if let Err(reason) = kind.check_literal(literal) {
                    self.errors.push(SchemaError::InvalidDefault {
                        path,
                        literal: literal.to_owned(),
                        reason,
                    });
                }
            }
        }
    }

    fn check_nested(&mut self, path: &str, schema_fn: SchemaFn) {
        let nested = schema_fn();
        if self.stack.contains(&nested.type_name()) {
            self.errors.push(SchemaError::RecursiveType {
                path: path.to_owned(),
                type_name: nested.type_name().to_owned(),
            });
            return;
        }
        self.check_struct(path, &nested);
    }

    fn check_sequence(&mut self, path: &str, element: &FieldKind) {
        // Scalar elements carry no default at the sequence level.
        match element {
            FieldKind::Scalar(_) => {}
            FieldKind::Struct(schema_fn) => self.check_nested(&format!("{path}[]"), *schema_fn),
            FieldKind::Sequence(_) => self.errors.push(SchemaError::NestedSequence {
                path: path.to_owned(),
            }),
            FieldKind::Unsupported(type_name) => self.errors.push(SchemaError::Unsupported {
                path: format!("{path}[]"),
                type_name: (*type_name).to_owned(),
            }),
        }
    }
}
