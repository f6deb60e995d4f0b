//! Error types for schema validation and decoding.

use std::fmt;

use thiserror::Error;

use crate::value::ValueKind;

/// A structural defect in a target type.
///
/// Every variant carries the path of the offending field so several defects
/// can be reported together.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// Two fields at the same level share a decode name.
    #[error("duplicate tag `{tag}` at `{path}`")]
    DuplicateTag {
        /// Path of the second field.
        path: String,
        /// The shared, lower-cased tag.
        tag: String,
    },

    /// The field cannot be assigned by the engine.
    #[error("field `{path}` cannot be assigned")]
    NotSettable {
        /// Path of the field.
        path: String,
    },

    /// A scalar field has no default literal.
    #[error("field `{path}` has no default value")]
    MissingDefault {
        /// Path of the field.
        path: String,
    },

    /// A scalar field's default literal does not parse as its kind.
    #[error("field `{path}` has an invalid default `{literal}`: {reason}")]
    InvalidDefault {
        /// Path of the field.
        path: String,
        /// The declared literal.
        literal: String,
        /// Parse failure.
        reason: String,
    },

    /// A sequence whose elements are sequences.
    #[error("field `{path}` is a nested sequence, which is not supported")]
    NestedSequence {
        /// Path of the field.
        path: String,
    },

    /// A field type outside scalar, structure and sequence.
    #[error("field `{path}` has unsupported type `{type_name}`")]
    Unsupported {
        /// Path of the field.
        path: String,
        /// Rust type name.
        type_name: String,
    },

    /// A structure that contains itself.
    #[error("field `{path}` recursively contains `{type_name}`")]
    RecursiveType {
        /// Path of the field.
        path: String,
        /// Rust type name of the recursive structure.
        type_name: String,
    },
}

impl SchemaError {
    /// Path of the field the defect belongs to.
    pub fn path(&self) -> &str {
        match self {
            Self::DuplicateTag { path, .. }
            | Self::NotSettable { path }
            | Self::MissingDefault { path }
            | Self::InvalidDefault { path, .. }
            | Self::NestedSequence { path }
            | Self::Unsupported { path, .. }
            | Self::RecursiveType { path, .. } => path,
        }
    }
}

/// Every defect found while validating one target type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaErrors {
    type_name: &'static str,
    errors: Vec<SchemaError>,
}

impl SchemaErrors {
    pub(crate) fn new(type_name: &'static str, errors: Vec<SchemaError>) -> Self {
        Self { type_name, errors }
    }

    /// Name of the type that failed validation.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The individual defects, in discovery order.
    pub fn errors(&self) -> &[SchemaError] {
        &self.errors
    }

    /// Number of defects.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Always `false` for a constructed value; provided for symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for SchemaErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}` cannot be decoded:", self.type_name)?;
        for error in &self.errors {
            write!(f, "\n{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for SchemaErrors {}

impl IntoIterator for SchemaErrors {
    type Item = SchemaError;
    type IntoIter = std::vec::IntoIter<SchemaError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

/// Errors that prevent a decode from starting.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The target type failed validation; nothing was assigned.
    #[error(transparent)]
    Schema(#[from] SchemaErrors),

    /// The root of the source data is not a mapping.
    #[error("configuration root must be a mapping, found {found}")]
    NotAMapping {
        /// Kind of the root value.
        found: ValueKind,
    },
}

impl DecodeError {
    /// Create a new root-kind error.
    pub fn not_a_mapping(found: ValueKind) -> Self {
        Self::NotAMapping { found }
    }
}
