//! Schema model: the decodable shape of a target structure.
//!
//! A [`StructSchema`] is normally generated by `#[derive(Config)]`, but it is a
//! plain value and can be registered by hand:
//!
//! ```
//! use confmap_core::{FieldSchema, StructSchema};
//!
//! let schema = StructSchema::new("RedisConfig")
//!     .field(FieldSchema::of::<String>("host_port", "hostPort").with_default("127.0.0.1:6379"))
//!     .field(FieldSchema::of::<i64>("db", "db").with_default("0"))
//!     .field(FieldSchema::skipped::<u64>("generation"));
//!
//! assert_eq!(schema.fields().len(), 3);
//! assert_eq!(schema.fields()[0].tag(), "hostport");
//! ```

use std::fmt;
use std::str::FromStr;

use crate::field::Field;
use crate::value::fold_key;

/// Produces the schema of a nested structure on demand.
pub type SchemaFn = fn() -> StructSchema;

/// Native kind of a scalar field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    /// `bool`.
    Bool,
    /// `i8`.
    I8,
    /// `i16`.
    I16,
    /// `i32`.
    I32,
    /// `i64`.
    I64,
    /// `isize`.
    Isize,
    /// `u8`.
    U8,
    /// `u16`.
    U16,
    /// `u32`.
    U32,
    /// `u64`.
    U64,
    /// `usize`.
    Usize,
    /// `f32`.
    F32,
    /// `f64`.
    F64,
    /// `String`.
    String,
}

impl ScalarKind {
    /// Rust spelling of the kind, used in diagnostics.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::Isize => "isize",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::Usize => "usize",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::String => "String",
        }
    }

    /// Returns `true` for the integer kinds.
    pub const fn is_integer(self) -> bool {
        !matches!(self, Self::Bool | Self::F32 | Self::F64 | Self::String)
    }

    /// Checks that `literal` is a well-formed default for this kind.
    ///
    /// Booleans accept `true`/`false` in any case, numbers must parse in
    /// base 10 and fit the kind's width, strings accept anything.
    pub fn check_literal(self, literal: &str) -> Result<(), String> {
        match self {
            Self::Bool => parse_bool_literal(literal).map(drop),
            Self::I8 => parse_number_literal::<i8>(literal, self).map(drop),
            Self::I16 => parse_number_literal::<i16>(literal, self).map(drop),
            Self::I32 => parse_number_literal::<i32>(literal, self).map(drop),
            Self::I64 => parse_number_literal::<i64>(literal, self).map(drop),
            Self::Isize => parse_number_literal::<isize>(literal, self).map(drop),
            Self::U8 => parse_number_literal::<u8>(literal, self).map(drop),
            Self::U16 => parse_number_literal::<u16>(literal, self).map(drop),
            Self::U32 => parse_number_literal::<u32>(literal, self).map(drop),
            Self::U64 => parse_number_literal::<u64>(literal, self).map(drop),
            Self::Usize => parse_number_literal::<usize>(literal, self).map(drop),
            Self::F32 => parse_number_literal::<f32>(literal, self).map(drop),
            Self::F64 => parse_number_literal::<f64>(literal, self).map(drop),
            Self::String => Ok(()),
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parses a boolean default literal: `true` or `false`, case-insensitive.
pub(crate) fn parse_bool_literal(literal: &str) -> Result<bool, String> {
    if literal.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if literal.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(format!("expected `true` or `false`, got `{literal}`"))
    }
}

/// Parses a numeric default literal for the given kind.
pub(crate) fn parse_number_literal<T>(literal: &str, kind: ScalarKind) -> Result<T, String>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    literal
        .parse::<T>()
        .map_err(|e| format!("`{literal}` is not a valid {kind}: {e}"))
}

/// Decodable kind of a field.
#[derive(Debug, Clone)]
pub enum FieldKind {
    /// A primitive leaf.
    Scalar(ScalarKind),
    /// A nested structure, described by its own schema.
    Struct(SchemaFn),
    /// A homogeneous sequence of the inner kind.
    Sequence(Box<FieldKind>),
    /// A type the engine cannot decode; carries the Rust type name.
    Unsupported(&'static str),
}

impl FieldKind {
    /// Short description of the kind, used in diagnostics.
    pub fn describe(&self) -> String {
        match self {
            Self::Scalar(kind) => kind.name().to_owned(),
            Self::Struct(_) => "mapping".to_owned(),
            Self::Sequence(_) => "sequence".to_owned(),
            Self::Unsupported(name) => (*name).to_owned(),
        }
    }
}

/// Description of one field of a target structure.
#[derive(Debug, Clone)]
pub struct FieldSchema {
    ident: &'static str,
    tag: String,
    kind: FieldKind,
    default: Option<&'static str>,
    excluded: bool,
    settable: bool,
}

impl FieldSchema {
    /// Creates a field with an explicit kind. The tag is lower-cased.
    pub fn new(ident: &'static str, tag: &str, kind: FieldKind) -> Self {
        Self {
            ident,
            tag: fold_key(tag),
            kind,
            default: None,
            excluded: false,
            settable: true,
        }
    }

    /// Creates a field whose kind and settability come from the Rust type.
    pub fn of<T: Field>(ident: &'static str, tag: &str) -> Self {
        let mut field = Self::new(ident, tag, T::kind());
        field.settable = T::SETTABLE;
        field
    }

    /// Creates an excluded field. Its type does not need to be decodable.
    pub fn skipped<T: ?Sized>(ident: &'static str) -> Self {
        let mut field = Self::new(ident, "", FieldKind::Unsupported(std::any::type_name::<T>()));
        field.excluded = true;
        field
    }

    /// Sets the default literal.
    pub fn with_default(mut self, literal: &'static str) -> Self {
        self.default = Some(literal);
        self
    }

    /// Marks the field as excluded from validation and decoding.
    pub fn excluded(mut self) -> Self {
        self.excluded = true;
        self
    }

    /// Marks the field as not settable by the engine.
    pub fn read_only(mut self) -> Self {
        self.settable = false;
        self
    }

    /// Rust identifier of the field.
    pub fn ident(&self) -> &'static str {
        self.ident
    }

    /// Lower-cased decode name.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Decodable kind.
    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    /// Default literal, if declared.
    pub fn default_literal(&self) -> Option<&'static str> {
        self.default
    }

    /// Whether the field is skipped entirely.
    pub fn is_excluded(&self) -> bool {
        self.excluded
    }

    /// Whether the engine may assign the field.
    pub fn is_settable(&self) -> bool {
        self.settable
    }
}

/// Ordered field list of one structure type.
#[derive(Debug, Clone)]
pub struct StructSchema {
    type_name: &'static str,
    fields: Vec<FieldSchema>,
}

impl StructSchema {
    /// Creates an empty schema for the named type.
    pub fn new(type_name: &'static str) -> Self {
        Self {
            type_name,
            fields: Vec::new(),
        }
    }

    /// Appends a field. Field positions are the indices passed to
    /// [`Config::field_mut`](crate::Config::field_mut).
    pub fn field(mut self, field: FieldSchema) -> Self {
        self.fields.push(field);
        self
    }

    /// Name of the described type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[FieldSchema] {
        &self.fields
    }

    /// Finds a non-excluded field by decode name, case-insensitively.
    pub fn find(&self, tag: &str) -> Option<&FieldSchema> {
        let tag = fold_key(tag);
        self.fields.iter().find(|f| !f.excluded && f.tag == tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bool_literal_is_case_insensitive() {
        assert!(ScalarKind::Bool.check_literal("TRUE").is_ok());
        assert!(ScalarKind::Bool.check_literal("False").is_ok());
        assert!(ScalarKind::Bool.check_literal("yes").is_err());
        assert!(ScalarKind::Bool.check_literal("").is_err());
    }

    #[test]
    fn test_integer_literal_respects_width() {
        assert!(ScalarKind::I64.check_literal("42").is_ok());
        assert!(ScalarKind::I64.check_literal("-42").is_ok());
        assert!(ScalarKind::U8.check_literal("255").is_ok());
        assert!(ScalarKind::U8.check_literal("300").is_err());
        assert!(ScalarKind::U32.check_literal("-1").is_err());
        assert!(ScalarKind::I32.check_literal("4x").is_err());
        assert!(ScalarKind::I32.check_literal("").is_err());
    }

    #[test]
    fn test_float_and_string_literals() {
        assert!(ScalarKind::F64.check_literal("0.25").is_ok());
        assert!(ScalarKind::F32.check_literal("abc").is_err());
        assert!(ScalarKind::String.check_literal("").is_ok());
        assert!(ScalarKind::String.check_literal("anything at all").is_ok());
    }

    #[test]
    fn test_invalid_literal_message_names_kind() {
        let err = ScalarKind::U16.check_literal("70000").unwrap_err();
        assert!(err.contains("70000"));
        assert!(err.contains("u16"));
    }

    #[test]
    fn test_is_integer() {
        assert!(ScalarKind::Usize.is_integer());
        assert!(!ScalarKind::F64.is_integer());
        assert!(!ScalarKind::String.is_integer());
    }

    #[test]
    fn test_field_schema_lowercases_tag() {
        let field = FieldSchema::of::<bool>("use_external_host", "useExternalHost");
        assert_eq!(field.tag(), "useexternalhost");
        assert_eq!(field.ident(), "use_external_host");
        assert!(field.is_settable());
        assert!(!field.is_excluded());
        assert!(matches!(field.kind(), FieldKind::Scalar(ScalarKind::Bool)));
    }

    #[test]
    fn test_skipped_field() {
        let field = FieldSchema::skipped::<std::sync::mpsc::Sender<()>>("events");
        assert!(field.is_excluded());
        assert!(matches!(field.kind(), FieldKind::Unsupported(_)));
    }

    #[test]
    fn test_find_ignores_excluded_fields() {
        let schema = StructSchema::new("T")
            .field(FieldSchema::of::<i64>("a", "A").with_default("1"))
            .field(FieldSchema::of::<i64>("b", "b").excluded());

        assert_eq!(schema.find("a").map(FieldSchema::ident), Some("a"));
        assert!(schema.find("b").is_none());
        assert!(schema.find("c").is_none());
    }
}
