//! Type-level description and mutable access for decodable fields.
//!
//! The engine never inspects types at runtime. Each field type implements
//! [`Field`], which reports its [`FieldKind`] and hands the decoder a [`Slot`]:
//! a mutable view through which scalars are assigned, nested structures are
//! walked and sequences are rebuilt.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::schema::{parse_bool_literal, parse_number_literal, FieldKind, ScalarKind, StructSchema};
use crate::value::Value;

/// A structure the engine can decode into.
///
/// Usually derived with `#[derive(Config)]`. Implementing it by hand is the
/// manual registration path: [`schema`](Config::schema) describes the fields
/// and [`field_mut`](Config::field_mut) exposes the field at each schema
/// position.
///
/// `Default` supplies the zero-valued instance that fresh decodes start from.
pub trait Config: Default {
    /// Describes the decodable fields of `Self`, in declaration order.
    fn schema() -> StructSchema;

    /// Returns the slot for the field at `index` in [`schema`](Config::schema).
    ///
    /// Excluded fields and out-of-range indices return [`Slot::Opaque`].
    fn field_mut(&mut self, index: usize) -> Slot<'_>;
}

/// Object-safe view of a [`Config`] used while walking nested structures.
pub trait DynConfig {
    /// Returns the slot for the field at `index`.
    fn slot_at(&mut self, index: usize) -> Slot<'_>;
}

impl<T: Config> DynConfig for T {
    fn slot_at(&mut self, index: usize) -> Slot<'_> {
        self.field_mut(index)
    }
}

/// A type that may appear as a field of a [`Config`] structure.
pub trait Field {
    /// Whether the engine can assign this type in place.
    const SETTABLE: bool = true;

    /// Decodable kind of the type.
    fn kind() -> FieldKind;

    /// Mutable view used by the decoder.
    fn slot(&mut self) -> Slot<'_>;
}

/// Mutable view of one field.
pub enum Slot<'a> {
    /// A scalar leaf.
    Scalar(&'a mut dyn ScalarSlot),
    /// A nested structure.
    Struct(&'a mut dyn DynConfig),
    /// A sequence.
    Sequence(&'a mut dyn SequenceSlot),
    /// Nothing the engine may touch (excluded, unsupported or read-only).
    Opaque,
}

impl std::fmt::Debug for Slot<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Scalar(_) => "Scalar",
            Self::Struct(_) => "Struct",
            Self::Sequence(_) => "Sequence",
            Self::Opaque => "Opaque",
        };
        f.write_str(name)
    }
}

/// Assignment interface of a scalar field.
pub trait ScalarSlot {
    /// Assigns from an input value. Fails, leaving the field unchanged, when
    /// the value's kind does not match.
    fn assign(&mut self, value: &Value) -> Result<(), String>;

    /// Assigns from a default literal.
    fn assign_literal(&mut self, literal: &str) -> Result<(), String>;
}

/// Rebuild interface of a sequence field.
pub trait SequenceSlot {
    /// Removes every element.
    fn clear(&mut self);

    /// Appends a zero-valued element and returns its slot.
    fn push_default(&mut self) -> Slot<'_>;

    /// Removes the last element.
    fn pop(&mut self);
}

/// A primitive that converts from scalar values and default literals.
pub trait Scalar: Sized {
    /// Native kind.
    const KIND: ScalarKind;

    /// Converts an input value. Only matching kinds convert, except that
    /// integers widen into floats.
    fn from_value(value: &Value) -> Result<Self, String>;

    /// Parses a default literal.
    fn from_literal(literal: &str) -> Result<Self, String>;
}

impl<T: Scalar> ScalarSlot for T {
    fn assign(&mut self, value: &Value) -> Result<(), String> {
        *self = T::from_value(value)?;
        Ok(())
    }

    fn assign_literal(&mut self, literal: &str) -> Result<(), String> {
        *self = T::from_literal(literal)?;
        Ok(())
    }
}

fn kind_mismatch(expected: ScalarKind, found: &Value) -> String {
    format!("expected {expected}, found {}", found.kind())
}

macro_rules! scalar_field {
    ($($ty:ty),* $(,)?) => {$(
        impl Field for $ty {
            fn kind() -> FieldKind {
                FieldKind::Scalar(<$ty as Scalar>::KIND)
            }

            fn slot(&mut self) -> Slot<'_> {
                Slot::Scalar(self)
            }
        }
    )*};
}

macro_rules! integer_scalar {
    ($($ty:ty => $kind:ident),* $(,)?) => {$(
        impl Scalar for $ty {
            const KIND: ScalarKind = ScalarKind::$kind;

            fn from_value(value: &Value) -> Result<Self, String> {
                match value {
                    Value::Int(i) => <$ty>::try_from(*i)
                        .map_err(|_| format!("integer {i} is out of range for {}", Self::KIND)),
                    Value::UInt(u) => <$ty>::try_from(*u)
                        .map_err(|_| format!("integer {u} is out of range for {}", Self::KIND)),
                    other => Err(kind_mismatch(Self::KIND, other)),
                }
            }

            fn from_literal(literal: &str) -> Result<Self, String> {
                parse_number_literal(literal, Self::KIND)
            }
        }

        scalar_field!($ty);
    )*};
}

macro_rules! float_scalar {
    ($($ty:ty => $kind:ident),* $(,)?) => {$(
        impl Scalar for $ty {
            const KIND: ScalarKind = ScalarKind::$kind;

            fn from_value(value: &Value) -> Result<Self, String> {
                match value {
                    Value::Float(f) => Ok(*f as $ty),
                    Value::Int(i) => Ok(*i as $ty),
                    Value::UInt(u) => Ok(*u as $ty),
                    other => Err(kind_mismatch(Self::KIND, other)),
                }
            }

            fn from_literal(literal: &str) -> Result<Self, String> {
                parse_number_literal(literal, Self::KIND)
            }
        }

        scalar_field!($ty);
    )*};
}

integer_scalar! {
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    isize => Isize,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    usize => Usize,
}

float_scalar! {
    f32 => F32,
    f64 => F64,
}

impl Scalar for bool {
    const KIND: ScalarKind = ScalarKind::Bool;

    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Bool(b) => Ok(*b),
            other => Err(kind_mismatch(Self::KIND, other)),
        }
    }

    fn from_literal(literal: &str) -> Result<Self, String> {
        parse_bool_literal(literal)
    }
}

impl Scalar for String {
    const KIND: ScalarKind = ScalarKind::String;

    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::String(s) => Ok(s.clone()),
            other => Err(kind_mismatch(Self::KIND, other)),
        }
    }

    fn from_literal(literal: &str) -> Result<Self, String> {
        Ok(literal.to_owned())
    }
}

scalar_field!(bool, String);

impl<T: Field + Default> Field for Vec<T> {
    const SETTABLE: bool = T::SETTABLE;

    fn kind() -> FieldKind {
        FieldKind::Sequence(Box::new(T::kind()))
    }

    fn slot(&mut self) -> Slot<'_> {
        Slot::Sequence(self)
    }
}

impl<T: Field + Default> SequenceSlot for Vec<T> {
    fn clear(&mut self) {
        Vec::clear(self);
    }

    fn push_default(&mut self) -> Slot<'_> {
        self.push(T::default());
        match self.last_mut() {
            Some(item) => item.slot(),
            None => Slot::Opaque,
        }
    }

    fn pop(&mut self) {
        Vec::pop(self);
    }
}

impl<T> Field for Option<T> {
    fn kind() -> FieldKind {
        FieldKind::Unsupported(std::any::type_name::<Self>())
    }

    fn slot(&mut self) -> Slot<'_> {
        Slot::Opaque
    }
}

impl<K, V, S> Field for HashMap<K, V, S> {
    fn kind() -> FieldKind {
        FieldKind::Unsupported(std::any::type_name::<Self>())
    }

    fn slot(&mut self) -> Slot<'_> {
        Slot::Opaque
    }
}

impl<K, V> Field for BTreeMap<K, V> {
    fn kind() -> FieldKind {
        FieldKind::Unsupported(std::any::type_name::<Self>())
    }

    fn slot(&mut self) -> Slot<'_> {
        Slot::Opaque
    }
}

// Shared immutable storage cannot be assigned in place.
impl Field for &'static str {
    const SETTABLE: bool = false;

    fn kind() -> FieldKind {
        FieldKind::Scalar(ScalarKind::String)
    }

    fn slot(&mut self) -> Slot<'_> {
        Slot::Opaque
    }
}

impl<T: Field> Field for Arc<T> {
    const SETTABLE: bool = false;

    fn kind() -> FieldKind {
        T::kind()
    }

    fn slot(&mut self) -> Slot<'_> {
        Slot::Opaque
    }
}
