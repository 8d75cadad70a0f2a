//! Field values as a closed sum type.

use std::fmt;

use tessera_core::{FieldMode, FieldType};

use crate::error::AccessError;
use crate::ptr::{ArrayPtr, MapPtr, MessagePtr};

/// A single field value.
///
/// Aggregates (submessages, repeated fields, maps) are returned as
/// references into the arena; `None` is the "not set" sentinel and never
/// allocates.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// `bool`.
    Bool(bool),
    /// `int32`, `sint32`, `sfixed32`.
    Int32(i32),
    /// `int64`, `sint64`, `sfixed64`.
    Int64(i64),
    /// `uint32`, `fixed32`.
    UInt32(u32),
    /// `uint64`, `fixed64`.
    UInt64(u64),
    /// `float`.
    Float(f32),
    /// `double`.
    Double(f64),
    /// Enum number (open enum semantics).
    Enum(i32),
    /// UTF-8 text.
    String(String),
    /// Arbitrary bytes.
    Bytes(Vec<u8>),
    /// Submessage.
    Message(Option<MessagePtr>),
    /// Repeated field.
    Array(Option<ArrayPtr>),
    /// Map field.
    Map(Option<MapPtr>),
}

impl Value {
    /// The zero value of a singular field of type `ty`.
    pub fn default_for(ty: FieldType) -> Value {
        match ty {
            FieldType::Bool => Value::Bool(false),
            FieldType::Int32 | FieldType::SInt32 | FieldType::SFixed32 => Value::Int32(0),
            FieldType::Int64 | FieldType::SInt64 | FieldType::SFixed64 => Value::Int64(0),
            FieldType::UInt32 | FieldType::Fixed32 => Value::UInt32(0),
            FieldType::UInt64 | FieldType::Fixed64 => Value::UInt64(0),
            FieldType::Float => Value::Float(0.0),
            FieldType::Double => Value::Double(0.0),
            FieldType::Enum => Value::Enum(0),
            FieldType::String => Value::String(String::new()),
            FieldType::Bytes => Value::Bytes(Vec::new()),
            FieldType::Message => Value::Message(None),
        }
    }

    /// The "unset" value of a field of this type and mode.
    pub fn default_for_field(ty: FieldType, mode: FieldMode) -> Value {
        match mode {
            FieldMode::Scalar => Self::default_for(ty),
            FieldMode::Array => Value::Array(None),
            FieldMode::Map => Value::Map(None),
        }
    }

    /// Convert into the representation used for a singular `ty` slot.
    ///
    /// Accepts the exact variant, plus `Int32` for enums, and `String` and
    /// `Bytes` interchangeably (bytes must be valid UTF-8 for string fields).
    pub(crate) fn coerce(self, ty: FieldType, number: u32) -> Result<Value, AccessError> {
        let mismatch = || AccessError::TypeMismatch {
            number,
            field_type: ty,
            mode: FieldMode::Scalar,
        };
        Ok(match (ty, self) {
            (FieldType::Bool, v @ Value::Bool(_)) => v,
            (FieldType::Int32 | FieldType::SInt32 | FieldType::SFixed32, v @ Value::Int32(_)) => v,
            (FieldType::Int64 | FieldType::SInt64 | FieldType::SFixed64, v @ Value::Int64(_)) => v,
            (FieldType::UInt32 | FieldType::Fixed32, v @ Value::UInt32(_)) => v,
            (FieldType::UInt64 | FieldType::Fixed64, v @ Value::UInt64(_)) => v,
            (FieldType::Float, v @ Value::Float(_)) => v,
            (FieldType::Double, v @ Value::Double(_)) => v,
            (FieldType::Enum, v @ Value::Enum(_)) => v,
            (FieldType::Enum, Value::Int32(n)) => Value::Enum(n),
            (FieldType::String, v @ Value::String(_)) => v,
            (FieldType::String, Value::Bytes(b)) => {
                Value::String(String::from_utf8(b).map_err(|_| AccessError::InvalidUtf8 { number })?)
            }
            (FieldType::Bytes, v @ Value::Bytes(_)) => v,
            (FieldType::Bytes, Value::String(s)) => Value::Bytes(s.into_bytes()),
            (FieldType::Message, v @ Value::Message(_)) => v,
            _ => return Err(mismatch()),
        })
    }

    /// Returns `true` for the zero value of its type and for unset aggregates.
    pub fn is_default(&self) -> bool {
        match self {
            Value::Bool(b) => !b,
            Value::Int32(n) | Value::Enum(n) => *n == 0,
            Value::Int64(n) => *n == 0,
            Value::UInt32(n) => *n == 0,
            Value::UInt64(n) => *n == 0,
            Value::Float(x) => x.to_bits() == 0,
            Value::Double(x) => x.to_bits() == 0,
            Value::String(s) => s.is_empty(),
            Value::Bytes(b) => b.is_empty(),
            Value::Message(p) => p.is_none(),
            Value::Array(p) => p.is_none(),
            Value::Map(p) => p.is_none(),
        }
    }

    /// The submessage reference, if this is a set message value.
    pub fn as_message(&self) -> Option<MessagePtr> {
        match self {
            Value::Message(p) => *p,
            _ => None,
        }
    }

    /// The text, if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// The signed 64-bit view of any integer value.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Int32(n) | Value::Enum(n) => Some(n as i64),
            Value::Int64(n) => Some(n),
            Value::UInt32(n) => Some(n as i64),
            Value::UInt64(n) => Some(n as i64),
            Value::Bool(b) => Some(b as i64),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int32(n) | Value::Enum(n) => write!(f, "{n}"),
            Value::Int64(n) => write!(f, "{n}"),
            Value::UInt32(n) => write!(f, "{n}"),
            Value::UInt64(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Double(x) => write!(f, "{x}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Bytes(b) => write!(f, "{} bytes", b.len()),
            Value::Message(p) => match p {
                Some(p) => write!(f, "message@{}", p.0),
                None => f.write_str("message(unset)"),
            },
            Value::Array(p) => match p {
                Some(p) => write!(f, "array@{}", p.0),
                None => f.write_str("array(unset)"),
            },
            Value::Map(p) => match p {
                Some(p) => write!(f, "map@{}", p.0),
                None => f.write_str("map(unset)"),
            },
        }
    }
}

/// A map key. All keys of one map share a variant.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MapKey {
    /// `bool` key.
    Bool(bool),
    /// `int32`, `sint32`, `sfixed32` key.
    Int32(i32),
    /// `int64`, `sint64`, `sfixed64` key.
    Int64(i64),
    /// `uint32`, `fixed32` key.
    UInt32(u32),
    /// `uint64`, `fixed64` key.
    UInt64(u64),
    /// `string` key, ordered bytewise.
    String(String),
}

impl MapKey {
    /// Convert a key field's value.
    pub fn from_value(value: Value) -> Option<MapKey> {
        Some(match value {
            Value::Bool(b) => MapKey::Bool(b),
            Value::Int32(n) => MapKey::Int32(n),
            Value::Int64(n) => MapKey::Int64(n),
            Value::UInt32(n) => MapKey::UInt32(n),
            Value::UInt64(n) => MapKey::UInt64(n),
            Value::String(s) => MapKey::String(s),
            _ => return None,
        })
    }

    /// The key as a field value.
    pub fn to_value(&self) -> Value {
        match self {
            MapKey::Bool(b) => Value::Bool(*b),
            MapKey::Int32(n) => Value::Int32(*n),
            MapKey::Int64(n) => Value::Int64(*n),
            MapKey::UInt32(n) => Value::UInt32(*n),
            MapKey::UInt64(n) => Value::UInt64(*n),
            MapKey::String(s) => Value::String(s.clone()),
        }
    }
}

impl From<&str> for MapKey {
    fn from(s: &str) -> Self {
        MapKey::String(s.to_owned())
    }
}

impl From<i32> for MapKey {
    fn from(n: i32) -> Self {
        MapKey::Int32(n)
    }
}
