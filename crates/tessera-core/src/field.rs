//! Field value types and storage modes.

use std::fmt;

use crate::wire::WireType;
use crate::{REF_SLOT_ALIGN, REF_SLOT_SIZE};

/// The value type of a field.
///
/// The numeric codes match the type numbers of the protocol-buffer
/// descriptor format. Groups (code 10) are not a supported field type; group
/// encoded data is only ever carried as unknown bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum FieldType {
    /// 64-bit IEEE float, fixed-width on the wire.
    Double = 1,
    /// 32-bit IEEE float, fixed-width on the wire.
    Float = 2,
    /// Signed 64-bit integer, plain varint.
    Int64 = 3,
    /// Unsigned 64-bit integer, varint.
    UInt64 = 4,
    /// Signed 32-bit integer, plain varint (negatives take ten bytes).
    Int32 = 5,
    /// Unsigned 64-bit integer, fixed-width.
    Fixed64 = 6,
    /// Unsigned 32-bit integer, fixed-width.
    Fixed32 = 7,
    /// Boolean, varint.
    Bool = 8,
    /// UTF-8 text, length-delimited and validated.
    String = 9,
    /// Embedded message, length-delimited.
    Message = 11,
    /// Arbitrary bytes, length-delimited.
    Bytes = 12,
    /// Unsigned 32-bit integer, varint.
    UInt32 = 13,
    /// Enum number, varint (open enum semantics).
    Enum = 14,
    /// Signed 32-bit integer, fixed-width.
    SFixed32 = 15,
    /// Signed 64-bit integer, fixed-width.
    SFixed64 = 16,
    /// Signed 32-bit integer, zig-zag varint.
    SInt32 = 17,
    /// Signed 64-bit integer, zig-zag varint.
    SInt64 = 18,
}

impl FieldType {
    /// Every supported type, in code order.
    pub const ALL: [FieldType; 17] = [
        Self::Double,
        Self::Float,
        Self::Int64,
        Self::UInt64,
        Self::Int32,
        Self::Fixed64,
        Self::Fixed32,
        Self::Bool,
        Self::String,
        Self::Message,
        Self::Bytes,
        Self::UInt32,
        Self::Enum,
        Self::SFixed32,
        Self::SFixed64,
        Self::SInt32,
        Self::SInt64,
    ];

    /// Decode a type from its descriptor code.
    pub fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            1 => Self::Double,
            2 => Self::Float,
            3 => Self::Int64,
            4 => Self::UInt64,
            5 => Self::Int32,
            6 => Self::Fixed64,
            7 => Self::Fixed32,
            8 => Self::Bool,
            9 => Self::String,
            11 => Self::Message,
            12 => Self::Bytes,
            13 => Self::UInt32,
            14 => Self::Enum,
            15 => Self::SFixed32,
            16 => Self::SFixed64,
            17 => Self::SInt32,
            18 => Self::SInt64,
            _ => return None,
        })
    }

    /// The descriptor code of this type.
    pub fn code(self) -> u32 {
        self as u8 as u32
    }

    /// Wire type used for a single (unpacked) value of this type.
    pub fn wire_type(self) -> WireType {
        match self {
            Self::Double | Self::Fixed64 | Self::SFixed64 => WireType::Fixed64,
            Self::Float | Self::Fixed32 | Self::SFixed32 => WireType::Fixed32,
            Self::String | Self::Bytes | Self::Message => WireType::Delimited,
            Self::Int64
            | Self::UInt64
            | Self::Int32
            | Self::Bool
            | Self::UInt32
            | Self::Enum
            | Self::SInt32
            | Self::SInt64 => WireType::Varint,
        }
    }

    /// Bytes occupied by one value of this type inside an instance or array.
    pub fn slot_size(self) -> usize {
        match self {
            Self::Bool => 1,
            Self::Float
            | Self::Int32
            | Self::UInt32
            | Self::Fixed32
            | Self::SFixed32
            | Self::SInt32
            | Self::Enum => 4,
            Self::Double
            | Self::Int64
            | Self::UInt64
            | Self::Fixed64
            | Self::SFixed64
            | Self::SInt64 => 8,
            Self::String | Self::Bytes | Self::Message => REF_SLOT_SIZE,
        }
    }

    /// Natural alignment of one value of this type.
    pub fn slot_align(self) -> usize {
        match self {
            Self::String | Self::Bytes | Self::Message => REF_SLOT_ALIGN,
            other => other.slot_size(),
        }
    }

    /// Whether repeated values of this type may use packed encoding.
    pub fn is_packable(self) -> bool {
        !matches!(self, Self::String | Self::Bytes | Self::Message)
    }

    /// Whether values of this type are stored as arena references.
    pub fn is_indirect(self) -> bool {
        matches!(self, Self::String | Self::Bytes | Self::Message)
    }

    /// Whether this type may be used as a map key.
    pub fn is_valid_map_key(self) -> bool {
        !matches!(
            self,
            Self::Double | Self::Float | Self::Bytes | Self::Message | Self::Enum
        )
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Double => "double",
            Self::Float => "float",
            Self::Int64 => "int64",
            Self::UInt64 => "uint64",
            Self::Int32 => "int32",
            Self::Fixed64 => "fixed64",
            Self::Fixed32 => "fixed32",
            Self::Bool => "bool",
            Self::String => "string",
            Self::Message => "message",
            Self::Bytes => "bytes",
            Self::UInt32 => "uint32",
            Self::Enum => "enum",
            Self::SFixed32 => "sfixed32",
            Self::SFixed64 => "sfixed64",
            Self::SInt32 => "sint32",
            Self::SInt64 => "sint64",
        };
        f.write_str(name)
    }
}

/// How a field's values are stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldMode {
    /// One value stored inline (or one reference for indirect types).
    Scalar,
    /// A repeated field, stored as a reference to an arena array.
    Array,
    /// A map field, stored as a reference to an arena array of entry messages.
    Map,
}

impl FieldMode {
    /// Decode a mode from its compact code.
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Self::Scalar),
            1 => Some(Self::Array),
            2 => Some(Self::Map),
            _ => None,
        }
    }

    /// Compact code of this mode.
    pub fn code(self) -> u32 {
        match self {
            Self::Scalar => 0,
            Self::Array => 1,
            Self::Map => 2,
        }
    }

    /// Whether the field holds a variable number of values.
    pub fn is_repeated(self) -> bool {
        !matches!(self, Self::Scalar)
    }
}

/// Storage size of a field slot given its type and mode.
pub fn slot_size(field_type: FieldType, mode: FieldMode) -> usize {
    match mode {
        FieldMode::Scalar => field_type.slot_size(),
        FieldMode::Array | FieldMode::Map => REF_SLOT_SIZE,
    }
}

/// Storage alignment of a field slot given its type and mode.
pub fn slot_align(field_type: FieldType, mode: FieldMode) -> usize {
    match mode {
        FieldMode::Scalar => field_type.slot_align(),
        FieldMode::Array | FieldMode::Map => REF_SLOT_ALIGN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip() {
        for ty in FieldType::ALL {
            assert_eq!(FieldType::from_code(ty.code()), Some(ty));
        }
    }

    #[test]
    fn group_code_is_not_a_field_type() {
        assert_eq!(FieldType::from_code(10), None);
        assert_eq!(FieldType::from_code(0), None);
        assert_eq!(FieldType::from_code(19), None);
    }

    #[test]
    fn slot_alignment_divides_size() {
        for ty in FieldType::ALL {
            assert_eq!(ty.slot_size() % ty.slot_align(), 0, "{ty}");
        }
    }

    #[test]
    fn repeated_slots_are_references() {
        assert_eq!(slot_size(FieldType::Bool, FieldMode::Array), REF_SLOT_SIZE);
        assert_eq!(slot_size(FieldType::Int32, FieldMode::Map), REF_SLOT_SIZE);
        assert_eq!(slot_size(FieldType::Bool, FieldMode::Scalar), 1);
    }

    #[test]
    fn wire_types_follow_value_class() {
        assert_eq!(FieldType::SInt64.wire_type(), WireType::Varint);
        assert_eq!(FieldType::SFixed32.wire_type(), WireType::Fixed32);
        assert_eq!(FieldType::Double.wire_type(), WireType::Fixed64);
        assert_eq!(FieldType::Message.wire_type(), WireType::Delimited);
    }

    #[test]
    fn map_keys_exclude_floats_bytes_and_messages() {
        assert!(FieldType::String.is_valid_map_key());
        assert!(FieldType::SFixed64.is_valid_map_key());
        assert!(!FieldType::Float.is_valid_map_key());
        assert!(!FieldType::Bytes.is_valid_map_key());
        assert!(!FieldType::Message.is_valid_map_key());
    }

    #[test]
    fn mode_codes_round_trip() {
        for mode in [FieldMode::Scalar, FieldMode::Array, FieldMode::Map] {
            assert_eq!(FieldMode::from_code(mode.code()), Some(mode));
        }
        assert_eq!(FieldMode::from_code(3), None);
    }
}
