//! Wire types and tags of the protocol-buffer binary format.

use std::fmt;

use crate::is_valid_field_number;

/// The low three bits of a tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WireType {
    /// Base-128 varint.
    Varint = 0,
    /// Eight little-endian bytes.
    Fixed64 = 1,
    /// Varint length followed by that many bytes.
    Delimited = 2,
    /// Start of a group (only carried inside unknown data).
    StartGroup = 3,
    /// End of a group (only carried inside unknown data).
    EndGroup = 4,
    /// Four little-endian bytes.
    Fixed32 = 5,
}

impl WireType {
    /// Decode the low three bits of a tag.
    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            0 => Some(Self::Varint),
            1 => Some(Self::Fixed64),
            2 => Some(Self::Delimited),
            3 => Some(Self::StartGroup),
            4 => Some(Self::EndGroup),
            5 => Some(Self::Fixed32),
            _ => None,
        }
    }

    /// The three-bit wire representation.
    pub fn bits(self) -> u32 {
        self as u32
    }
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Varint => "varint",
            Self::Fixed64 => "fixed64",
            Self::Delimited => "delimited",
            Self::StartGroup => "start-group",
            Self::EndGroup => "end-group",
            Self::Fixed32 => "fixed32",
        };
        f.write_str(name)
    }
}

/// A decoded field tag: `(field_number << 3) | wire_type`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Tag {
    /// Field number, `1..=MAX_FIELD_NUMBER`.
    pub number: u32,
    /// Wire type of the value that follows.
    pub wire_type: WireType,
}

impl Tag {
    /// Build a tag.
    pub fn new(number: u32, wire_type: WireType) -> Self {
        Self { number, wire_type }
    }

    /// Split a raw tag value. Returns `None` for field number zero, numbers
    /// beyond the legal range, or wire types 6 and 7.
    pub fn from_raw(raw: u64) -> Option<Self> {
        if raw > u32::MAX as u64 {
            return None;
        }
        let raw = raw as u32;
        let number = raw >> 3;
        if !is_valid_field_number(number) {
            return None;
        }
        let wire_type = WireType::from_bits(raw & 7)?;
        Some(Self { number, wire_type })
    }

    /// The raw tag value as written on the wire.
    pub fn to_raw(self) -> u32 {
        (self.number << 3) | self.wire_type.bits()
    }
}
