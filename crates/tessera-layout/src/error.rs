//! Error types for layout construction and compact-layout decoding.

use std::error::Error;
use std::fmt;

use crate::table::TableId;

/// A structural violation while building, linking, or encoding a layout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LayoutError {
    /// Two fields share a number.
    DuplicateField {
        /// The colliding field number.
        number: u32,
    },
    /// A field number is zero or beyond the wire-format maximum.
    InvalidFieldNumber {
        /// The offending number.
        number: u32,
    },
    /// More fields were added than the message declared.
    TooManyFields {
        /// The declared field count.
        declared: usize,
    },
    /// `packed` was requested for a field that is not a repeated scalar.
    InvalidPacked {
        /// The offending field.
        number: u32,
    },
    /// A map field whose value type is not a message entry.
    InvalidMapField {
        /// The offending field.
        number: u32,
    },
    /// Explicit presence was requested for a repeated or map field.
    InvalidPresence {
        /// The offending field.
        number: u32,
    },
    /// A oneof names a field that has not been added.
    UnknownOneofMember {
        /// The missing field number.
        number: u32,
    },
    /// A oneof names a repeated or map field.
    RepeatedOneofMember {
        /// The offending field.
        number: u32,
    },
    /// A field was placed in two oneofs, or twice in the same one.
    DuplicateOneofMember {
        /// The offending field.
        number: u32,
    },
    /// A oneof with no members.
    EmptyOneof,
    /// The instance would be larger than the maximum representable offset.
    SizeOverflow {
        /// The computed instance size.
        size: usize,
    },
    /// A table handle does not name a table in the set.
    UnknownTable {
        /// The offending handle.
        table: TableId,
    },
    /// The parent table has no field with this number.
    FieldNotFound {
        /// The missing field number.
        number: u32,
    },
    /// The field does not hold a submessage, array of messages, or map.
    NotASubMessage {
        /// The offending field.
        number: u32,
    },
    /// A map field was linked to a table that is not a valid map entry.
    InvalidMapEntry {
        /// The map field.
        number: u32,
    },
    /// An extension with this number is already registered for the extendee.
    DuplicateExtension {
        /// Extended table.
        extendee: TableId,
        /// Extension field number.
        number: u32,
    },
    /// A compact-layout encoder call arrived out of order.
    EncoderState {
        /// What was wrong with the call sequence.
        reason: &'static str,
    },
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateField { number } => write!(f, "duplicate field number {number}"),
            Self::InvalidFieldNumber { number } => write!(f, "invalid field number {number}"),
            Self::TooManyFields { declared } => {
                write!(f, "more fields added than the declared {declared}")
            }
            Self::InvalidPacked { number } => {
                write!(f, "field {number} cannot be packed")
            }
            Self::InvalidMapField { number } => {
                write!(f, "map field {number} must have message entry type")
            }
            Self::InvalidPresence { number } => {
                write!(f, "field {number} is repeated and cannot track presence")
            }
            Self::UnknownOneofMember { number } => {
                write!(f, "oneof names field {number}, which has not been added")
            }
            Self::RepeatedOneofMember { number } => {
                write!(f, "repeated field {number} cannot be a oneof member")
            }
            Self::DuplicateOneofMember { number } => {
                write!(f, "field {number} is already a oneof member")
            }
            Self::EmptyOneof => write!(f, "oneof has no members"),
            Self::SizeOverflow { size } => {
                write!(f, "instance size {size} exceeds the maximum offset")
            }
            Self::UnknownTable { table } => write!(f, "unknown table {table}"),
            Self::FieldNotFound { number } => write!(f, "no field with number {number}"),
            Self::NotASubMessage { number } => {
                write!(f, "field {number} does not reference a sub-table")
            }
            Self::InvalidMapEntry { number } => {
                write!(f, "map field {number} linked to an invalid entry table")
            }
            Self::DuplicateExtension { extendee, number } => {
                write!(f, "extension {number} already registered for table {extendee}")
            }
            Self::EncoderState { reason } => write!(f, "layout encoder misuse: {reason}"),
        }
    }
}

impl Error for LayoutError {}

/// What went wrong while decoding a compact layout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MalformedKind {
    /// The input ended in the middle of a value or table.
    UnexpectedEnd,
    /// A byte outside the layout alphabet.
    InvalidByte {
        /// The offending byte.
        byte: u8,
    },
    /// A number needs more than 32 bits.
    NumberOverflow,
    /// A number carries a redundant high zero digit.
    NonCanonicalNumber,
    /// Bytes remain after a complete table.
    TrailingBytes,
    /// A table did not start with the table marker.
    MissingTableMarker,
    /// Alignment is not 1, 2, 4, or 8.
    InvalidAlignment {
        /// The declared log2 alignment.
        log2: u32,
    },
    /// Declared size disagrees with the extent of the laid-out slots.
    SizeMismatch {
        /// Size in the header.
        declared: u32,
        /// Size implied by the slots and alignment.
        expected: usize,
    },
    /// A header or field value is out of its representable range.
    ValueOutOfRange,
    /// Unknown type code.
    InvalidFieldType {
        /// The offending code.
        code: u32,
    },
    /// Unknown field mode code.
    InvalidMode {
        /// The offending field.
        number: u32,
    },
    /// Field numbers not strictly ascending, or out of the legal range.
    InvalidFieldNumber {
        /// The offending number.
        number: u64,
    },
    /// A slot extends beyond the declared size.
    OffsetOutOfRange {
        /// The offending field, or zero for a case slot.
        number: u32,
    },
    /// A slot is not aligned for its type.
    MisalignedOffset {
        /// The offending field, or zero for a case slot.
        number: u32,
    },
    /// Two slots overlap and are not alternatives of the same oneof.
    OverlappingSlots {
        /// Start of the first slot.
        first: u32,
        /// Start of the second slot.
        second: u32,
    },
    /// A presence bit is outside the declared words or used twice.
    InvalidHasbit {
        /// The offending field.
        number: u32,
    },
    /// A oneof index is outside the declared count.
    InvalidOneofIndex {
        /// The offending field.
        number: u32,
    },
    /// A declared oneof has no members.
    EmptyOneof {
        /// The oneof index.
        index: u32,
    },
    /// Presence or packing that the field's mode does not allow.
    InvalidFieldShape {
        /// The offending field.
        number: u32,
    },
    /// File-form nesting deeper than the limit.
    NestingTooDeep {
        /// The configured limit.
        limit: usize,
    },
    /// Unmatched nesting bracket.
    UnbalancedNesting,
}

impl fmt::Display for MalformedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEnd => write!(f, "unexpected end of input"),
            Self::InvalidByte { byte } => write!(f, "invalid byte 0x{byte:02x}"),
            Self::NumberOverflow => write!(f, "number overflows 32 bits"),
            Self::NonCanonicalNumber => write!(f, "non-canonical number encoding"),
            Self::TrailingBytes => write!(f, "trailing bytes after table"),
            Self::MissingTableMarker => write!(f, "missing table marker"),
            Self::InvalidAlignment { log2 } => write!(f, "invalid alignment 2^{log2}"),
            Self::SizeMismatch { declared, expected } => {
                write!(f, "declared size {declared}, slots imply {expected}")
            }
            Self::ValueOutOfRange => write!(f, "value out of range"),
            Self::InvalidFieldType { code } => write!(f, "invalid field type code {code}"),
            Self::InvalidMode { number } => write!(f, "invalid mode for field {number}"),
            Self::InvalidFieldNumber { number } => write!(f, "invalid field number {number}"),
            Self::OffsetOutOfRange { number } => {
                write!(f, "slot of field {number} extends beyond the instance")
            }
            Self::MisalignedOffset { number } => {
                write!(f, "slot of field {number} is misaligned")
            }
            Self::OverlappingSlots { first, second } => {
                write!(f, "slots at offsets {first} and {second} overlap")
            }
            Self::InvalidHasbit { number } => {
                write!(f, "invalid presence bit for field {number}")
            }
            Self::InvalidOneofIndex { number } => {
                write!(f, "invalid oneof index for field {number}")
            }
            Self::EmptyOneof { index } => write!(f, "oneof {index} has no members"),
            Self::InvalidFieldShape { number } => {
                write!(f, "field {number} has presence or packing its mode forbids")
            }
            Self::NestingTooDeep { limit } => {
                write!(f, "nesting deeper than {limit}")
            }
            Self::UnbalancedNesting => write!(f, "unbalanced nesting brackets"),
        }
    }
}

/// A compact layout failed to decode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MalformedLayout {
    /// Byte offset in the input where the problem was detected.
    pub offset: usize,
    /// What was wrong.
    pub kind: MalformedKind,
}

impl MalformedLayout {
    pub(crate) fn new(offset: usize, kind: MalformedKind) -> Self {
        Self { offset, kind }
    }
}

impl fmt::Display for MalformedLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed layout at byte {}: {}", self.offset, self.kind)
    }
}

impl Error for MalformedLayout {}
