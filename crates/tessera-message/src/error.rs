//! Errors from message field access.

use std::error::Error;
use std::fmt;

use tessera_arena::ArenaError;
use tessera_core::{FieldMode, FieldType};
use tessera_layout::TableId;

/// Errors that can occur while reading or writing message fields.
#[derive(Clone, Debug, PartialEq)]
pub enum AccessError {
    /// The message's table has no field with this number.
    NoSuchField {
        /// The requested field number.
        number: u32,
    },
    /// The supplied value does not fit the field's type or mode.
    TypeMismatch {
        /// The field being written.
        number: u32,
        /// The field's declared type.
        field_type: FieldType,
        /// The field's declared mode.
        mode: FieldMode,
    },
    /// An absent aggregate was requested without an arena to create it.
    Absent {
        /// The field being accessed.
        number: u32,
    },
    /// A reference or arena outside this message's fused arena group.
    ForeignArena,
    /// A message or map field whose sub-table was never linked.
    UnlinkedSubTable {
        /// The field being accessed.
        number: u32,
    },
    /// A table handle not present in the table set.
    UnknownTable {
        /// The offending handle.
        table: TableId,
    },
    /// A reference whose length does not match the table it is viewed with.
    LayoutMismatch {
        /// Bytes the table expects.
        expected: usize,
        /// Bytes the reference covers.
        actual: usize,
    },
    /// An array index past the end.
    IndexOutOfBounds {
        /// The requested index.
        index: usize,
        /// The array length.
        len: usize,
    },
    /// A string field holds bytes that are not valid UTF-8.
    InvalidUtf8 {
        /// The field being read.
        number: u32,
    },
    /// Recursion went deeper than the caller's limit.
    DepthExceeded {
        /// The limit that was hit.
        limit: usize,
    },
    /// An extension entry whose stored type code is not valid.
    CorruptExtension {
        /// The extension's field number.
        number: u32,
    },
    /// The underlying arena failed.
    Arena(ArenaError),
}

impl fmt::Display for AccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSuchField { number } => write!(f, "no field with number {number}"),
            Self::TypeMismatch {
                number,
                field_type,
                mode,
            } => write!(
                f,
                "value does not match field {number} ({field_type}, {mode:?})"
            ),
            Self::Absent { number } => {
                write!(f, "field {number} is absent and no arena was supplied")
            }
            Self::ForeignArena => write!(f, "reference belongs to an unfused arena"),
            Self::UnlinkedSubTable { number } => {
                write!(f, "field {number} has no linked sub-table")
            }
            Self::UnknownTable { table } => write!(f, "unknown table {table}"),
            Self::LayoutMismatch { expected, actual } => write!(
                f,
                "message reference covers {actual} bytes, table expects {expected}"
            ),
            Self::IndexOutOfBounds { index, len } => {
                write!(f, "index {index} out of bounds for length {len}")
            }
            Self::InvalidUtf8 { number } => write!(f, "field {number} is not valid UTF-8"),
            Self::DepthExceeded { limit } => write!(f, "nesting deeper than {limit}"),
            Self::CorruptExtension { number } => {
                write!(f, "extension {number} has a corrupt type code")
            }
            Self::Arena(e) => write!(f, "arena error: {e}"),
        }
    }
}

impl Error for AccessError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Arena(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ArenaError> for AccessError {
    fn from(e: ArenaError) -> Self {
        match e {
            ArenaError::Unreachable { .. } => Self::ForeignArena,
            other => Self::Arena(other),
        }
    }
}
