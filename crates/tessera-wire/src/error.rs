//! Errors from wire encoding and decoding.

use std::error::Error;
use std::fmt;

use tessera_arena::ArenaError;
use tessera_core::WireType;
use tessera_message::AccessError;

/// What went wrong at a given byte offset of a wire payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// The payload ended inside a tag, value, or length-delimited run.
    Truncated,
    /// A varint longer than ten bytes or overflowing 64 bits.
    MalformedVarint,
    /// A tag with field number zero, an out-of-range number, or wire type
    /// 6 or 7.
    InvalidTag {
        /// The raw tag value.
        raw: u64,
    },
    /// A known field arrived with a wire type its declared type cannot use.
    WireTypeMismatch {
        /// The field number.
        number: u32,
        /// The wire type the field's type expects.
        expected: WireType,
        /// The wire type on the wire.
        actual: WireType,
    },
    /// An end-group tag with no matching start-group tag.
    UnexpectedEndGroup {
        /// The end-group tag's field number.
        number: u32,
    },
    /// A string field whose bytes are not valid UTF-8.
    InvalidUtf8 {
        /// The field number.
        number: u32,
    },
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated => write!(f, "unexpected end of input"),
            Self::MalformedVarint => write!(f, "malformed varint"),
            Self::InvalidTag { raw } => write!(f, "invalid tag {raw:#x}"),
            Self::WireTypeMismatch {
                number,
                expected,
                actual,
            } => write!(
                f,
                "field {number} expects wire type {expected}, got {actual}"
            ),
            Self::UnexpectedEndGroup { number } => {
                write!(f, "unmatched end-group tag for field {number}")
            }
            Self::InvalidUtf8 { number } => write!(f, "field {number} is not valid UTF-8"),
        }
    }
}

/// Errors that can occur while decoding a wire payload into a message.
///
/// Decoding does not roll back: fields decoded before the error stay set.
#[derive(Clone, Debug, PartialEq)]
pub enum DecodeError {
    /// The payload is malformed at `offset`.
    Parse {
        /// Byte offset into the payload.
        offset: usize,
        /// What was wrong.
        kind: ParseErrorKind,
    },
    /// Submessages or groups nested deeper than the configured limit.
    DepthExceeded {
        /// The configured limit.
        limit: usize,
    },
    /// The arena could not allocate.
    OutOfMemory {
        /// Bytes requested.
        requested: usize,
    },
    /// A field access failed (foreign arena, unlinked sub-table, ...).
    Access(AccessError),
    /// The decode options are unusable.
    InvalidOptions {
        /// Which constraint was violated.
        reason: &'static str,
    },
}

impl DecodeError {
    pub(crate) fn parse(offset: usize, kind: ParseErrorKind) -> Self {
        Self::Parse { offset, kind }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse { offset, kind } => write!(f, "parse error at byte {offset}: {kind}"),
            Self::DepthExceeded { limit } => write!(f, "message nesting exceeds {limit}"),
            Self::OutOfMemory { requested } => {
                write!(f, "arena out of memory allocating {requested} bytes")
            }
            Self::Access(e) => write!(f, "field access failed: {e}"),
            Self::InvalidOptions { reason } => write!(f, "invalid decode options: {reason}"),
        }
    }
}

impl Error for DecodeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Access(e) => Some(e),
            _ => None,
        }
    }
}

impl From<AccessError> for DecodeError {
    fn from(e: AccessError) -> Self {
        match e {
            AccessError::Arena(ArenaError::OutOfMemory { requested, .. }) => {
                Self::OutOfMemory { requested }
            }
            AccessError::DepthExceeded { limit } => Self::DepthExceeded { limit },
            other => Self::Access(other),
        }
    }
}

/// Errors that can occur while encoding a message.
#[derive(Clone, Debug, PartialEq)]
pub enum EncodeError {
    /// Submessages nested deeper than the configured limit.
    DepthExceeded {
        /// The configured limit.
        limit: usize,
    },
    /// A field could not be read.
    Access(AccessError),
    /// The encode options are unusable.
    InvalidOptions {
        /// Which constraint was violated.
        reason: &'static str,
    },
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DepthExceeded { limit } => write!(f, "message nesting exceeds {limit}"),
            Self::Access(e) => write!(f, "field access failed: {e}"),
            Self::InvalidOptions { reason } => write!(f, "invalid encode options: {reason}"),
        }
    }
}

impl Error for EncodeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Access(e) => Some(e),
            _ => None,
        }
    }
}

impl From<AccessError> for EncodeError {
    fn from(e: AccessError) -> Self {
        match e {
            AccessError::DepthExceeded { limit } => Self::DepthExceeded { limit },
            other => Self::Access(other),
        }
    }
}
