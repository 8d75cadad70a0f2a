//! Error types for building the pool and for reflective access.

use std::error::Error;
use std::fmt;

use tessera_layout::{LayoutError, MalformedLayout, TableId};
use tessera_message::AccessError;

use crate::id::{FileId, MessageId};

/// Why a file could not be added or exported.
///
/// A failed add leaves the pool unchanged.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BuildError {
    /// A file with this name is already in the pool.
    DuplicateFile {
        /// File name.
        file: String,
    },
    /// A fully qualified name is already defined.
    DuplicateName {
        /// The colliding name.
        name: String,
    },
    /// Two fields of a message share a number or a name.
    DuplicateField {
        /// Message full name.
        message: String,
        /// Offending field name.
        field: String,
    },
    /// A type name did not resolve to a visible message or enum.
    UnresolvedType {
        /// Full name of the referring field.
        field: String,
        /// The name as written.
        type_name: String,
    },
    /// A type name resolved to the wrong kind of definition.
    WrongTypeKind {
        /// Full name of the referring field.
        field: String,
        /// The name as written.
        type_name: String,
    },
    /// A dependency is not in the pool.
    MissingDependency {
        /// File being added.
        file: String,
        /// The missing dependency.
        dependency: String,
    },
    /// A oneof index is out of range, names a repeated field, or a oneof
    /// has no members.
    InvalidOneof {
        /// Message full name.
        message: String,
        /// What is wrong.
        reason: &'static str,
    },
    /// A map-entry type does not have the shape `{ key = 1; value = 2; }`.
    InvalidMapEntry {
        /// Entry message full name.
        message: String,
    },
    /// An enum with no values, or a proto3 enum whose first value is not 0.
    InvalidEnum {
        /// Enum full name.
        name: String,
    },
    /// A default value that does not parse for the field's type, or a
    /// default in a file that does not allow them.
    InvalidDefault {
        /// Full name of the field.
        field: String,
        /// The default text.
        value: String,
    },
    /// An extension whose extendee is not a message, or whose number is
    /// already a field of the extendee.
    InvalidExtension {
        /// Full name of the extension.
        field: String,
        /// What is wrong.
        reason: &'static str,
    },
    /// A supplied layout does not describe the schema.
    LayoutMismatch {
        /// Message full name, or the file name for structural mismatches.
        message: String,
        /// What is wrong.
        reason: &'static str,
    },
    /// Building or linking a mini-table failed.
    Layout {
        /// Message full name.
        message: String,
        /// Underlying layout error.
        error: LayoutError,
    },
    /// A supplied layout could not be decoded.
    Malformed(MalformedLayout),
    /// Loading a file's dependencies led back to the file itself.
    CyclicDependency {
        /// A file on the cycle.
        file: String,
    },
    /// An initializer's descriptor names a different file than the
    /// initializer.
    InitNameMismatch {
        /// Initializer name.
        expected: String,
        /// Descriptor name.
        actual: String,
    },
    /// A file id that is not in this pool.
    UnknownFile {
        /// The id.
        file: FileId,
    },
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateFile { file } => write!(f, "file '{file}' already added"),
            Self::DuplicateName { name } => write!(f, "duplicate name '{name}'"),
            Self::DuplicateField { message, field } => {
                write!(f, "duplicate field '{field}' in '{message}'")
            }
            Self::UnresolvedType { field, type_name } => {
                write!(f, "field '{field}': couldn't resolve type '{type_name}'")
            }
            Self::WrongTypeKind { field, type_name } => {
                write!(f, "field '{field}': '{type_name}' is the wrong kind of type")
            }
            Self::MissingDependency { file, dependency } => {
                write!(f, "file '{file}' depends on '{dependency}', which is not loaded")
            }
            Self::InvalidOneof { message, reason } => write!(f, "'{message}': {reason}"),
            Self::InvalidMapEntry { message } => write!(f, "'{message}' is not a valid map entry"),
            Self::InvalidEnum { name } => write!(f, "invalid enum '{name}'"),
            Self::InvalidDefault { field, value } => {
                write!(f, "field '{field}': invalid default '{value}'")
            }
            Self::InvalidExtension { field, reason } => {
                write!(f, "extension '{field}': {reason}")
            }
            Self::LayoutMismatch { message, reason } => {
                write!(f, "layout mismatch for '{message}': {reason}")
            }
            Self::Layout { message, error } => write!(f, "layout of '{message}': {error}"),
            Self::Malformed(e) => write!(f, "malformed layout: {e}"),
            Self::CyclicDependency { file } => write!(f, "dependency cycle through '{file}'"),
            Self::InitNameMismatch { expected, actual } => {
                write!(f, "initializer '{expected}' carries descriptor '{actual}'")
            }
            Self::UnknownFile { file } => write!(f, "no file {file} in this pool"),
        }
    }
}

impl Error for BuildError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Layout { error, .. } => Some(error),
            Self::Malformed(e) => Some(e),
            _ => None,
        }
    }
}

impl From<MalformedLayout> for BuildError {
    fn from(e: MalformedLayout) -> Self {
        Self::Malformed(e)
    }
}

/// Errors from reflective access through a [`DynamicMessage`](crate::DynamicMessage).
#[derive(Clone, Debug, PartialEq)]
pub enum ReflectError {
    /// The field def belongs to a different message type.
    WrongMessage {
        /// Field full name.
        field: String,
        /// Message full name.
        message: String,
    },
    /// A regular field was passed where an extension was expected, or the
    /// reverse.
    NotAnExtension {
        /// Field full name.
        field: String,
    },
    /// A message id that is not in the pool.
    UnknownMessage {
        /// The id.
        message: MessageId,
    },
    /// A message's table is not one this pool built.
    UnknownTable {
        /// The table.
        table: TableId,
    },
    /// The underlying accessor failed.
    Access(AccessError),
}

impl fmt::Display for ReflectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WrongMessage { field, message } => {
                write!(f, "field '{field}' does not belong to '{message}'")
            }
            Self::NotAnExtension { field } => write!(f, "field/extension role mismatch for '{field}'"),
            Self::UnknownMessage { message } => write!(f, "no message {message} in this pool"),
            Self::UnknownTable { table } => write!(f, "table {table} has no message def"),
            Self::Access(e) => write!(f, "{e}"),
        }
    }
}

impl Error for ReflectError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Access(e) => Some(e),
            _ => None,
        }
    }
}

impl From<AccessError> for ReflectError {
    fn from(e: AccessError) -> Self {
        Self::Access(e)
    }
}
