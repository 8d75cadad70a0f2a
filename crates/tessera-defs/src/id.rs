//! Handles into a [`DefPool`](crate::DefPool).
//!
//! Defs live in index-addressed vectors inside the pool; recursive and
//! mutually recursive types refer to each other through these ids.

use std::fmt;

/// Identifies a file in a pool, in the order files were added.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub u32);

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for FileId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Identifies a message type in a pool.
///
/// Messages are numbered in file order, each file in declaration
/// pre-order (a message, then its nested messages, then its next sibling).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(pub u32);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for MessageId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Identifies an enum type in a pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EnumId(pub u32);

impl fmt::Display for EnumId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for EnumId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Identifies an extension field in a pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExtensionId(pub u32);

impl fmt::Display for ExtensionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ExtensionId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}
