//! Arena-specific error types.

use std::error::Error;
use std::fmt;

/// Errors that can occur during arena operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArenaError {
    /// The system allocator failed, or the arena's byte limit would be
    /// exceeded.
    OutOfMemory {
        /// Number of bytes requested.
        requested: usize,
        /// The configured byte limit, if the arena is bounded.
        limit: Option<usize>,
    },
    /// The handle names an arena that is not part of this arena's fused
    /// group (it was never fused, or it has been dropped).
    Unreachable {
        /// Raw id of the arena named by the handle.
        arena: u32,
    },
    /// The handle, or an access through it, falls outside allocated memory.
    OutOfBounds {
        /// Block index named by the handle.
        block: u32,
        /// Start of the attempted access within the block.
        offset: usize,
        /// Length of the attempted access.
        len: usize,
    },
    /// A null handle was dereferenced.
    NullRef,
    /// The configuration failed validation.
    InvalidConfig {
        /// Human-readable description of the problem.
        reason: String,
    },
}

impl fmt::Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory { requested, limit } => {
                write!(f, "arena out of memory: requested {requested} bytes")?;
                if let Some(limit) = limit {
                    write!(f, " (limit {limit} bytes)")?;
                }
                Ok(())
            }
            Self::Unreachable { arena } => {
                write!(f, "arena {arena} is not reachable from this arena")
            }
            Self::OutOfBounds { block, offset, len } => {
                write!(
                    f,
                    "access out of bounds: block {block}, offset {offset}, len {len}"
                )
            }
            Self::NullRef => write!(f, "null arena reference"),
            Self::InvalidConfig { reason } => write!(f, "invalid arena config: {reason}"),
        }
    }
}

impl Error for ArenaError {}
