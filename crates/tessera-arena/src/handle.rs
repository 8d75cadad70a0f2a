//! Arena identities and the fixed-width reference records stored in messages.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

/// Counter for unique [`ArenaId`] allocation. Zero is reserved for null.
static ARENA_COUNTER: AtomicU32 = AtomicU32::new(1);

/// Unique per-instance identifier for an [`Arena`](crate::Arena).
///
/// Allocated from a monotonic atomic counter. Two arenas alive in the same
/// process never share an id, so a reference can always name its owner
/// unambiguously even after fusing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArenaId(u32);

impl ArenaId {
    /// Allocate a fresh, unique arena id. Thread-safe.
    pub fn next() -> Self {
        loop {
            let raw = ARENA_COUNTER.fetch_add(1, Ordering::Relaxed);
            if raw != 0 {
                return Self(raw);
            }
        }
    }

    pub(crate) fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw id as stored in an [`ArenaRef`].
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ArenaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A reference to a byte range allocated from an arena.
///
/// Stored inside message instances as a 16-byte little-endian record
/// `[arena u32][block u32][offset u32][len u32]`. The all-zero record is
/// [`ArenaRef::NULL`], the "not set" sentinel for indirect slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ArenaRef {
    /// Raw id of the arena that allocated the range.
    pub arena: u32,
    /// Block index within that arena.
    pub block: u32,
    /// Start of the range within the block.
    pub offset: u32,
    /// Length of the range in bytes.
    pub len: u32,
}

impl ArenaRef {
    /// Size of the encoded record.
    pub const SIZE: usize = 16;

    /// The null reference.
    pub const NULL: ArenaRef = ArenaRef {
        arena: 0,
        block: 0,
        offset: 0,
        len: 0,
    };

    /// Returns `true` for the null reference.
    pub fn is_null(&self) -> bool {
        self.arena == 0
    }

    /// The owning arena's id, or `None` for the null reference.
    pub fn arena_id(&self) -> Option<ArenaId> {
        (!self.is_null()).then_some(ArenaId(self.arena))
    }

    /// Length of the referenced range.
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Returns `true` if the referenced range is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// A sub-range `[at, at + len)` of this reference.
    ///
    /// Returns `None` if the sub-range does not fit.
    pub fn narrow(&self, at: usize, len: usize) -> Option<ArenaRef> {
        let end = at.checked_add(len)?;
        if self.is_null() || end > self.len() {
            return None;
        }
        Some(ArenaRef {
            arena: self.arena,
            block: self.block,
            offset: self.offset.checked_add(at as u32)?,
            len: len as u32,
        })
    }

    /// Encode as the 16-byte slot record.
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out[0..4].copy_from_slice(&self.arena.to_le_bytes());
        out[4..8].copy_from_slice(&self.block.to_le_bytes());
        out[8..12].copy_from_slice(&self.offset.to_le_bytes());
        out[12..16].copy_from_slice(&self.len.to_le_bytes());
        out
    }

    /// Decode a 16-byte slot record.
    pub fn from_bytes(bytes: &[u8; Self::SIZE]) -> Self {
        let word = |i: usize| u32::from_le_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]);
        Self {
            arena: word(0),
            block: word(4),
            offset: word(8),
            len: word(12),
        }
    }
}

impl Default for ArenaRef {
    fn default() -> Self {
        Self::NULL
    }
}

impl fmt::Display for ArenaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            return f.write_str("null");
        }
        write!(
            f,
            "arena {}:{}+{}[{}]",
            self.arena, self.block, self.offset, self.len
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_non_zero() {
        let a = ArenaId::next();
        let b = ArenaId::next();
        assert_ne!(a, b);
        assert_ne!(a.raw(), 0);
        assert_ne!(b.raw(), 0);
    }

    #[test]
    fn null_is_all_zero() {
        assert_eq!(ArenaRef::NULL.to_bytes(), [0u8; 16]);
        assert!(ArenaRef::from_bytes(&[0u8; 16]).is_null());
        assert_eq!(ArenaRef::NULL.arena_id(), None);
    }

    #[test]
    fn narrow_stays_inside_range() {
        let r = ArenaRef {
            arena: 3,
            block: 1,
            offset: 16,
            len: 32,
        };
        let sub = r.narrow(8, 8).unwrap();
        assert_eq!(sub.offset, 24);
        assert_eq!(sub.len, 8);
        assert!(r.narrow(30, 4).is_none());
        assert!(r.narrow(usize::MAX, 2).is_none());
        assert!(ArenaRef::NULL.narrow(0, 0).is_none());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn record_round_trip(arena in any::<u32>(), block in any::<u32>(), offset in any::<u32>(), len in any::<u32>()) {
                let r = ArenaRef { arena, block, offset, len };
                prop_assert_eq!(ArenaRef::from_bytes(&r.to_bytes()), r);
            }
        }
    }
}
