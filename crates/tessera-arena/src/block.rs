//! Contiguous memory blocks and growable block lists.
//!
//! A [`Block`] is a zero-initialised `Box<[u8]>` with bump allocation.
//! A [`BlockList`] is the set of blocks owned by one arena; it appends a new,
//! geometrically larger block when the current one is exhausted.

use tessera_core::align_up;

use crate::error::ArenaError;

/// A single contiguous block with bump allocation.
///
/// Blocks are never freed or moved while their arena group is alive, which
/// is what makes `(block, offset)` pairs stable for the life of the group.
pub struct Block {
    /// Backing storage, zeroed at creation.
    data: Box<[u8]>,
    /// Bump pointer: next free byte.
    cursor: usize,
}

impl Block {
    /// Create a zeroed block of `capacity` bytes.
    ///
    /// Returns `OutOfMemory` if the system allocator refuses the request.
    pub fn new(capacity: usize) -> Result<Self, ArenaError> {
        let mut data = Vec::new();
        data.try_reserve_exact(capacity)
            .map_err(|_| ArenaError::OutOfMemory {
                requested: capacity,
                limit: None,
            })?;
        data.resize(capacity, 0);
        Ok(Self {
            data: data.into_boxed_slice(),
            cursor: 0,
        })
    }

    /// Bump-allocate `size` bytes aligned to `align` within this block.
    ///
    /// Returns the offset of the allocation, or `None` if it does not fit.
    pub fn alloc(&mut self, size: usize, align: usize) -> Option<usize> {
        let start = align_up(self.cursor, align);
        let end = start.checked_add(size)?;
        if end > self.data.len() {
            return None;
        }
        self.cursor = end;
        Some(start)
    }

    /// Shared view of `[offset, offset + len)`, if in the allocated region.
    pub fn slice(&self, offset: usize, len: usize) -> Option<&[u8]> {
        let end = offset.checked_add(len)?;
        if end > self.cursor {
            return None;
        }
        Some(&self.data[offset..end])
    }

    /// Mutable view of `[offset, offset + len)`, if in the allocated region.
    pub fn slice_mut(&mut self, offset: usize, len: usize) -> Option<&mut [u8]> {
        let end = offset.checked_add(len)?;
        if end > self.cursor {
            return None;
        }
        Some(&mut self.data[offset..end])
    }

    /// Bytes handed out so far (including alignment padding).
    pub fn used(&self) -> usize {
        self.cursor
    }

    /// Total capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Remaining free bytes.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.cursor
    }
}

/// The blocks owned by one arena.
///
/// Allocation tries the newest block first; on exhaustion a new block twice
/// the size of the previous one (capped at `max_block_size`) is appended.
/// A request that would not fit even a capped block gets a dedicated block
/// of exactly its size. Space left in older blocks is not revisited.
pub struct BlockList {
    blocks: Vec<Block>,
    next_block_size: usize,
    max_block_size: usize,
    byte_limit: Option<usize>,
    allocated: usize,
}

impl BlockList {
    /// Create an empty list. No memory is allocated until the first request.
    pub fn new(initial_block_size: usize, max_block_size: usize, byte_limit: Option<usize>) -> Self {
        Self {
            blocks: Vec::new(),
            next_block_size: initial_block_size,
            max_block_size,
            byte_limit,
            allocated: 0,
        }
    }

    /// Bump-allocate `size` zeroed bytes aligned to `align`.
    ///
    /// Returns `(block_index, offset)`.
    pub fn alloc(&mut self, size: usize, align: usize) -> Result<(u32, u32), ArenaError> {
        if let Some(last) = self.blocks.last_mut() {
            if let Some(offset) = last.alloc(size, align) {
                return Ok(((self.blocks.len() - 1) as u32, offset as u32));
            }
        }

        let needed = size.checked_add(align - 1).ok_or(ArenaError::OutOfMemory {
            requested: size,
            limit: self.byte_limit,
        })?;
        let mut capacity = self.next_block_size.max(needed);
        if let Some(limit) = self.byte_limit {
            let room = limit.saturating_sub(self.allocated);
            if needed > room {
                return Err(ArenaError::OutOfMemory {
                    requested: size,
                    limit: Some(limit),
                });
            }
            capacity = capacity.min(room);
        }
        if capacity > u32::MAX as usize || self.blocks.len() >= u32::MAX as usize {
            return Err(ArenaError::OutOfMemory {
                requested: size,
                limit: self.byte_limit,
            });
        }

        let mut block = Block::new(capacity)?;
        // `capacity >= size + align - 1`, so a fresh block always fits.
        let offset = block.alloc(size, align).ok_or(ArenaError::OutOfMemory {
            requested: size,
            limit: self.byte_limit,
        })?;
        tracing::trace!(
            block = self.blocks.len(),
            capacity,
            requested = size,
            "arena block allocated"
        );
        self.allocated += capacity;
        if capacity <= self.max_block_size {
            self.next_block_size = capacity.saturating_mul(2).min(self.max_block_size);
        }
        self.blocks.push(block);
        Ok(((self.blocks.len() - 1) as u32, offset as u32))
    }

    /// Shared view of a range in one block.
    pub fn slice(&self, block: u32, offset: u32, len: usize) -> Option<&[u8]> {
        self.blocks
            .get(block as usize)?
            .slice(offset as usize, len)
    }

    /// Mutable view of a range in one block.
    pub fn slice_mut(&mut self, block: u32, offset: u32, len: usize) -> Option<&mut [u8]> {
        self.blocks
            .get_mut(block as usize)?
            .slice_mut(offset as usize, len)
    }

    /// Number of blocks allocated.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Total capacity of all blocks in bytes.
    pub fn space_allocated(&self) -> usize {
        self.allocated
    }

    /// Total bytes handed out across all blocks.
    pub fn bytes_used(&self) -> usize {
        self.blocks.iter().map(Block::used).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_alloc_returns_zeroed_data() {
        let mut block = Block::new(64).unwrap();
        let offset = block.alloc(10, 1).unwrap();
        assert_eq!(offset, 0);
        assert!(block.slice(offset, 10).unwrap().iter().all(|&b| b == 0));
    }

    #[test]
    fn block_alloc_respects_alignment() {
        let mut block = Block::new(64).unwrap();
        assert_eq!(block.alloc(3, 1), Some(0));
        assert_eq!(block.alloc(8, 8), Some(8));
        assert_eq!(block.used(), 16);
        assert_eq!(block.remaining(), 48);
    }

    #[test]
    fn block_alloc_fails_when_full() {
        let mut block = Block::new(16).unwrap();
        assert!(block.alloc(16, 1).is_some());
        assert!(block.alloc(1, 1).is_none());
    }

    #[test]
    fn block_slice_outside_allocation_is_none() {
        let mut block = Block::new(64).unwrap();
        block.alloc(8, 1).unwrap();
        assert!(block.slice(0, 8).is_some());
        assert!(block.slice(4, 8).is_none());
        assert!(block.slice(usize::MAX, 2).is_none());
    }

    #[test]
    fn list_grows_geometrically() {
        let mut list = BlockList::new(16, 64, None);
        list.alloc(16, 1).unwrap();
        let (block, offset) = list.alloc(1, 1).unwrap();
        assert_eq!((block, offset), (1, 0));
        assert_eq!(list.space_allocated(), 16 + 32);
        list.alloc(32, 1).unwrap();
        assert_eq!(list.block_count(), 3);
        assert_eq!(list.space_allocated(), 16 + 32 + 64);
    }

    #[test]
    fn oversized_request_gets_dedicated_block() {
        let mut list = BlockList::new(16, 64, None);
        let (block, offset) = list.alloc(1000, 8).unwrap();
        assert_eq!((block, offset), (0, 0));
        assert!(list.space_allocated() >= 1000);
    }

    #[test]
    fn byte_limit_is_enforced() {
        let mut list = BlockList::new(32, 1024, Some(64));
        list.alloc(32, 1).unwrap();
        list.alloc(32, 1).unwrap();
        let err = list.alloc(1, 1).unwrap_err();
        assert_eq!(
            err,
            ArenaError::OutOfMemory {
                requested: 1,
                limit: Some(64)
            }
        );
    }

    #[test]
    fn slices_round_trip() {
        let mut list = BlockList::new(64, 64, None);
        let (block, offset) = list.alloc(4, 4).unwrap();
        list.slice_mut(block, offset, 4)
            .unwrap()
            .copy_from_slice(&[1, 2, 3, 4]);
        assert_eq!(list.slice(block, offset, 4).unwrap(), &[1, 2, 3, 4]);
        assert!(list.slice(9, 0, 1).is_none());
    }
}
