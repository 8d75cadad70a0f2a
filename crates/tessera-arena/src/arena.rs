//! The arena: per-owner bump allocation over a fusable group of block lists.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::block::BlockList;
use crate::config::ArenaConfig;
use crate::error::ArenaError;
use crate::handle::{ArenaId, ArenaRef};

/// One node of the fuse forest.
///
/// A root node owns the block lists of every arena in its group. A non-root
/// node has handed its block lists to its root and only forwards.
struct GroupNode {
    parent: Option<Rc<RefCell<GroupNode>>>,
    members: IndexMap<ArenaId, BlockList>,
}

type NodeRef = Rc<RefCell<GroupNode>>;

/// Follow parent links to the root, compressing the path on the way back.
fn find_root(node: &NodeRef) -> NodeRef {
    let mut root = Rc::clone(node);
    loop {
        let parent = root.borrow().parent.clone();
        match parent {
            Some(p) => root = p,
            None => break,
        }
    }
    let mut cur = Rc::clone(node);
    while !Rc::ptr_eq(&cur, &root) {
        let next = cur.borrow_mut().parent.replace(Rc::clone(&root));
        match next {
            Some(n) => cur = n,
            None => break,
        }
    }
    root
}

/// A bump allocator owning all dynamically sized message data.
///
/// Allocations are zero-initialised, never moved, and never freed
/// individually. Dropping the arena releases its blocks unless it has been
/// fused with another arena that is still alive, in which case the blocks
/// live until the whole group is gone.
///
/// An `Arena` is single-threaded (`!Send`, `!Sync`): allocation and access
/// take `&self` and use interior mutability. Closures passed to
/// [`with_bytes`](Arena::with_bytes) or [`with_bytes_mut`](Arena::with_bytes_mut)
/// must not call back into any arena of the same group.
pub struct Arena {
    id: ArenaId,
    config: ArenaConfig,
    node: NodeRef,
}

impl Arena {
    /// Create an unbounded arena with the default config.
    pub fn new() -> Self {
        Self::build(ArenaConfig::new())
    }

    /// Create an arena from a validated config.
    pub fn with_config(config: ArenaConfig) -> Result<Self, ArenaError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: ArenaConfig) -> Self {
        let id = ArenaId::next();
        let mut members = IndexMap::new();
        members.insert(
            id,
            BlockList::new(
                config.initial_block_size,
                config.max_block_size,
                config.byte_limit,
            ),
        );
        Self {
            id,
            config,
            node: Rc::new(RefCell::new(GroupNode {
                parent: None,
                members,
            })),
        }
    }

    /// This arena's unique id.
    pub fn id(&self) -> ArenaId {
        self.id
    }

    /// The config this arena was built with.
    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    /// Allocate `size` zeroed bytes aligned to `align` (a power of two).
    ///
    /// A zero-sized request returns an empty, non-null reference.
    pub fn alloc(&self, size: usize, align: usize) -> Result<ArenaRef, ArenaError> {
        if size > u32::MAX as usize {
            return Err(ArenaError::OutOfMemory {
                requested: size,
                limit: self.config.byte_limit,
            });
        }
        let align = align.max(1);
        if !align.is_power_of_two() {
            return Err(ArenaError::InvalidConfig {
                reason: format!("alignment {align} is not a power of two"),
            });
        }
        if size == 0 {
            return Ok(ArenaRef {
                arena: self.id.raw(),
                block: 0,
                offset: 0,
                len: 0,
            });
        }
        let root = find_root(&self.node);
        let mut root = root.borrow_mut();
        let list = root
            .members
            .get_mut(&self.id)
            .ok_or(ArenaError::Unreachable {
                arena: self.id.raw(),
            })?;
        let (block, offset) = list.alloc(size, align)?;
        Ok(ArenaRef {
            arena: self.id.raw(),
            block,
            offset,
            len: size as u32,
        })
    }

    /// Allocate a copy of `bytes`.
    pub fn alloc_copy(&self, bytes: &[u8], align: usize) -> Result<ArenaRef, ArenaError> {
        let r = self.alloc(bytes.len(), align)?;
        self.write(r, 0, bytes)?;
        Ok(r)
    }

    /// Run `f` over the bytes of `r`.
    pub fn with_bytes<R>(&self, r: ArenaRef, f: impl FnOnce(&[u8]) -> R) -> Result<R, ArenaError> {
        self.with_range(r, 0, r.len(), f)
    }

    /// Run `f` over the bytes of `r`, mutably.
    pub fn with_bytes_mut<R>(
        &self,
        r: ArenaRef,
        f: impl FnOnce(&mut [u8]) -> R,
    ) -> Result<R, ArenaError> {
        self.with_range_mut(r, 0, r.len(), f)
    }

    /// Copy `out.len()` bytes starting `at` bytes into `r`.
    pub fn read(&self, r: ArenaRef, at: usize, out: &mut [u8]) -> Result<(), ArenaError> {
        self.with_range(r, at, out.len(), |src| out.copy_from_slice(src))
    }

    /// Copy `data` into `r` starting `at` bytes in.
    pub fn write(&self, r: ArenaRef, at: usize, data: &[u8]) -> Result<(), ArenaError> {
        self.with_range_mut(r, at, data.len(), |dst| dst.copy_from_slice(data))
    }

    /// Copy the bytes of `r` into a fresh vector.
    pub fn to_vec(&self, r: ArenaRef) -> Result<Vec<u8>, ArenaError> {
        self.with_bytes(r, <[u8]>::to_vec)
    }

    fn check_range(r: ArenaRef, at: usize, len: usize) -> Result<(), ArenaError> {
        if r.is_null() {
            return Err(ArenaError::NullRef);
        }
        let end = at.checked_add(len);
        match end {
            Some(end) if end <= r.len() => Ok(()),
            _ => Err(ArenaError::OutOfBounds {
                block: r.block,
                offset: (r.offset as usize).saturating_add(at),
                len,
            }),
        }
    }

    fn with_range<R>(
        &self,
        r: ArenaRef,
        at: usize,
        len: usize,
        f: impl FnOnce(&[u8]) -> R,
    ) -> Result<R, ArenaError> {
        Self::check_range(r, at, len)?;
        let root = find_root(&self.node);
        let root = root.borrow();
        let list = root
            .members
            .get(&ArenaId::from_raw(r.arena))
            .ok_or(ArenaError::Unreachable { arena: r.arena })?;
        if len == 0 {
            return Ok(f(&[]));
        }
        let offset = r.offset.checked_add(at as u32).ok_or(ArenaError::OutOfBounds {
            block: r.block,
            offset: (r.offset as usize).saturating_add(at),
            len,
        })?;
        let bytes = list
            .slice(r.block, offset, len)
            .ok_or(ArenaError::OutOfBounds {
                block: r.block,
                offset: offset as usize,
                len,
            })?;
        Ok(f(bytes))
    }

    fn with_range_mut<R>(
        &self,
        r: ArenaRef,
        at: usize,
        len: usize,
        f: impl FnOnce(&mut [u8]) -> R,
    ) -> Result<R, ArenaError> {
        Self::check_range(r, at, len)?;
        let root = find_root(&self.node);
        let mut root = root.borrow_mut();
        let list = root
            .members
            .get_mut(&ArenaId::from_raw(r.arena))
            .ok_or(ArenaError::Unreachable { arena: r.arena })?;
        if len == 0 {
            return Ok(f(&mut []));
        }
        let offset = r.offset.checked_add(at as u32).ok_or(ArenaError::OutOfBounds {
            block: r.block,
            offset: (r.offset as usize).saturating_add(at),
            len,
        })?;
        let bytes = list
            .slice_mut(r.block, offset, len)
            .ok_or(ArenaError::OutOfBounds {
                block: r.block,
                offset: offset as usize,
                len,
            })?;
        Ok(f(bytes))
    }

    /// Fuse this arena's lifetime with `other`'s.
    ///
    /// Afterwards both arenas resolve each other's references, and every
    /// block of the group stays alive until the last arena in it is dropped.
    /// Returns `false` (and changes nothing) if either arena is bounded.
    /// Fusing arenas that are already in the same group succeeds trivially.
    pub fn fuse(&self, other: &Arena) -> bool {
        if !self.config.is_fusable() || !other.config.is_fusable() {
            tracing::debug!(
                arena = self.id.raw(),
                other = other.id.raw(),
                "fuse refused: bounded arena"
            );
            return false;
        }
        let a = find_root(&self.node);
        let b = find_root(&other.node);
        if Rc::ptr_eq(&a, &b) {
            return true;
        }
        let (big, small) = if a.borrow().members.len() >= b.borrow().members.len() {
            (a, b)
        } else {
            (b, a)
        };
        let moved = std::mem::take(&mut small.borrow_mut().members);
        let moved_count = moved.len();
        {
            let mut big = big.borrow_mut();
            big.members.extend(moved);
        }
        small.borrow_mut().parent = Some(Rc::clone(&big));
        tracing::debug!(
            arena = self.id.raw(),
            other = other.id.raw(),
            moved = moved_count,
            group_size = big.borrow().members.len(),
            "arenas fused"
        );
        true
    }

    /// Whether `self` and `other` belong to the same fused group.
    pub fn is_fused(&self, other: &Arena) -> bool {
        Rc::ptr_eq(&find_root(&self.node), &find_root(&other.node))
    }

    /// Whether `r` names an arena in this arena's group.
    ///
    /// The null reference never resolves.
    pub fn resolves(&self, r: ArenaRef) -> bool {
        match r.arena_id() {
            Some(id) => find_root(&self.node).borrow().members.contains_key(&id),
            None => false,
        }
    }

    /// Whether `id` is an arena in this arena's group.
    pub fn contains(&self, id: ArenaId) -> bool {
        find_root(&self.node).borrow().members.contains_key(&id)
    }

    /// Total block capacity owned by this arena, in bytes.
    pub fn space_allocated(&self) -> usize {
        find_root(&self.node)
            .borrow()
            .members
            .get(&self.id)
            .map_or(0, BlockList::space_allocated)
    }

    /// Bytes handed out by this arena (including alignment padding).
    pub fn bytes_used(&self) -> usize {
        find_root(&self.node)
            .borrow()
            .members
            .get(&self.id)
            .map_or(0, BlockList::bytes_used)
    }

    /// Number of arenas in this arena's fused group, including dropped ones
    /// whose blocks are kept alive by the group.
    pub fn group_size(&self) -> usize {
        find_root(&self.node).borrow().members.len()
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Arena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("id", &self.id)
            .field("space_allocated", &self.space_allocated())
            .field("group_size", &self.group_size())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_is_zeroed_and_writable() {
        let arena = Arena::new();
        let r = arena.alloc(24, 8).unwrap();
        assert_eq!(arena.to_vec(r).unwrap(), vec![0u8; 24]);
        arena.write(r, 4, &[1, 2, 3]).unwrap();
        let mut out = [0u8; 4];
        arena.read(r, 3, &mut out).unwrap();
        assert_eq!(out, [0, 1, 2, 3]);
    }

    #[test]
    fn alloc_copy_preserves_bytes() {
        let arena = Arena::new();
        let r = arena.alloc_copy(b"hello", 1).unwrap();
        assert_eq!(arena.to_vec(r).unwrap(), b"hello");
        assert_eq!(r.len(), 5);
    }

    #[test]
    fn zero_sized_alloc_is_empty_but_not_null() {
        let arena = Arena::new();
        let r = arena.alloc(0, 8).unwrap();
        assert!(!r.is_null());
        assert!(r.is_empty());
        assert_eq!(arena.to_vec(r).unwrap(), Vec::<u8>::new());
        assert_eq!(arena.space_allocated(), 0);
    }

    #[test]
    fn access_past_reference_is_out_of_bounds() {
        let arena = Arena::new();
        let r = arena.alloc(8, 8).unwrap();
        let mut out = [0u8; 4];
        assert!(matches!(
            arena.read(r, 6, &mut out),
            Err(ArenaError::OutOfBounds { .. })
        ));
        assert!(matches!(
            arena.write(r, usize::MAX, &[1]),
            Err(ArenaError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn null_reference_is_rejected() {
        let arena = Arena::new();
        assert_eq!(arena.to_vec(ArenaRef::NULL), Err(ArenaError::NullRef));
        assert!(!arena.resolves(ArenaRef::NULL));
    }

    #[test]
    fn forged_reference_is_out_of_bounds() {
        let arena = Arena::new();
        let r = arena.alloc(8, 8).unwrap();
        let forged = ArenaRef {
            block: 7,
            ..r
        };
        assert!(matches!(
            arena.to_vec(forged),
            Err(ArenaError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn foreign_reference_is_unreachable() {
        let a = Arena::new();
        let b = Arena::new();
        let r = a.alloc_copy(b"abc", 1).unwrap();
        assert!(!b.resolves(r));
        assert_eq!(
            b.to_vec(r),
            Err(ArenaError::Unreachable {
                arena: a.id().raw()
            })
        );
    }

    #[test]
    fn fused_arenas_resolve_each_other() {
        let a = Arena::new();
        let b = Arena::new();
        let ra = a.alloc_copy(b"from a", 1).unwrap();
        let rb = b.alloc_copy(b"from b", 1).unwrap();
        assert!(a.fuse(&b));
        assert!(a.is_fused(&b));
        assert_eq!(b.to_vec(ra).unwrap(), b"from a");
        assert_eq!(a.to_vec(rb).unwrap(), b"from b");
    }

    #[test]
    fn fused_allocation_survives_dropping_owner() {
        let b = Arena::new();
        let r = {
            let a = Arena::new();
            let r = a.alloc_copy(b"persist", 1).unwrap();
            assert!(a.fuse(&b));
            r
        };
        assert_eq!(b.to_vec(r).unwrap(), b"persist");
    }

    #[test]
    fn unfused_allocation_dies_with_owner() {
        let b = Arena::new();
        let r = {
            let a = Arena::new();
            a.alloc_copy(b"gone", 1).unwrap()
        };
        assert!(matches!(b.to_vec(r), Err(ArenaError::Unreachable { .. })));
    }

    #[test]
    fn fuse_is_transitive() {
        let a = Arena::new();
        let b = Arena::new();
        let c = Arena::new();
        let d = Arena::new();
        assert!(a.fuse(&b));
        assert!(c.fuse(&d));
        assert!(!a.is_fused(&c));
        assert!(b.fuse(&d));
        assert!(a.is_fused(&c));
        assert_eq!(a.group_size(), 4);
        let r = d.alloc_copy(b"d", 1).unwrap();
        assert_eq!(a.to_vec(r).unwrap(), b"d");
    }

    #[test]
    fn fusing_twice_is_a_no_op() {
        let a = Arena::new();
        let b = Arena::new();
        assert!(a.fuse(&b));
        assert!(b.fuse(&a));
        assert!(a.fuse(&a));
        assert_eq!(a.group_size(), 2);
    }

    #[test]
    fn bounded_arena_refuses_to_fuse() {
        let a = Arena::with_config(ArenaConfig::bounded(4096)).unwrap();
        let b = Arena::new();
        assert!(!a.fuse(&b));
        assert!(!b.fuse(&a));
        assert!(!a.is_fused(&b));
    }

    #[test]
    fn bounded_arena_reports_out_of_memory() {
        let arena = Arena::with_config(ArenaConfig::bounded(64)).unwrap();
        arena.alloc(64, 1).unwrap();
        assert!(matches!(
            arena.alloc(1, 1),
            Err(ArenaError::OutOfMemory {
                limit: Some(64),
                ..
            })
        ));
    }

    #[test]
    fn allocations_continue_after_fuse() {
        let a = Arena::new();
        let b = Arena::new();
        a.fuse(&b);
        let r1 = a.alloc_copy(b"one", 1).unwrap();
        let r2 = b.alloc_copy(b"two", 1).unwrap();
        assert_eq!(b.to_vec(r1).unwrap(), b"one");
        assert_eq!(a.to_vec(r2).unwrap(), b"two");
        assert!(a.bytes_used() >= 3);
        assert!(b.bytes_used() >= 3);
    }

    #[test]
    fn invalid_alignment_rejected() {
        let arena = Arena::new();
        assert!(matches!(
            arena.alloc(8, 3),
            Err(ArenaError::InvalidConfig { .. })
        ));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn allocations_never_alias(sizes in prop::collection::vec((1usize..600, 0u32..4), 1..40)) {
                let arena = Arena::new();
                let mut live = Vec::new();
                for (i, (size, align_log)) in sizes.iter().enumerate() {
                    let r = arena.alloc(*size, 1 << align_log).unwrap();
                    prop_assert_eq!(r.offset % (1 << align_log), 0);
                    arena.write(r, 0, &vec![i as u8; *size]).unwrap();
                    live.push((r, i as u8));
                }
                for (r, fill) in live {
                    let bytes = arena.to_vec(r).unwrap();
                    prop_assert!(bytes.iter().all(|&b| b == fill));
                }
            }

            #[test]
            fn fused_groups_see_everything(n in 2usize..8, pairs in prop::collection::vec((0usize..8, 0usize..8), 0..16)) {
                let arenas: Vec<Arena> = (0..n).map(|_| Arena::new()).collect();
                for (x, y) in pairs {
                    arenas[x % n].fuse(&arenas[y % n]);
                }
                for x in &arenas {
                    let r = x.alloc_copy(&[7], 1).unwrap();
                    for y in &arenas {
                        prop_assert_eq!(y.resolves(r), x.is_fused(y));
                    }
                }
            }
        }
    }
}
