//! Bump-allocated, fusable arenas for Tessera message storage.
//!
//! Every dynamically sized piece of message data (instances, strings,
//! repeated-field storage, unknown bytes) lives in an [`Arena`]. Arenas hand
//! out [`ArenaRef`] handles rather than pointers: a handle names the owning
//! arena, a block, an offset and a length, and every access through a handle
//! is bounds-checked. Nothing is freed individually; all blocks go away
//! together when the last arena of a fused group is dropped.
//!
//! # Architecture
//!
//! ```text
//! Arena (one per owner, !Send)
//! └── Rc<RefCell<GroupNode>> ── parent ──▶ GroupNode (root)
//!                                          └── members: IndexMap<ArenaId, BlockList>
//!                                               └── Block[] (bump-allocated Box<[u8]>)
//! ```
//!
//! Fusing two arenas is a union-find `union`: the smaller group's block lists
//! move into the larger root and the smaller root forwards to it. A handle
//! resolves through any arena whose group contains the handle's arena id.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod arena;
pub mod block;
pub mod config;
pub mod error;
pub mod handle;

pub use arena::Arena;
pub use config::ArenaConfig;
pub use error::ArenaError;
pub use handle::{ArenaId, ArenaRef};
