//! Tessera: arena-backed protocol-buffer messages laid out by mini-tables.
//!
//! This is the facade crate that re-exports the public API of every
//! Tessera sub-crate. Most users only need this one dependency.
//!
//! # Quick start
//!
//! ```rust
//! use tessera::prelude::*;
//!
//! let file = FileDescriptor::new("geo.proto").package("geo").message(
//!     MessageDescriptor::new("Point")
//!         .field(FieldDescriptor::new("x", 1, FieldType::Int32))
//!         .field(FieldDescriptor::new("y", 2, FieldType::Int32)),
//! );
//! let mut pool = DefPool::new();
//! pool.add_file(&file).unwrap();
//! let point = pool.find_message("geo.Point").unwrap();
//!
//! let arena = Arena::new();
//! let msg = decode_new(&[0x08, 0x03, 0x10, 0x04], &arena, pool.tables(), point.table(), &DecodeOptions::new()).unwrap();
//! let msg = DynamicMessage::wrap(&pool, msg).unwrap();
//! assert_eq!(msg.get(point.field_by_name("y").unwrap()).unwrap(), Value::Int32(4));
//! assert_eq!(encode(msg.message(), &EncodeOptions::new()).unwrap(), [0x08, 0x03, 0x10, 0x04]);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `tessera-core` | Field types, storage modes, wire types and tags |
//! | [`arena`] | `tessera-arena` | Fusable bump arenas and `ArenaRef` handles |
//! | [`layout`] | `tessera-layout` | Mini-tables, the builder, the mini-descriptor codec, extensions |
//! | [`message`] | `tessera-message` | Generic message, array and map views over arena storage |
//! | [`wire`] | `tessera-wire` | Binary wire encoder and decoder |
//! | [`defs`] | `tessera-defs` | Def pool, schema descriptions, reflective access |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Leaf types shared by every crate (`tessera-core`).
pub use tessera_core as types;

/// Fusable bump arenas (`tessera-arena`).
///
/// Every message, array and map lives in an [`arena::Arena`]; fuse arenas
/// with [`arena::Arena::fuse`] to let references cross between them.
pub use tessera_arena as arena;

/// Mini-tables and their codec (`tessera-layout`).
///
/// Build tables with [`layout::MiniTableBuilder`], serialize them with
/// [`layout::encode_table`], and register them in a [`layout::TableSet`].
pub use tessera_layout as layout;

/// Generic message accessors (`tessera-message`).
pub use tessera_message as message;

/// Binary wire format (`tessera-wire`).
pub use tessera_wire as wire;

/// Def pool and reflection (`tessera-defs`).
///
/// [`defs::DefPool`] resolves schema files into defs linked to mini-tables;
/// [`defs::DynamicMessage`] reads and writes messages by def.
pub use tessera_defs as defs;

/// Common imports for typical Tessera usage.
///
/// ```rust
/// use tessera::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use tessera_core::{FieldMode, FieldType, WireType};

    // Arena
    pub use tessera_arena::{Arena, ArenaConfig};

    // Layout
    pub use tessera_layout::{FieldSpec, MiniTable, MiniTableBuilder, TableId, TableSet};

    // Message
    pub use tessera_message::{MapKey, Message, Value};

    // Wire
    pub use tessera_wire::{decode, decode_new, encode, DecodeOptions, EncodeOptions};

    // Defs
    pub use tessera_defs::{
        DefPool, DynamicMessage, FieldDescriptor, FileDescriptor, FileInit, MessageDescriptor,
        Syntax,
    };

    // Errors
    pub use tessera_arena::ArenaError;
    pub use tessera_defs::{BuildError, ReflectError};
    pub use tessera_layout::{LayoutError, MalformedLayout};
    pub use tessera_message::AccessError;
    pub use tessera_wire::{DecodeError, EncodeError};
}
