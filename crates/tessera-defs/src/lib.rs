//! Schema defs for Tessera: a pool of resolved files, messages, fields,
//! oneofs, enums and extensions, each message linked to a mini-table.
//!
//! Files are described with [`FileDescriptor`] builders (or loaded from
//! generated [`FileInit`] statics) and added to a [`DefPool`]. Adding a file
//! resolves its type names against the files it imports, computes or
//! validates a mini-table per message, and registers its extensions. A
//! failed add leaves the pool unchanged.
//!
//! Once built, the pool is read-only and can be shared across threads. The
//! [`DynamicMessage`] view reads and writes message instances by def.
//!
//! ```
//! use tessera_arena::Arena;
//! use tessera_core::FieldType;
//! use tessera_defs::{DefPool, DynamicMessage, FieldDescriptor, FileDescriptor, MessageDescriptor};
//! use tessera_message::Value;
//!
//! let file = FileDescriptor::new("point.proto").package("geo").message(
//!     MessageDescriptor::new("Point")
//!         .field(FieldDescriptor::new("x", 1, FieldType::Int32))
//!         .field(FieldDescriptor::new("y", 2, FieldType::Int32).with_default("-1")),
//! );
//! let mut pool = DefPool::new();
//! pool.add_file(&file).unwrap();
//!
//! let point = pool.find_message("geo.Point").unwrap();
//! let arena = Arena::new();
//! let msg = DynamicMessage::new(&pool, &arena, point.id()).unwrap();
//! let x = point.field_by_name("x").unwrap();
//! msg.set(x, Value::Int32(3)).unwrap();
//! assert_eq!(msg.get(x).unwrap(), Value::Int32(3));
//! assert_eq!(msg.get(point.field_by_name("y").unwrap()).unwrap(), Value::Int32(-1));
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod def;
mod default;
pub mod descriptor;
pub mod error;
pub mod id;
pub mod init;
pub mod pool;
pub mod reflect;

pub use def::{EnumDef, FieldDef, FileDef, MessageDef, OneofDef};
pub use descriptor::{
    EnumDescriptor, EnumValueDescriptor, FieldDescriptor, FileDescriptor, Label, MessageDescriptor,
    OneofDescriptor, Syntax,
};
pub use error::{BuildError, ReflectError};
pub use id::{EnumId, ExtensionId, FileId, MessageId};
pub use init::FileInit;
pub use pool::DefPool;
pub use reflect::{DynamicMessage, Fields};
