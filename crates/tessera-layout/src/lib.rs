//! Mini-table layouts for Tessera messages.
//!
//! A [`MiniTable`] is the complete storage description of one message type:
//! instance size and alignment, presence words, oneof case slots, and the
//! offset of every field. Tables are produced by [`MiniTableBuilder`] from a
//! field list, or decoded from the compact printable layout encoding
//! ([`encode_table`] / [`decode_table`], and the multi-table file form via
//! [`MiniDescriptorEncoder`] / [`decode_file`]).
//!
//! Tables reference each other through [`TableId`] handles in a
//! [`TableSet`]; extensions live in an [`ExtensionRegistry`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod builder;
pub mod codec;
pub mod error;
pub mod extension;
pub mod field;
pub mod table;

pub use builder::MiniTableBuilder;
pub use codec::{decode_file, decode_table, encode_table, DecodedTable, MiniDescriptorEncoder, MAX_NESTING};
pub use error::{LayoutError, MalformedKind, MalformedLayout};
pub use extension::{ExtensionRegistry, MiniTableExtension};
pub use field::{hasbit_position, FieldSpec, MiniTableField, Presence};
pub use table::{is_map_entry, MiniTable, TableId, TableSet};
