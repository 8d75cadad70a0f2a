//! Generic, arena-resident messages read and written through mini-tables.
//!
//! A message instance is an untyped arena region shaped by one
//! [`MiniTable`](tessera_layout::MiniTable). [`Message`] is a copyable view
//! that pairs the region with its table and interprets presence bits, oneof
//! case slots and field slots on every access. No per-type code is needed.
//!
//! # Instance layout
//!
//! ```text
//! [unknown bytes ref 16][extensions ref 16][hasbits][oneof cases][field slots]
//!  \_____________ header ______________/   \______ MiniTable::size() ______/
//! ```
//!
//! Repeated fields are [`Array`]s, maps are [`Map`]s of sorted entry
//! messages, and extension values live in a per-message side list sorted by
//! field number. Aggregates that were never created read as `None`.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod array;
pub mod error;
pub mod map;
pub mod message;
pub mod ptr;
mod slot;
pub mod value;

pub use array::{Array, ArrayIter, ARRAY_HEADER_SIZE};
pub use error::AccessError;
pub use map::{Map, MapIter};
pub use message::{Message, PresentFields};
pub use ptr::{ArrayPtr, MapPtr, MessagePtr, HEADER_SIZE, STORAGE_ALIGN};
pub use value::{MapKey, Value};
