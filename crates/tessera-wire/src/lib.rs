//! Protocol-buffer binary encoding for Tessera messages.
//!
//! The codec is driven entirely by each message's mini-table: there is no
//! generated code. [`decode`] parses tag/value pairs into a
//! [`Message`](tessera_message::Message), and [`encode`] writes present
//! fields back out in ascending number order followed by any preserved
//! unknown bytes.
//!
//! Decoding is bounded by [`DecodeOptions::max_depth`] and reports malformed
//! input as [`DecodeError::Parse`] with the byte offset of the problem.
//! There is no rollback; fields decoded before an error stay set.
//!
//! ```
//! use tessera_arena::Arena;
//! use tessera_core::FieldType;
//! use tessera_layout::{FieldSpec, MiniTableBuilder, TableSet};
//! use tessera_message::Value;
//! use tessera_wire::{decode_new, encode, DecodeOptions, EncodeOptions};
//!
//! let mut b = MiniTableBuilder::new(2);
//! b.add_field(FieldSpec::scalar(1, FieldType::Int32)).unwrap();
//! b.add_field(FieldSpec::scalar(2, FieldType::Int32)).unwrap();
//! let mut tables = TableSet::new();
//! let point = tables.insert(b.finish().unwrap());
//!
//! let arena = Arena::new();
//! let msg = decode_new(&[0x08, 0x03, 0x10, 0x04], &arena, &tables, point, &DecodeOptions::new()).unwrap();
//! assert_eq!(msg.get(2).unwrap(), Value::Int32(4));
//! assert_eq!(encode(msg, &EncodeOptions::new()).unwrap(), [0x08, 0x03, 0x10, 0x04]);
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod decode;
pub mod encode;
pub mod error;
pub mod varint;

pub use config::{DecodeOptions, EncodeOptions};
pub use decode::{decode, decode_new, decode_with_extensions};
pub use encode::{encode, encode_into};
pub use error::{DecodeError, EncodeError, ParseErrorKind};
