//! Core types for the Tessera layout engine.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! closed set of field value types, the field storage modes, the wire types
//! of the protocol-buffer binary format, and the storage-slot sizing rules
//! shared by the layout builder, the message accessors, and the wire codec.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod field;
pub mod wire;

pub use field::{FieldMode, FieldType};
pub use wire::{Tag, WireType};

/// Largest field number the wire format can carry (`2^29 - 1`).
pub const MAX_FIELD_NUMBER: u32 = (1 << 29) - 1;

/// Size in bytes of an indirect reference slot.
///
/// Strings, bytes, submessages, repeated fields and maps are stored in the
/// instance as a reference into arena memory; the reference record is always
/// this many bytes wide.
pub const REF_SLOT_SIZE: usize = 16;

/// Alignment of an indirect reference slot.
pub const REF_SLOT_ALIGN: usize = 8;

/// Returns `true` if `number` is a legal field number.
pub fn is_valid_field_number(number: u32) -> bool {
    (1..=MAX_FIELD_NUMBER).contains(&number)
}

/// Round `value` up to the next multiple of `align` (a power of two).
pub fn align_up(value: usize, align: usize) -> usize {
    debug_assert!(align.is_power_of_two());
    (value + align - 1) & !(align - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_number_bounds() {
        assert!(!is_valid_field_number(0));
        assert!(is_valid_field_number(1));
        assert!(is_valid_field_number(MAX_FIELD_NUMBER));
        assert!(!is_valid_field_number(MAX_FIELD_NUMBER + 1));
    }

    #[test]
    fn align_up_rounds_to_power_of_two() {
        assert_eq!(align_up(0, 8), 0);
        assert_eq!(align_up(1, 8), 8);
        assert_eq!(align_up(8, 8), 8);
        assert_eq!(align_up(13, 4), 16);
        assert_eq!(align_up(5, 1), 5);
    }
}
