//! Typed wrappers around arena references to messages, arrays, and maps.

use tessera_arena::ArenaRef;

/// Bytes reserved at the front of every message instance.
///
/// `[unknown-field byte array ref 16][extension entry array ref 16]`,
/// followed by the mini-table's `size` bytes of field storage.
pub const HEADER_SIZE: usize = 32;

/// Offset of the unknown-field array reference within the header.
pub(crate) const UNKNOWN_SLOT: usize = 0;

/// Offset of the extension array reference within the header.
pub(crate) const EXTENSIONS_SLOT: usize = 16;

/// Alignment of message instances and array storage.
pub const STORAGE_ALIGN: usize = 8;

macro_rules! ptr_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub struct $name(pub ArenaRef);

        impl $name {
            /// The underlying arena reference.
            pub fn arena_ref(&self) -> ArenaRef {
                self.0
            }
        }
    };
}

ptr_type!(
    /// A message instance in an arena.
    MessagePtr
);
ptr_type!(
    /// A repeated field's array header in an arena.
    ArrayPtr
);
ptr_type!(
    /// A map field's sorted entry array in an arena.
    MapPtr
);
