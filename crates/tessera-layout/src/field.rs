//! Laid-out fields and the field specifications the builder consumes.

use tessera_core::{field, FieldMode, FieldType};

/// How a field records whether it is set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Presence {
    /// No presence tracking: the field is "set" when it differs from its
    /// default (scalars) or is non-empty (repeated and map fields).
    Implicit,
    /// Explicit presence recorded in the given bit of the presence words.
    HasBit(u16),
    /// Member of the oneof with this index; the field is set when the oneof's
    /// case slot holds this field's number.
    Oneof {
        /// Index of the oneof within the table.
        index: u16,
    },
}

/// One field of a [`MiniTable`](crate::MiniTable): its number, type, and
/// where its value lives in an instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MiniTableField {
    /// Field number.
    pub number: u32,
    /// Value type. Map fields have type [`FieldType::Message`].
    pub field_type: FieldType,
    /// Storage mode.
    pub mode: FieldMode,
    /// Encode as a packed run (repeated scalars only).
    pub packed: bool,
    /// Byte offset of the slot within the instance.
    pub offset: u16,
    /// Presence class.
    pub presence: Presence,
    /// Index into the table's sub-table list, for message and map fields.
    pub sub: Option<u16>,
}

impl MiniTableField {
    /// Slot size in bytes.
    pub fn size(&self) -> usize {
        field::slot_size(self.field_type, self.mode)
    }

    /// Slot alignment in bytes.
    pub fn align(&self) -> usize {
        field::slot_align(self.field_type, self.mode)
    }

    /// Whether the field holds a variable number of values.
    pub fn is_repeated(&self) -> bool {
        self.mode.is_repeated()
    }

    /// Whether the field is a singular (non-repeated) value.
    pub fn is_scalar(&self) -> bool {
        self.mode == FieldMode::Scalar
    }

    /// Whether the field records explicit presence (presence bit or oneof).
    pub fn has_presence(&self) -> bool {
        !matches!(self.presence, Presence::Implicit)
    }

    /// The presence bit, if any.
    pub fn hasbit(&self) -> Option<u16> {
        match self.presence {
            Presence::HasBit(bit) => Some(bit),
            _ => None,
        }
    }

    /// The containing oneof's index, if any.
    pub fn oneof_index(&self) -> Option<u16> {
        match self.presence {
            Presence::Oneof { index } => Some(index),
            _ => None,
        }
    }

    /// Whether values of this field are stored in a sub-table's shape.
    pub fn needs_sub(&self) -> bool {
        self.field_type == FieldType::Message || self.mode == FieldMode::Map
    }

    /// Whether the value stored in the slot is an arena reference.
    pub fn is_indirect(&self) -> bool {
        self.mode.is_repeated() || self.field_type.is_indirect()
    }
}

/// Byte and bit mask of a presence bit within an instance.
pub fn hasbit_position(bit: u16) -> (usize, u8) {
    ((bit / 8) as usize, 1u8 << (bit % 8))
}

/// A field as handed to [`MiniTableBuilder`](crate::MiniTableBuilder).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldSpec {
    /// Field number.
    pub number: u32,
    /// Value type.
    pub field_type: FieldType,
    /// Storage mode.
    pub mode: FieldMode,
    /// Packed encoding (repeated scalars only).
    pub packed: bool,
    /// Track presence with a presence bit (singular fields outside oneofs).
    pub explicit_presence: bool,
}

impl FieldSpec {
    /// A singular field without presence tracking.
    pub fn scalar(number: u32, field_type: FieldType) -> Self {
        Self {
            number,
            field_type,
            mode: FieldMode::Scalar,
            packed: false,
            explicit_presence: false,
        }
    }

    /// A singular field with a presence bit.
    pub fn optional(number: u32, field_type: FieldType) -> Self {
        Self {
            explicit_presence: true,
            ..Self::scalar(number, field_type)
        }
    }

    /// A repeated field. Packable types default to packed.
    pub fn repeated(number: u32, field_type: FieldType) -> Self {
        Self {
            number,
            field_type,
            mode: FieldMode::Array,
            packed: field_type.is_packable(),
            explicit_presence: false,
        }
    }

    /// A map field; its entry table is linked separately.
    pub fn map(number: u32) -> Self {
        Self {
            number,
            field_type: FieldType::Message,
            mode: FieldMode::Map,
            packed: false,
            explicit_presence: false,
        }
    }

    /// Override the packed flag.
    pub fn with_packed(mut self, packed: bool) -> Self {
        self.packed = packed;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_packable_defaults_to_packed() {
        assert!(FieldSpec::repeated(1, FieldType::Int32).packed);
        assert!(!FieldSpec::repeated(1, FieldType::String).packed);
        assert!(!FieldSpec::repeated(1, FieldType::Int32).with_packed(false).packed);
    }

    #[test]
    fn hasbit_positions() {
        assert_eq!(hasbit_position(0), (0, 1));
        assert_eq!(hasbit_position(7), (0, 0x80));
        assert_eq!(hasbit_position(8), (1, 1));
        assert_eq!(hasbit_position(33), (4, 2));
    }
}
