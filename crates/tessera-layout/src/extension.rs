//! Extension fields and the registry that finds them by extendee and number.

use indexmap::IndexMap;
use tessera_core::{is_valid_field_number, FieldMode, FieldType};

use crate::error::LayoutError;
use crate::field::{MiniTableField, Presence};
use crate::table::TableId;

/// The layout of one extension field.
///
/// Extensions are not stored in the extendee's instance; each message keeps
/// a side list of extension values. The field's offset is therefore always
/// zero and its presence is implicit in the list entry existing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MiniTableExtension {
    /// Field shape: number, type, mode, packed.
    pub field: MiniTableField,
    /// The table this extension extends.
    pub extendee: TableId,
    /// Sub-table for message-typed extensions.
    pub sub: Option<TableId>,
}

impl MiniTableExtension {
    /// Describe an extension field.
    ///
    /// Map extensions are not allowed; `packed` only applies to repeated
    /// scalar extensions.
    pub fn new(
        extendee: TableId,
        number: u32,
        field_type: FieldType,
        mode: FieldMode,
        packed: bool,
    ) -> Result<Self, LayoutError> {
        if !is_valid_field_number(number) {
            return Err(LayoutError::InvalidFieldNumber { number });
        }
        if mode == FieldMode::Map {
            return Err(LayoutError::InvalidMapField { number });
        }
        if packed && !(mode == FieldMode::Array && field_type.is_packable()) {
            return Err(LayoutError::InvalidPacked { number });
        }
        Ok(Self {
            field: MiniTableField {
                number,
                field_type,
                mode,
                packed,
                offset: 0,
                presence: Presence::Implicit,
                sub: (field_type == FieldType::Message).then_some(0),
            },
            extendee,
            sub: None,
        })
    }

    /// Link a message-typed extension to its value table.
    pub fn with_sub(mut self, sub: TableId) -> Self {
        self.sub = Some(sub);
        self
    }

    /// Extension field number.
    pub fn number(&self) -> u32 {
        self.field.number
    }
}

/// Extensions keyed by `(extendee, number)`.
#[derive(Clone, Debug, Default)]
pub struct ExtensionRegistry {
    entries: IndexMap<(TableId, u32), MiniTableExtension>,
}

impl ExtensionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an extension. Fails if the `(extendee, number)` pair is taken.
    pub fn add(&mut self, ext: MiniTableExtension) -> Result<(), LayoutError> {
        let key = (ext.extendee, ext.number());
        if self.entries.contains_key(&key) {
            return Err(LayoutError::DuplicateExtension {
                extendee: ext.extendee,
                number: ext.number(),
            });
        }
        self.entries.insert(key, ext);
        Ok(())
    }

    /// Find the extension `number` of `extendee`.
    pub fn find(&self, extendee: TableId, number: u32) -> Option<&MiniTableExtension> {
        self.entries.get(&(extendee, number))
    }

    /// Extensions of `extendee`, in registration order.
    pub fn for_extendee(&self, extendee: TableId) -> impl Iterator<Item = &MiniTableExtension> + '_ {
        self.entries
            .values()
            .filter(move |e| e.extendee == extendee)
    }

    /// Number of registered extensions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every extension registered after the first `len`.
    pub fn truncate(&mut self, len: usize) {
        self.entries.truncate(len);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_find() {
        let mut reg = ExtensionRegistry::new();
        let ext = MiniTableExtension::new(TableId(0), 100, FieldType::Int32, FieldMode::Scalar, false)
            .unwrap();
        reg.add(ext).unwrap();
        assert_eq!(reg.find(TableId(0), 100), Some(&ext));
        assert_eq!(reg.find(TableId(1), 100), None);
        assert_eq!(reg.for_extendee(TableId(0)).count(), 1);
    }

    #[test]
    fn duplicate_extension_rejected() {
        let mut reg = ExtensionRegistry::new();
        let ext = MiniTableExtension::new(TableId(3), 7, FieldType::Bool, FieldMode::Scalar, false)
            .unwrap();
        reg.add(ext).unwrap();
        assert_eq!(
            reg.add(ext),
            Err(LayoutError::DuplicateExtension {
                extendee: TableId(3),
                number: 7
            })
        );
    }

    #[test]
    fn invalid_extension_shapes_rejected() {
        assert!(MiniTableExtension::new(TableId(0), 0, FieldType::Int32, FieldMode::Scalar, false).is_err());
        assert!(MiniTableExtension::new(TableId(0), 1, FieldType::Message, FieldMode::Map, false).is_err());
        assert!(MiniTableExtension::new(TableId(0), 1, FieldType::String, FieldMode::Array, true).is_err());
    }

    #[test]
    fn truncate_rolls_back() {
        let mut reg = ExtensionRegistry::new();
        for n in 1..=3 {
            reg.add(MiniTableExtension::new(TableId(0), n, FieldType::Int32, FieldMode::Scalar, false).unwrap())
                .unwrap();
        }
        reg.truncate(1);
        assert_eq!(reg.len(), 1);
        assert!(reg.find(TableId(0), 2).is_none());
    }
}
