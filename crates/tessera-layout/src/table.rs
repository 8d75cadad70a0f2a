//! Mini-tables and the registry that links them to each other.

use std::fmt;

use tessera_core::FieldMode;

use crate::error::LayoutError;
use crate::field::MiniTableField;

/// The storage layout of one message type.
///
/// A mini-table records the instance size and alignment, the presence-bit
/// words and oneof case slots at the start of the instance, and every
/// field's slot, sorted by field number. Message and map fields refer to
/// other tables through the sub-table list, which is filled in by
/// [`TableSet::link`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MiniTable {
    size: u16,
    align: u8,
    hasbit_words: u16,
    oneof_case_offsets: Vec<u16>,
    fields: Vec<MiniTableField>,
    subs: Vec<Option<TableId>>,
    dense_below: u32,
}

impl MiniTable {
    /// Assemble a table from validated parts.
    ///
    /// `fields` must be sorted by number; sub indices are assigned here.
    pub(crate) fn from_parts(
        size: u16,
        align: u8,
        hasbit_words: u16,
        oneof_case_offsets: Vec<u16>,
        mut fields: Vec<MiniTableField>,
    ) -> Self {
        let mut sub_count = 0u16;
        for field in &mut fields {
            if field.needs_sub() {
                field.sub = Some(sub_count);
                sub_count += 1;
            } else {
                field.sub = None;
            }
        }
        let dense_below = fields
            .iter()
            .enumerate()
            .take_while(|(i, f)| f.number as usize == i + 1)
            .count() as u32;
        Self {
            size,
            align,
            hasbit_words,
            oneof_case_offsets,
            fields,
            subs: vec![None; sub_count as usize],
            dense_below,
        }
    }

    /// Instance size in bytes, not counting the message header.
    pub fn size(&self) -> usize {
        self.size as usize
    }

    /// Instance alignment in bytes.
    pub fn align(&self) -> usize {
        self.align as usize
    }

    /// Number of 32-bit presence words at the start of the instance.
    pub fn hasbit_words(&self) -> usize {
        self.hasbit_words as usize
    }

    /// Number of oneofs.
    pub fn oneof_count(&self) -> usize {
        self.oneof_case_offsets.len()
    }

    /// Offset of the 32-bit case slot of oneof `index`.
    pub fn oneof_case_offset(&self, index: u16) -> Option<usize> {
        self.oneof_case_offsets
            .get(index as usize)
            .map(|&o| o as usize)
    }

    /// Case-slot offsets of every oneof, by index.
    pub fn oneof_case_offsets(&self) -> &[u16] {
        &self.oneof_case_offsets
    }

    /// Fields in ascending number order.
    pub fn fields(&self) -> &[MiniTableField] {
        &self.fields
    }

    /// Number of fields.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Fields numbered `1..=n` are stored at index `n - 1`; this is that `n`.
    pub fn dense_below(&self) -> u32 {
        self.dense_below
    }

    /// Index of the field with this number.
    pub fn field_index(&self, number: u32) -> Option<usize> {
        if number >= 1 && number <= self.dense_below {
            return Some(number as usize - 1);
        }
        self.fields.binary_search_by_key(&number, |f| f.number).ok()
    }

    /// Look up a field by number.
    pub fn find_field(&self, number: u32) -> Option<&MiniTableField> {
        self.field_index(number).map(|i| &self.fields[i])
    }

    /// Members of oneof `index`, in number order.
    pub fn oneof_members(&self, index: u16) -> impl Iterator<Item = &MiniTableField> + '_ {
        self.fields
            .iter()
            .filter(move |f| f.oneof_index() == Some(index))
    }

    /// Number of sub-table slots.
    pub fn sub_count(&self) -> usize {
        self.subs.len()
    }

    /// The linked sub-table of a message or map field, if linked.
    pub fn sub_table(&self, field: &MiniTableField) -> Option<TableId> {
        field
            .sub
            .and_then(|i| self.subs.get(i as usize).copied().flatten())
    }

    /// Whether every message and map field has a linked sub-table.
    pub fn is_fully_linked(&self) -> bool {
        self.subs.iter().all(Option::is_some)
    }

    /// The same table with every sub-table link cleared.
    pub fn unlinked(&self) -> MiniTable {
        MiniTable {
            subs: vec![None; self.subs.len()],
            ..self.clone()
        }
    }
}

/// Handle to a [`MiniTable`] inside a [`TableSet`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(pub u32);

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for TableId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// An append-only registry of mini-tables addressed by [`TableId`].
///
/// Sub-table links are ids into the same set, so recursive and mutually
/// recursive message types are plain cycles of indices.
#[derive(Clone, Debug, Default)]
pub struct TableSet {
    tables: Vec<MiniTable>,
}

impl TableSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table and return its handle.
    pub fn insert(&mut self, table: MiniTable) -> TableId {
        let id = TableId(self.tables.len() as u32);
        self.tables.push(table);
        id
    }

    /// The id the next [`insert`](TableSet::insert) will return.
    pub fn next_id(&self) -> TableId {
        TableId(self.tables.len() as u32)
    }

    /// Look up a table.
    pub fn get(&self, id: TableId) -> Option<&MiniTable> {
        self.tables.get(id.0 as usize)
    }

    /// Number of tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Returns `true` if the set holds no tables.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Iterate over `(id, table)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (TableId, &MiniTable)> + '_ {
        self.tables
            .iter()
            .enumerate()
            .map(|(i, t)| (TableId(i as u32), t))
    }

    /// Drop every table inserted after the first `len`.
    pub fn truncate(&mut self, len: usize) {
        self.tables.truncate(len);
    }

    /// Link field `number` of `parent` to `child`.
    ///
    /// The field must be a message field, a repeated message field, or a map.
    /// For maps, `child` must be an entry table: exactly fields 1 (a valid
    /// key type) and 2, both singular.
    pub fn link(&mut self, parent: TableId, number: u32, child: TableId) -> Result<(), LayoutError> {
        let child_table = self
            .get(child)
            .ok_or(LayoutError::UnknownTable { table: child })?;
        let entry_ok = is_map_entry(child_table);
        let parent_table = self
            .tables
            .get_mut(parent.0 as usize)
            .ok_or(LayoutError::UnknownTable { table: parent })?;
        let field = *parent_table
            .find_field(number)
            .ok_or(LayoutError::FieldNotFound { number })?;
        let sub = field.sub.ok_or(LayoutError::NotASubMessage { number })?;
        if field.mode == FieldMode::Map && !entry_ok {
            return Err(LayoutError::InvalidMapEntry { number });
        }
        parent_table.subs[sub as usize] = Some(child);
        Ok(())
    }
}

/// Whether `table` has the shape of a map entry.
pub fn is_map_entry(table: &MiniTable) -> bool {
    let fields = table.fields();
    fields.len() == 2
        && fields[0].number == 1
        && fields[1].number == 2
        && fields.iter().all(MiniTableField::is_scalar)
        && fields[0].field_type.is_valid_map_key()
}
