//! Map fields as sorted arrays of entry messages.
//!
//! A map is stored as an array of 16-byte references to entry messages,
//! each an instance of the map's entry table (key in field 1, value in
//! field 2). Entries are kept sorted by key, so lookups are binary searches
//! and iteration is in key order.

use tessera_arena::{Arena, ArenaRef};
use tessera_core::FieldMode;
use tessera_layout::{TableId, TableSet};

use crate::array::RawArray;
use crate::error::AccessError;
use crate::message::Message;
use crate::ptr::{MapPtr, MessagePtr};
use crate::slot;
use crate::value::{MapKey, Value};

const KEY: u32 = 1;
const VALUE: u32 = 2;

/// A view of one map field.
#[derive(Clone, Copy)]
pub struct Map<'a> {
    arena: &'a Arena,
    tables: &'a TableSet,
    entry_table: TableId,
    raw: RawArray,
}

impl<'a> Map<'a> {
    /// View an existing map whose entries use `entry_table`.
    pub fn attach(
        arena: &'a Arena,
        tables: &'a TableSet,
        entry_table: TableId,
        ptr: MapPtr,
    ) -> Self {
        Self {
            arena,
            tables,
            entry_table,
            raw: RawArray {
                header: ptr.0,
                elem_size: ArenaRef::SIZE,
            },
        }
    }

    /// Allocate an empty, unattached map whose entries use `entry_table`.
    pub fn new(
        arena: &'a Arena,
        tables: &'a TableSet,
        entry_table: TableId,
    ) -> Result<Self, AccessError> {
        if tables.get(entry_table).is_none() {
            return Err(AccessError::UnknownTable { table: entry_table });
        }
        let raw = RawArray::alloc(arena, ArenaRef::SIZE)?;
        Ok(Self::attach(arena, tables, entry_table, MapPtr(raw.header)))
    }

    /// The map's arena reference.
    pub fn ptr(&self) -> MapPtr {
        MapPtr(self.raw.header)
    }

    /// The entry table.
    pub fn entry_table(&self) -> TableId {
        self.entry_table
    }

    /// Number of entries.
    pub fn len(&self) -> Result<usize, AccessError> {
        self.raw.len(self.arena)
    }

    /// Returns `true` if the map has no entries.
    pub fn is_empty(&self) -> Result<bool, AccessError> {
        Ok(self.len()? == 0)
    }

    /// The entry message at position `index` in key order.
    pub fn entry(&self, index: usize) -> Result<Message<'a>, AccessError> {
        let (data, at) = self.raw.element(self.arena, index)?;
        let r = slot::read_ref(self.arena, data, at)?;
        Message::attach(self.arena, self.tables, self.entry_table, MessagePtr(r))
    }

    fn key_of(entry: &Message<'_>) -> Result<MapKey, AccessError> {
        let value = entry.get(KEY)?;
        MapKey::from_value(value).ok_or_else(|| {
            let field = entry.table().find_field(KEY);
            AccessError::TypeMismatch {
                number: KEY,
                field_type: field.map_or(tessera_core::FieldType::Message, |f| f.field_type),
                mode: FieldMode::Scalar,
            }
        })
    }

    /// `Ok(index)` of the entry with `key`, or `Err(insertion point)`.
    fn search(&self, key: &MapKey) -> Result<Result<usize, usize>, AccessError> {
        let (mut lo, mut hi) = (0, self.len()?);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let probe = Self::key_of(&self.entry(mid)?)?;
            match probe.cmp(key) {
                std::cmp::Ordering::Less => lo = mid + 1,
                std::cmp::Ordering::Greater => hi = mid,
                std::cmp::Ordering::Equal => return Ok(Ok(mid)),
            }
        }
        Ok(Err(lo))
    }

    /// The value stored under `key`.
    pub fn get(&self, key: &MapKey) -> Result<Option<Value>, AccessError> {
        match self.search(key)? {
            Ok(i) => Ok(Some(self.entry(i)?.get(VALUE)?)),
            Err(_) => Ok(None),
        }
    }

    /// Whether `key` has an entry.
    pub fn contains_key(&self, key: &MapKey) -> Result<bool, AccessError> {
        Ok(self.search(key)?.is_ok())
    }

    /// Insert or replace the value under `key`.
    pub fn insert(&self, key: MapKey, value: Value) -> Result<(), AccessError> {
        match self.search(&key)? {
            Ok(i) => self.entry(i)?.set(VALUE, value),
            Err(pos) => {
                let entry = Message::new(self.arena, self.tables, self.entry_table)?;
                entry.set(KEY, key.to_value())?;
                entry.set(VALUE, value)?;
                let (data, at) = self.raw.insert_gap(self.arena, pos)?;
                slot::write_ref(self.arena, data, at, entry.ptr().0)
            }
        }
    }

    /// Insert a fully built entry message, replacing any entry with the
    /// same key.
    pub fn insert_entry(&self, entry: MessagePtr) -> Result<(), AccessError> {
        let view = Message::attach(self.arena, self.tables, self.entry_table, entry)?;
        let key = Self::key_of(&view)?;
        let (data, at) = match self.search(&key)? {
            Ok(i) => self.raw.element(self.arena, i)?,
            Err(pos) => self.raw.insert_gap(self.arena, pos)?,
        };
        slot::write_ref(self.arena, data, at, entry.0)
    }

    /// Remove the entry under `key`. Returns whether one existed.
    pub fn remove(&self, key: &MapKey) -> Result<bool, AccessError> {
        match self.search(key)? {
            Ok(i) => {
                self.raw.remove(self.arena, i)?;
                Ok(true)
            }
            Err(_) => Ok(false),
        }
    }

    /// Remove every entry.
    pub fn clear(&self) -> Result<(), AccessError> {
        self.raw.set_len(self.arena, 0)
    }

    /// Iterate over `(key, value)` pairs in key order.
    pub fn iter(&self) -> MapIter<'a> {
        MapIter {
            map: *self,
            index: 0,
        }
    }
}

/// Iterator over a [`Map`]'s entries in key order.
pub struct MapIter<'a> {
    map: Map<'a>,
    index: usize,
}

impl MapIter<'_> {
    fn pair(&self) -> Result<(MapKey, Value), AccessError> {
        let entry = self.map.entry(self.index)?;
        Ok((Map::key_of(&entry)?, entry.get(VALUE)?))
    }
}

impl Iterator for MapIter<'_> {
    type Item = Result<(MapKey, Value), AccessError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.map.len() {
            Ok(len) if self.index >= len => None,
            Ok(_) => {
                let pair = self.pair();
                self.index += 1;
                Some(pair)
            }
            Err(e) => Some(Err(e)),
        }
    }
}
