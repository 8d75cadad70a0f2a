//! Message instances viewed through a mini-table.

use std::fmt;

use tessera_arena::{Arena, ArenaRef};
use tessera_core::{FieldMode, FieldType};
use tessera_layout::{hasbit_position, MiniTable, MiniTableExtension, MiniTableField, Presence, TableId, TableSet};

use crate::array::{Array, RawArray};
use crate::error::AccessError;
use crate::map::Map;
use crate::ptr::{ArrayPtr, MapPtr, MessagePtr, EXTENSIONS_SLOT, HEADER_SIZE, UNKNOWN_SLOT};
use crate::slot;
use crate::value::Value;

/// Extension entry: `[number u32][code u32][sub u32][reserved u32][slot 16]`.
const EXT_ENTRY_SIZE: usize = 32;
const EXT_CODE_AT: usize = 4;
const EXT_SUB_AT: usize = 8;
const EXT_SLOT_AT: usize = 16;
const NO_SUB: u32 = u32::MAX;

fn ext_code(field: &MiniTableField) -> u32 {
    field.field_type.code() | field.mode.code() << 5 | (field.packed as u32) << 7
}

/// A message instance: an arena region interpreted through one mini-table.
///
/// `Message` is a cheap, copyable view. The instance itself lives in the
/// arena; every read and write goes through the arena's fused group, so a
/// view whose arena cannot reach the instance reports
/// [`AccessError::ForeignArena`] instead of touching memory.
#[derive(Clone, Copy)]
pub struct Message<'a> {
    arena: &'a Arena,
    tables: &'a TableSet,
    table_id: TableId,
    table: &'a MiniTable,
    ptr: MessagePtr,
}

impl<'a> Message<'a> {
    /// Allocate a zeroed instance of `table_id` in `arena`.
    pub fn new(arena: &'a Arena, tables: &'a TableSet, table_id: TableId) -> Result<Self, AccessError> {
        let table = tables
            .get(table_id)
            .ok_or(AccessError::UnknownTable { table: table_id })?;
        let r = slot::alloc_storage(arena, HEADER_SIZE + table.size())?;
        Ok(Self {
            arena,
            tables,
            table_id,
            table,
            ptr: MessagePtr(r),
        })
    }

    /// View an existing instance.
    ///
    /// The reference must cover exactly one instance of the table and must
    /// resolve through `arena`.
    pub fn attach(
        arena: &'a Arena,
        tables: &'a TableSet,
        table_id: TableId,
        ptr: MessagePtr,
    ) -> Result<Self, AccessError> {
        let table = tables
            .get(table_id)
            .ok_or(AccessError::UnknownTable { table: table_id })?;
        let expected = HEADER_SIZE + table.size();
        if ptr.0.len() != expected {
            return Err(AccessError::LayoutMismatch {
                expected,
                actual: ptr.0.len(),
            });
        }
        if !arena.resolves(ptr.0) {
            return Err(AccessError::ForeignArena);
        }
        Ok(Self {
            arena,
            tables,
            table_id,
            table,
            ptr,
        })
    }

    /// The instance's arena reference.
    pub fn ptr(&self) -> MessagePtr {
        self.ptr
    }

    /// The arena this view reads and allocates through.
    pub fn arena(&self) -> &'a Arena {
        self.arena
    }

    /// The table set sub-table links resolve in.
    pub fn tables(&self) -> &'a TableSet {
        self.tables
    }

    /// This message's table handle.
    pub fn table_id(&self) -> TableId {
        self.table_id
    }

    /// This message's table.
    pub fn table(&self) -> &'a MiniTable {
        self.table
    }

    /// The field with `number`.
    pub fn field(&self, number: u32) -> Result<&'a MiniTableField, AccessError> {
        self.table
            .find_field(number)
            .ok_or(AccessError::NoSuchField { number })
    }

    fn base(&self) -> ArenaRef {
        self.ptr.0
    }

    fn slot_at(field: &MiniTableField) -> usize {
        HEADER_SIZE + field.offset as usize
    }

    fn sub_table(&self, field: &MiniTableField) -> Result<TableId, AccessError> {
        self.table
            .sub_table(field)
            .ok_or(AccessError::UnlinkedSubTable {
                number: field.number,
            })
    }

    fn mismatch(field: &MiniTableField) -> AccessError {
        AccessError::TypeMismatch {
            number: field.number,
            field_type: field.field_type,
            mode: field.mode,
        }
    }

    // Presence bookkeeping.

    fn hasbit(&self, bit: u16) -> Result<bool, AccessError> {
        let (byte, mask) = hasbit_position(bit);
        let [b] = slot::read_array::<1>(self.arena, self.base(), HEADER_SIZE + byte)?;
        Ok(b & mask != 0)
    }

    fn set_hasbit(&self, bit: u16, on: bool) -> Result<(), AccessError> {
        let (byte, mask) = hasbit_position(bit);
        let at = HEADER_SIZE + byte;
        let [b] = slot::read_array::<1>(self.arena, self.base(), at)?;
        let b = if on { b | mask } else { b & !mask };
        self.arena.write(self.base(), at, &[b])?;
        Ok(())
    }

    fn case_at(&self, index: u16) -> Result<usize, AccessError> {
        self.table
            .oneof_case_offset(index)
            .map(|o| HEADER_SIZE + o)
            .ok_or(AccessError::IndexOutOfBounds {
                index: index as usize,
                len: self.table.oneof_count(),
            })
    }

    fn oneof_case(&self, index: u16) -> Result<u32, AccessError> {
        slot::read_u32(self.arena, self.base(), self.case_at(index)?)
    }

    fn set_oneof_case(&self, index: u16, number: u32) -> Result<(), AccessError> {
        slot::write_u32(self.arena, self.base(), self.case_at(index)?, number)
    }

    /// Zero the storage shared by the members of oneof `index`.
    fn clear_oneof_storage(&self, index: u16) -> Result<(), AccessError> {
        let span = self.table.oneof_members(index).fold(None, |acc, f| {
            let (start, end) = (f.offset as usize, f.offset as usize + f.size());
            Some(match acc {
                None => (start, end),
                Some((s, e)) => (start.min(s), end.max(e)),
            })
        });
        match span {
            Some((start, end)) => slot::zero(self.arena, self.base(), HEADER_SIZE + start, end - start),
            None => Ok(()),
        }
    }

    fn slot_nonempty(&self, field: &MiniTableField) -> Result<bool, AccessError> {
        let at = Self::slot_at(field);
        match field.mode {
            FieldMode::Scalar if field.field_type.is_indirect() => {
                Ok(!slot::read_ref(self.arena, self.base(), at)?.is_null())
            }
            FieldMode::Scalar => slot::is_nonzero(self.arena, self.base(), at, field.size()),
            FieldMode::Array | FieldMode::Map => {
                let r = slot::read_ref(self.arena, self.base(), at)?;
                if r.is_null() {
                    return Ok(false);
                }
                let raw = RawArray {
                    header: r,
                    elem_size: 1,
                };
                Ok(raw.len(self.arena)? > 0)
            }
        }
    }

    // Field access.

    /// Whether field `number` is present.
    ///
    /// Presence-bit fields test their bit, oneof members compare the case
    /// slot, and implicit-presence fields are present when non-default
    /// (scalars) or non-empty (strings, repeated fields, maps).
    pub fn has(&self, number: u32) -> Result<bool, AccessError> {
        self.has_field(self.field(number)?)
    }

    /// [`has`](Self::has) for a field of this message's table.
    pub fn has_field(&self, field: &MiniTableField) -> Result<bool, AccessError> {
        match field.presence {
            Presence::HasBit(bit) => self.hasbit(bit),
            Presence::Oneof { index } => Ok(self.oneof_case(index)? == field.number),
            Presence::Implicit => self.slot_nonempty(field),
        }
    }

    /// The value of field `number`.
    ///
    /// Absent fields read as the zero value of their type; absent
    /// submessages, repeated fields, and maps read as `None` without
    /// allocating.
    pub fn get(&self, number: u32) -> Result<Value, AccessError> {
        self.get_field(self.field(number)?)
    }

    /// [`get`](Self::get) for a field of this message's table.
    pub fn get_field(&self, field: &MiniTableField) -> Result<Value, AccessError> {
        let absent = match field.presence {
            Presence::Oneof { index } => self.oneof_case(index)? != field.number,
            Presence::HasBit(bit) => !self.hasbit(bit)?,
            Presence::Implicit => false,
        };
        if absent {
            return Ok(Value::default_for_field(field.field_type, field.mode));
        }
        let at = Self::slot_at(field);
        match field.mode {
            FieldMode::Scalar => {
                slot::read_value(self.arena, self.base(), at, field.field_type, field.number)
            }
            FieldMode::Array => {
                let r = slot::read_ref(self.arena, self.base(), at)?;
                Ok(Value::Array((!r.is_null()).then_some(ArrayPtr(r))))
            }
            FieldMode::Map => {
                let r = slot::read_ref(self.arena, self.base(), at)?;
                Ok(Value::Map((!r.is_null()).then_some(MapPtr(r))))
            }
        }
    }

    fn check_value(field: &MiniTableField, value: Value) -> Result<Value, AccessError> {
        match (field.mode, value) {
            (FieldMode::Scalar, v) => v.coerce(field.field_type, field.number).map_err(|e| match e {
                AccessError::TypeMismatch { .. } => Self::mismatch(field),
                other => other,
            }),
            (FieldMode::Array, v @ Value::Array(_)) => Ok(v),
            (FieldMode::Map, v @ Value::Map(_)) => Ok(v),
            _ => Err(Self::mismatch(field)),
        }
    }

    /// Set field `number`.
    ///
    /// Setting a oneof member clears the previously active member first.
    /// Strings and bytes are copied into this view's arena. Setting an
    /// aggregate to `None` clears the field.
    pub fn set(&self, number: u32, value: Value) -> Result<(), AccessError> {
        self.set_field(self.field(number)?, value)
    }

    /// [`set`](Self::set) for a field of this message's table.
    pub fn set_field(&self, field: &MiniTableField, value: Value) -> Result<(), AccessError> {
        let value = Self::check_value(field, value)?;
        if matches!(value, Value::Message(None) | Value::Array(None) | Value::Map(None)) {
            return self.clear_field(field);
        }
        if let Presence::Oneof { index } = field.presence {
            if self.oneof_case(index)? != field.number {
                self.clear_oneof_storage(index)?;
            }
        }
        slot::write_value(self.arena, self.base(), Self::slot_at(field), &value)?;
        match field.presence {
            Presence::HasBit(bit) => self.set_hasbit(bit, true),
            Presence::Oneof { index } => self.set_oneof_case(index, field.number),
            Presence::Implicit => Ok(()),
        }
    }

    /// Clear field `number`.
    ///
    /// Presence is unmarked and the slot zeroed; nothing is freed. Clearing
    /// an inactive oneof member does nothing.
    pub fn clear(&self, number: u32) -> Result<(), AccessError> {
        self.clear_field(self.field(number)?)
    }

    /// [`clear`](Self::clear) for a field of this message's table.
    pub fn clear_field(&self, field: &MiniTableField) -> Result<(), AccessError> {
        match field.presence {
            Presence::Oneof { index } => {
                if self.oneof_case(index)? == field.number {
                    self.clear_oneof_storage(index)?;
                    self.set_oneof_case(index, 0)?;
                }
                Ok(())
            }
            Presence::HasBit(bit) => {
                self.set_hasbit(bit, false)?;
                slot::zero(self.arena, self.base(), Self::slot_at(field), field.size())
            }
            Presence::Implicit => slot::zero(self.arena, self.base(), Self::slot_at(field), field.size()),
        }
    }

    /// Clear every field, the unknown data, and all extensions.
    pub fn clear_all(&self) -> Result<(), AccessError> {
        slot::zero(self.arena, self.base(), 0, self.base().len())
    }

    /// The active member of oneof `index`, if any.
    pub fn which_oneof(&self, index: u16) -> Result<Option<&'a MiniTableField>, AccessError> {
        let case = self.oneof_case(index)?;
        if case == 0 {
            return Ok(None);
        }
        Ok(self.table.find_field(case))
    }

    /// The existing aggregate in field `number`, or a new empty one.
    ///
    /// Without an arena an absent aggregate fails with
    /// [`AccessError::Absent`] and nothing is allocated. A supplied arena
    /// must be fused with (or be) this view's arena.
    pub fn mutable(&self, number: u32, arena: Option<&Arena>) -> Result<Value, AccessError> {
        let field = self.field(number)?;
        let current = self.get_field(field)?;
        match current {
            Value::Message(Some(_)) | Value::Array(Some(_)) | Value::Map(Some(_)) => return Ok(current),
            Value::Message(None) | Value::Array(None) | Value::Map(None) => {}
            _ => return Err(Self::mismatch(field)),
        }
        let arena = arena.ok_or(AccessError::Absent { number })?;
        let fresh = match field.mode {
            FieldMode::Scalar => {
                let sub = self.sub_table(field)?;
                Value::Message(Some(Message::new(arena, self.tables, sub)?.ptr()))
            }
            FieldMode::Array => {
                let raw = RawArray::alloc(arena, field.field_type.slot_size())?;
                Value::Array(Some(ArrayPtr(raw.header)))
            }
            FieldMode::Map => {
                self.sub_table(field)?;
                let raw = RawArray::alloc(arena, ArenaRef::SIZE)?;
                Value::Map(Some(MapPtr(raw.header)))
            }
        };
        self.set_field(field, fresh.clone())?;
        Ok(fresh)
    }

    /// [`mutable`](Self::mutable) for a singular message field.
    pub fn mutable_message(&self, number: u32, arena: Option<&Arena>) -> Result<Message<'a>, AccessError> {
        let field = self.field(number)?;
        match self.mutable(number, arena)? {
            Value::Message(Some(ptr)) => Message::attach(self.arena, self.tables, self.sub_table(field)?, ptr),
            _ => Err(Self::mismatch(field)),
        }
    }

    /// [`mutable`](Self::mutable) for a repeated field.
    pub fn mutable_array(&self, number: u32, arena: Option<&Arena>) -> Result<Array<'a>, AccessError> {
        let field = self.field(number)?;
        match self.mutable(number, arena)? {
            Value::Array(Some(ptr)) => Ok(self.array_view(field, ptr)),
            _ => Err(Self::mismatch(field)),
        }
    }

    /// [`mutable`](Self::mutable) for a map field.
    pub fn mutable_map(&self, number: u32, arena: Option<&Arena>) -> Result<Map<'a>, AccessError> {
        let field = self.field(number)?;
        match self.mutable(number, arena)? {
            Value::Map(Some(ptr)) => Ok(Map::attach(self.arena, self.tables, self.sub_table(field)?, ptr)),
            _ => Err(Self::mismatch(field)),
        }
    }

    fn array_view(&self, field: &MiniTableField, ptr: ArrayPtr) -> Array<'a> {
        Array::attach(
            self.arena,
            self.tables,
            field.field_type,
            self.table.sub_table(field),
            ptr,
        )
    }

    /// The submessage in field `number`, if set.
    pub fn sub_message(&self, number: u32) -> Result<Option<Message<'a>>, AccessError> {
        let field = self.field(number)?;
        match self.get_field(field)? {
            Value::Message(Some(ptr)) => Ok(Some(Message::attach(
                self.arena,
                self.tables,
                self.sub_table(field)?,
                ptr,
            )?)),
            Value::Message(None) => Ok(None),
            _ => Err(Self::mismatch(field)),
        }
    }

    /// The repeated field `number`, if it was ever created.
    pub fn array(&self, number: u32) -> Result<Option<Array<'a>>, AccessError> {
        let field = self.field(number)?;
        match self.get_field(field)? {
            Value::Array(Some(ptr)) => Ok(Some(self.array_view(field, ptr))),
            Value::Array(None) => Ok(None),
            _ => Err(Self::mismatch(field)),
        }
    }

    /// The map field `number`, if it was ever created.
    pub fn map(&self, number: u32) -> Result<Option<Map<'a>>, AccessError> {
        let field = self.field(number)?;
        match self.get_field(field)? {
            Value::Map(Some(ptr)) => Ok(Some(Map::attach(
                self.arena,
                self.tables,
                self.sub_table(field)?,
                ptr,
            ))),
            Value::Map(None) => Ok(None),
            _ => Err(Self::mismatch(field)),
        }
    }

    /// Present fields and their values in ascending number order.
    pub fn present_fields(&self) -> PresentFields<'a> {
        PresentFields {
            msg: *self,
            index: 0,
        }
    }

    // Unknown fields.

    fn unknown_array(&self) -> Result<Option<RawArray>, AccessError> {
        let r = slot::read_ref(self.arena, self.base(), UNKNOWN_SLOT)?;
        Ok((!r.is_null()).then_some(RawArray {
            header: r,
            elem_size: 1,
        }))
    }

    /// The preserved unknown-field bytes, in arrival order.
    pub fn unknown(&self) -> Result<Vec<u8>, AccessError> {
        match self.unknown_array()? {
            Some(raw) => raw.to_vec(self.arena),
            None => Ok(Vec::new()),
        }
    }

    /// Whether any unknown-field bytes are preserved.
    pub fn has_unknown(&self) -> Result<bool, AccessError> {
        match self.unknown_array()? {
            Some(raw) => Ok(raw.len(self.arena)? > 0),
            None => Ok(false),
        }
    }

    /// Append raw wire bytes to the unknown-field span.
    pub fn append_unknown(&self, bytes: &[u8]) -> Result<(), AccessError> {
        if bytes.is_empty() {
            return Ok(());
        }
        let raw = match self.unknown_array()? {
            Some(raw) => raw,
            None => {
                let raw = RawArray::alloc(self.arena, 1)?;
                slot::write_ref(self.arena, self.base(), UNKNOWN_SLOT, raw.header)?;
                raw
            }
        };
        raw.extend_raw(self.arena, bytes)
    }

    /// Drop the unknown-field span of this message only.
    pub fn clear_unknown(&self) -> Result<(), AccessError> {
        if self.unknown_array()?.is_some() {
            slot::write_ref(self.arena, self.base(), UNKNOWN_SLOT, ArenaRef::NULL)?;
        }
        Ok(())
    }

    /// Drop unknown data here and in every reachable submessage.
    ///
    /// This message counts as depth 1. Hitting `max_depth` fails with
    /// [`AccessError::DepthExceeded`]; messages visited before the failure
    /// stay cleared.
    pub fn discard_unknown(&self, max_depth: usize) -> Result<(), AccessError> {
        self.discard_unknown_at(max_depth, max_depth)
    }

    fn discard_unknown_at(&self, remaining: usize, limit: usize) -> Result<(), AccessError> {
        if remaining == 0 {
            tracing::debug!(limit, table = %self.table_id, "discard_unknown depth limit reached");
            return Err(AccessError::DepthExceeded { limit });
        }
        self.clear_unknown()?;
        for field in self.table.fields() {
            if !field.needs_sub() {
                continue;
            }
            match field.mode {
                FieldMode::Scalar => {
                    if let Some(sub) = self.sub_message(field.number)? {
                        sub.discard_unknown_at(remaining - 1, limit)?;
                    }
                }
                FieldMode::Array => {
                    if let Some(array) = self.array(field.number)? {
                        for i in 0..array.len()? {
                            array.message(i)?.discard_unknown_at(remaining - 1, limit)?;
                        }
                    }
                }
                FieldMode::Map => {
                    if let Some(map) = self.map(field.number)? {
                        for i in 0..map.len()? {
                            let entry = map.entry(i)?;
                            entry.clear_unknown()?;
                            if entry.field(2)?.field_type == FieldType::Message {
                                if let Some(value) = entry.sub_message(2)? {
                                    value.discard_unknown_at(remaining - 1, limit)?;
                                }
                            }
                        }
                    }
                }
            }
        }
        for (ext, value) in self.extensions()? {
            let Some(sub) = ext.sub else { continue };
            match value {
                Value::Message(Some(ptr)) => {
                    Message::attach(self.arena, self.tables, sub, ptr)?
                        .discard_unknown_at(remaining - 1, limit)?;
                }
                Value::Array(Some(ptr)) => {
                    let array = Array::attach(self.arena, self.tables, FieldType::Message, Some(sub), ptr);
                    for i in 0..array.len()? {
                        array.message(i)?.discard_unknown_at(remaining - 1, limit)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    // Extensions.

    fn ext_array(&self) -> Result<Option<RawArray>, AccessError> {
        let r = slot::read_ref(self.arena, self.base(), EXTENSIONS_SLOT)?;
        Ok((!r.is_null()).then_some(RawArray {
            header: r,
            elem_size: EXT_ENTRY_SIZE,
        }))
    }

    fn ext_search(&self, raw: &RawArray, number: u32) -> Result<Result<usize, usize>, AccessError> {
        let len = raw.len(self.arena)?;
        if len == 0 {
            return Ok(Err(0));
        }
        let data = raw.data(self.arena)?;
        let (mut lo, mut hi) = (0, len);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let probe = slot::read_u32(self.arena, data, mid * EXT_ENTRY_SIZE)?;
            match probe.cmp(&number) {
                std::cmp::Ordering::Less => lo = mid + 1,
                std::cmp::Ordering::Greater => hi = mid,
                std::cmp::Ordering::Equal => return Ok(Ok(mid)),
            }
        }
        Ok(Err(lo))
    }

    /// Locate `ext`'s entry as `(data, entry offset)`.
    fn ext_entry(&self, ext: &MiniTableExtension) -> Result<Option<(RawArray, usize, ArenaRef, usize)>, AccessError> {
        if ext.extendee != self.table_id {
            return Err(AccessError::NoSuchField {
                number: ext.number(),
            });
        }
        let Some(raw) = self.ext_array()? else {
            return Ok(None);
        };
        let Ok(index) = self.ext_search(&raw, ext.number())? else {
            return Ok(None);
        };
        let (data, at) = raw.element(self.arena, index)?;
        if slot::read_u32(self.arena, data, at + EXT_CODE_AT)? != ext_code(&ext.field) {
            return Err(Self::mismatch(&ext.field));
        }
        Ok(Some((raw, index, data, at)))
    }

    /// Whether extension `ext` is set on this message.
    pub fn has_extension(&self, ext: &MiniTableExtension) -> Result<bool, AccessError> {
        let Some((_, _, data, at)) = self.ext_entry(ext)? else {
            return Ok(false);
        };
        if ext.field.mode == FieldMode::Array {
            let r = slot::read_ref(self.arena, data, at + EXT_SLOT_AT)?;
            let raw = RawArray {
                header: r,
                elem_size: 1,
            };
            return Ok(!r.is_null() && raw.len(self.arena)? > 0);
        }
        Ok(true)
    }

    /// The value of extension `ext`, or its type's default.
    pub fn get_extension(&self, ext: &MiniTableExtension) -> Result<Value, AccessError> {
        match self.ext_entry(ext)? {
            Some((_, _, data, at)) => self.read_ext_slot(&ext.field, data, at),
            None => Ok(Value::default_for_field(ext.field.field_type, ext.field.mode)),
        }
    }

    fn read_ext_slot(&self, field: &MiniTableField, data: ArenaRef, at: usize) -> Result<Value, AccessError> {
        let at = at + EXT_SLOT_AT;
        match field.mode {
            FieldMode::Array => {
                let r = slot::read_ref(self.arena, data, at)?;
                Ok(Value::Array((!r.is_null()).then_some(ArrayPtr(r))))
            }
            _ => slot::read_value(self.arena, data, at, field.field_type, field.number),
        }
    }

    /// Set extension `ext`. Setting an aggregate to `None` clears it.
    pub fn set_extension(&self, ext: &MiniTableExtension, value: Value) -> Result<(), AccessError> {
        let value = Self::check_value(&ext.field, value)?;
        if matches!(value, Value::Message(None) | Value::Array(None)) {
            return self.clear_extension(ext);
        }
        let (data, at) = match self.ext_entry(ext)? {
            Some((_, _, data, at)) => (data, at),
            None => {
                let raw = match self.ext_array()? {
                    Some(raw) => raw,
                    None => {
                        let raw = RawArray::alloc(self.arena, EXT_ENTRY_SIZE)?;
                        slot::write_ref(self.arena, self.base(), EXTENSIONS_SLOT, raw.header)?;
                        raw
                    }
                };
                let pos = match self.ext_search(&raw, ext.number())? {
                    Ok(i) | Err(i) => i,
                };
                let (data, at) = raw.insert_gap(self.arena, pos)?;
                slot::write_u32(self.arena, data, at, ext.number())?;
                slot::write_u32(self.arena, data, at + EXT_CODE_AT, ext_code(&ext.field))?;
                slot::write_u32(self.arena, data, at + EXT_SUB_AT, ext.sub.map_or(NO_SUB, |t| t.0))?;
                (data, at)
            }
        };
        slot::write_value(self.arena, data, at + EXT_SLOT_AT, &value)
    }

    /// Remove extension `ext` from this message.
    pub fn clear_extension(&self, ext: &MiniTableExtension) -> Result<(), AccessError> {
        if let Some((raw, index, _, _)) = self.ext_entry(ext)? {
            raw.remove(self.arena, index)?;
        }
        Ok(())
    }

    /// The existing aggregate in extension `ext`, or a new empty one.
    pub fn mutable_extension(&self, ext: &MiniTableExtension, arena: Option<&Arena>) -> Result<Value, AccessError> {
        let current = self.get_extension(ext)?;
        match current {
            Value::Message(Some(_)) | Value::Array(Some(_)) => return Ok(current),
            Value::Message(None) | Value::Array(None) => {}
            _ => return Err(Self::mismatch(&ext.field)),
        }
        let arena = arena.ok_or(AccessError::Absent {
            number: ext.number(),
        })?;
        let fresh = match ext.field.mode {
            FieldMode::Array => {
                let raw = RawArray::alloc(arena, ext.field.field_type.slot_size())?;
                Value::Array(Some(ArrayPtr(raw.header)))
            }
            _ => {
                let sub = ext.sub.ok_or(AccessError::UnlinkedSubTable {
                    number: ext.number(),
                })?;
                Value::Message(Some(Message::new(arena, self.tables, sub)?.ptr()))
            }
        };
        self.set_extension(ext, fresh.clone())?;
        Ok(fresh)
    }

    /// Every extension set on this message, in number order.
    pub fn extensions(&self) -> Result<Vec<(MiniTableExtension, Value)>, AccessError> {
        let Some(raw) = self.ext_array()? else {
            return Ok(Vec::new());
        };
        let mut out = Vec::new();
        for index in 0..raw.len(self.arena)? {
            let (data, at) = raw.element(self.arena, index)?;
            let number = slot::read_u32(self.arena, data, at)?;
            let code = slot::read_u32(self.arena, data, at + EXT_CODE_AT)?;
            let sub = slot::read_u32(self.arena, data, at + EXT_SUB_AT)?;
            let corrupt = || AccessError::CorruptExtension { number };
            let field_type = FieldType::from_code(code & 0x1f).ok_or_else(corrupt)?;
            let mode = FieldMode::from_code((code >> 5) & 0x3).ok_or_else(corrupt)?;
            let field = MiniTableField {
                number,
                field_type,
                mode,
                packed: (code >> 7) & 1 == 1,
                offset: 0,
                presence: Presence::Implicit,
                sub: (field_type == FieldType::Message).then_some(0),
            };
            let ext = MiniTableExtension {
                field,
                extendee: self.table_id,
                sub: (sub != NO_SUB).then_some(TableId(sub)),
            };
            let value = self.read_ext_slot(&field, data, at)?;
            out.push((ext, value));
        }
        Ok(out)
    }
}

impl fmt::Debug for Message<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("table", &self.table_id)
            .field("ptr", &self.ptr.0)
            .finish()
    }
}

/// Iterator over a message's present fields, in ascending number order.
pub struct PresentFields<'a> {
    msg: Message<'a>,
    index: usize,
}

impl<'a> Iterator for PresentFields<'a> {
    type Item = Result<(&'a MiniTableField, Value), AccessError>;

    fn next(&mut self) -> Option<Self::Item> {
        let fields: &'a [MiniTableField] = self.msg.table.fields();
        while let Some(field) = fields.get(self.index) {
            self.index += 1;
            match self.msg.has_field(field) {
                Ok(true) => return Some(self.msg.get_field(field).map(|v| (field, v))),
                Ok(false) => {}
                Err(e) => return Some(Err(e)),
            }
        }
        None
    }
}
