//! Repeated-field storage.
//!
//! An array is a 24-byte header `[data ref 16][len u32][reserved u32]`. The
//! data reference covers the whole capacity; `len` elements of fixed width
//! are live. Growing allocates a larger data block, copies the live
//! elements, and repoints the header; the old block stays in the arena as
//! garbage until the arena is dropped.

use tessera_arena::{Arena, ArenaRef};
use tessera_core::FieldType;
use tessera_layout::{TableId, TableSet};

use crate::error::AccessError;
use crate::message::Message;
use crate::ptr::ArrayPtr;
use crate::slot;
use crate::value::Value;

/// Size of an array header.
pub const ARRAY_HEADER_SIZE: usize = 24;

const LEN_AT: usize = 16;
const MIN_CAPACITY: usize = 4;

/// Untyped array operations over fixed-width elements.
#[derive(Clone, Copy, Debug)]
pub(crate) struct RawArray {
    pub(crate) header: ArenaRef,
    pub(crate) elem_size: usize,
}

impl RawArray {
    pub(crate) fn alloc(arena: &Arena, elem_size: usize) -> Result<Self, AccessError> {
        let header = slot::alloc_storage(arena, ARRAY_HEADER_SIZE)?;
        Ok(Self { header, elem_size })
    }

    pub(crate) fn len(&self, arena: &Arena) -> Result<usize, AccessError> {
        Ok(slot::read_u32(arena, self.header, LEN_AT)? as usize)
    }

    pub(crate) fn data(&self, arena: &Arena) -> Result<ArenaRef, AccessError> {
        slot::read_ref(arena, self.header, 0)
    }

    fn capacity(&self, arena: &Arena) -> Result<usize, AccessError> {
        let data = self.data(arena)?;
        Ok(if data.is_null() {
            0
        } else {
            data.len() / self.elem_size
        })
    }

    /// Ensure room for `additional` more elements; returns the data reference.
    pub(crate) fn reserve(&self, arena: &Arena, additional: usize) -> Result<ArenaRef, AccessError> {
        let len = self.len(arena)?;
        let data = self.data(arena)?;
        let cap = self.capacity(arena)?;
        let needed = len
            .checked_add(additional)
            .ok_or(AccessError::IndexOutOfBounds {
                index: usize::MAX,
                len,
            })?;
        if needed <= cap {
            return Ok(data);
        }
        let new_cap = needed.max(cap * 2).max(MIN_CAPACITY);
        let bytes = new_cap
            .checked_mul(self.elem_size)
            .ok_or(AccessError::IndexOutOfBounds {
                index: new_cap,
                len,
            })?;
        let fresh = slot::alloc_storage(arena, bytes)?;
        if len > 0 {
            let live = data
                .narrow(0, len * self.elem_size)
                .ok_or(AccessError::IndexOutOfBounds { index: len, len: cap })?;
            let old = arena.to_vec(live)?;
            arena.write(fresh, 0, &old)?;
        }
        slot::write_ref(arena, self.header, 0, fresh)?;
        Ok(fresh)
    }

    pub(crate) fn set_len(&self, arena: &Arena, len: usize) -> Result<(), AccessError> {
        slot::write_u32(arena, self.header, LEN_AT, len as u32)
    }

    /// Bounds-check `index` and return `(data, byte offset)` of the element.
    pub(crate) fn element(&self, arena: &Arena, index: usize) -> Result<(ArenaRef, usize), AccessError> {
        let len = self.len(arena)?;
        if index >= len {
            return Err(AccessError::IndexOutOfBounds { index, len });
        }
        Ok((self.data(arena)?, index * self.elem_size))
    }

    /// Append the raw bytes of whole elements.
    pub(crate) fn extend_raw(&self, arena: &Arena, bytes: &[u8]) -> Result<(), AccessError> {
        let count = bytes.len() / self.elem_size;
        if count == 0 {
            return Ok(());
        }
        let data = self.reserve(arena, count)?;
        let len = self.len(arena)?;
        arena.write(data, len * self.elem_size, bytes)?;
        self.set_len(arena, len + count)
    }

    /// Make room for one element at `index`, shifting later elements up.
    pub(crate) fn insert_gap(&self, arena: &Arena, index: usize) -> Result<(ArenaRef, usize), AccessError> {
        let data = self.reserve(arena, 1)?;
        let len = self.len(arena)?;
        if index > len {
            return Err(AccessError::IndexOutOfBounds { index, len });
        }
        let at = index * self.elem_size;
        if index < len {
            let tail = data
                .narrow(at, (len - index) * self.elem_size)
                .ok_or(AccessError::IndexOutOfBounds { index, len })?;
            let moved = arena.to_vec(tail)?;
            arena.write(data, at + self.elem_size, &moved)?;
        }
        slot::zero(arena, data, at, self.elem_size)?;
        self.set_len(arena, len + 1)?;
        Ok((data, at))
    }

    /// Remove the element at `index`, shifting later elements down.
    pub(crate) fn remove(&self, arena: &Arena, index: usize) -> Result<(), AccessError> {
        let (data, at) = self.element(arena, index)?;
        let len = self.len(arena)?;
        if index + 1 < len {
            let tail = data
                .narrow(at + self.elem_size, (len - index - 1) * self.elem_size)
                .ok_or(AccessError::IndexOutOfBounds { index, len })?;
            let moved = arena.to_vec(tail)?;
            arena.write(data, at, &moved)?;
        }
        slot::zero(arena, data, (len - 1) * self.elem_size, self.elem_size)?;
        self.set_len(arena, len - 1)
    }

    /// Copy out the live bytes.
    pub(crate) fn to_vec(&self, arena: &Arena) -> Result<Vec<u8>, AccessError> {
        let len = self.len(arena)?;
        if len == 0 {
            return Ok(Vec::new());
        }
        let data = self.data(arena)?;
        let live = data
            .narrow(0, len * self.elem_size)
            .ok_or(AccessError::IndexOutOfBounds { index: len, len: 0 })?;
        Ok(arena.to_vec(live)?)
    }
}

/// A view of one repeated field's values.
#[derive(Clone, Copy)]
pub struct Array<'a> {
    arena: &'a Arena,
    tables: &'a TableSet,
    field_type: FieldType,
    sub: Option<TableId>,
    raw: RawArray,
}

impl<'a> Array<'a> {
    /// View an existing array header of `field_type` elements.
    ///
    /// Accesses fail with [`AccessError::ForeignArena`] if `arena` cannot
    /// reach `ptr`.
    pub fn attach(
        arena: &'a Arena,
        tables: &'a TableSet,
        field_type: FieldType,
        sub: Option<TableId>,
        ptr: ArrayPtr,
    ) -> Self {
        Self {
            arena,
            tables,
            field_type,
            sub,
            raw: RawArray {
                header: ptr.0,
                elem_size: field_type.slot_size(),
            },
        }
    }

    /// Allocate an empty, unattached array of `field_type` elements.
    pub fn new(
        arena: &'a Arena,
        tables: &'a TableSet,
        field_type: FieldType,
        sub: Option<TableId>,
    ) -> Result<Self, AccessError> {
        let raw = RawArray::alloc(arena, field_type.slot_size())?;
        Ok(Self::attach(arena, tables, field_type, sub, ArrayPtr(raw.header)))
    }

    /// The array's arena reference.
    pub fn ptr(&self) -> ArrayPtr {
        ArrayPtr(self.raw.header)
    }

    /// Element type.
    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    /// Number of elements.
    pub fn len(&self) -> Result<usize, AccessError> {
        self.raw.len(self.arena)
    }

    /// Returns `true` if the array has no elements.
    pub fn is_empty(&self) -> Result<bool, AccessError> {
        Ok(self.len()? == 0)
    }

    /// Read element `index`.
    pub fn get(&self, index: usize) -> Result<Value, AccessError> {
        let (data, at) = self.raw.element(self.arena, index)?;
        slot::read_value(self.arena, data, at, self.field_type, 0)
    }

    /// Overwrite element `index`.
    pub fn set(&self, index: usize, value: Value) -> Result<(), AccessError> {
        let value = value.coerce(self.field_type, 0)?;
        let (data, at) = self.raw.element(self.arena, index)?;
        slot::write_value(self.arena, data, at, &value)
    }

    /// Append a value.
    pub fn push(&self, value: Value) -> Result<(), AccessError> {
        let value = value.coerce(self.field_type, 0)?;
        let data = self.raw.reserve(self.arena, 1)?;
        let len = self.len()?;
        slot::write_value(self.arena, data, len * self.raw.elem_size, &value)?;
        self.raw.set_len(self.arena, len + 1)
    }

    /// Allocate a fresh submessage and append it (message arrays only).
    pub fn push_message(&self) -> Result<Message<'a>, AccessError> {
        let table = self.sub.ok_or(AccessError::UnlinkedSubTable { number: 0 })?;
        let msg = Message::new(self.arena, self.tables, table)?;
        self.push(Value::Message(Some(msg.ptr())))?;
        Ok(msg)
    }

    /// View element `index` as a message (message arrays only).
    pub fn message(&self, index: usize) -> Result<Message<'a>, AccessError> {
        let table = self.sub.ok_or(AccessError::UnlinkedSubTable { number: 0 })?;
        match self.get(index)? {
            Value::Message(Some(ptr)) => Message::attach(self.arena, self.tables, table, ptr),
            _ => Err(AccessError::IndexOutOfBounds {
                index,
                len: self.len()?,
            }),
        }
    }

    /// Drop every element. Storage is kept for reuse.
    pub fn clear(&self) -> Result<(), AccessError> {
        self.raw.set_len(self.arena, 0)
    }

    /// Remove the last element.
    pub fn pop(&self) -> Result<Option<Value>, AccessError> {
        let len = self.len()?;
        if len == 0 {
            return Ok(None);
        }
        let value = self.get(len - 1)?;
        self.raw.set_len(self.arena, len - 1)?;
        Ok(Some(value))
    }

    /// Iterate over the elements.
    pub fn iter(&self) -> ArrayIter<'a> {
        ArrayIter {
            array: *self,
            index: 0,
        }
    }

    /// Copy every element out.
    pub fn to_vec(&self) -> Result<Vec<Value>, AccessError> {
        self.iter().collect()
    }
}

/// Iterator over an [`Array`]'s elements.
pub struct ArrayIter<'a> {
    array: Array<'a>,
    index: usize,
}

impl Iterator for ArrayIter<'_> {
    type Item = Result<Value, AccessError>;

    fn next(&mut self) -> Option<Self::Item> {
        let len = match self.array.len() {
            Ok(len) => len,
            Err(e) => return Some(Err(e)),
        };
        if self.index >= len {
            return None;
        }
        let value = self.array.get(self.index);
        self.index += 1;
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_get_set() {
        let arena = Arena::new();
        let tables = TableSet::new();
        let arr = Array::new(&arena, &tables, FieldType::SInt64, None).unwrap();
        for i in 0..10 {
            arr.push(Value::Int64(i * 3)).unwrap();
        }
        assert_eq!(arr.len().unwrap(), 10);
        assert_eq!(arr.get(9).unwrap(), Value::Int64(27));
        arr.set(0, Value::Int64(-1)).unwrap();
        assert_eq!(arr.get(0).unwrap(), Value::Int64(-1));
        assert!(matches!(
            arr.get(10),
            Err(AccessError::IndexOutOfBounds { index: 10, len: 10 })
        ));
    }

    #[test]
    fn growth_keeps_elements() {
        let arena = Arena::new();
        let tables = TableSet::new();
        let arr = Array::new(&arena, &tables, FieldType::String, None).unwrap();
        let words: Vec<String> = (0..100).map(|i| format!("w{i}")).collect();
        for w in &words {
            arr.push(Value::String(w.clone())).unwrap();
        }
        let got: Vec<Value> = arr.to_vec().unwrap();
        let want: Vec<Value> = words.into_iter().map(Value::String).collect();
        assert_eq!(got, want);
    }

    #[test]
    fn clear_and_pop() {
        let arena = Arena::new();
        let tables = TableSet::new();
        let arr = Array::new(&arena, &tables, FieldType::Bool, None).unwrap();
        arr.push(Value::Bool(true)).unwrap();
        arr.push(Value::Bool(false)).unwrap();
        assert_eq!(arr.pop().unwrap(), Some(Value::Bool(false)));
        arr.clear().unwrap();
        assert!(arr.is_empty().unwrap());
        assert_eq!(arr.pop().unwrap(), None);
    }

    #[test]
    fn type_mismatch_rejected() {
        let arena = Arena::new();
        let tables = TableSet::new();
        let arr = Array::new(&arena, &tables, FieldType::Int32, None).unwrap();
        assert!(matches!(
            arr.push(Value::Double(1.0)),
            Err(AccessError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn raw_insert_and_remove_shift() {
        let arena = Arena::new();
        let raw = RawArray::alloc(&arena, 1).unwrap();
        raw.extend_raw(&arena, b"ace").unwrap();
        let (data, at) = raw.insert_gap(&arena, 1).unwrap();
        arena.write(data, at, b"b").unwrap();
        assert_eq!(raw.to_vec(&arena).unwrap(), b"abce");
        raw.remove(&arena, 3).unwrap();
        raw.remove(&arena, 0).unwrap();
        assert_eq!(raw.to_vec(&arena).unwrap(), b"bc");
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn behaves_like_vec(values in prop::collection::vec(any::<u32>(), 0..200)) {
                let arena = Arena::new();
                let tables = TableSet::new();
                let arr = Array::new(&arena, &tables, FieldType::Fixed32, None).unwrap();
                for v in &values {
                    arr.push(Value::UInt32(*v)).unwrap();
                }
                let got: Vec<Value> = arr.to_vec().unwrap();
                let want: Vec<Value> = values.iter().map(|v| Value::UInt32(*v)).collect();
                prop_assert_eq!(got, want);
            }
        }
    }
}
