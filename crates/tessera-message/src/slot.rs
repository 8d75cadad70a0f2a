//! Reading and writing typed values in raw storage slots.
//!
//! A slot is `(base, at)`: an arena reference plus a byte offset into it.
//! Values are stored little-endian; indirect values are 16-byte
//! [`ArenaRef`] records.

use tessera_arena::{Arena, ArenaRef};
use tessera_core::FieldType;

use crate::error::AccessError;
use crate::ptr::{MessagePtr, STORAGE_ALIGN};
use crate::value::Value;

pub(crate) fn read_array<const N: usize>(
    arena: &Arena,
    base: ArenaRef,
    at: usize,
) -> Result<[u8; N], AccessError> {
    let mut buf = [0u8; N];
    arena.read(base, at, &mut buf)?;
    Ok(buf)
}

pub(crate) fn read_u32(arena: &Arena, base: ArenaRef, at: usize) -> Result<u32, AccessError> {
    Ok(u32::from_le_bytes(read_array(arena, base, at)?))
}

pub(crate) fn write_u32(
    arena: &Arena,
    base: ArenaRef,
    at: usize,
    value: u32,
) -> Result<(), AccessError> {
    arena.write(base, at, &value.to_le_bytes())?;
    Ok(())
}

pub(crate) fn read_ref(arena: &Arena, base: ArenaRef, at: usize) -> Result<ArenaRef, AccessError> {
    Ok(ArenaRef::from_bytes(&read_array(arena, base, at)?))
}

pub(crate) fn write_ref(
    arena: &Arena,
    base: ArenaRef,
    at: usize,
    r: ArenaRef,
) -> Result<(), AccessError> {
    arena.write(base, at, &r.to_bytes())?;
    Ok(())
}

pub(crate) fn zero(arena: &Arena, base: ArenaRef, at: usize, len: usize) -> Result<(), AccessError> {
    let zeros = [0u8; 64];
    let mut done = 0;
    while done < len {
        let n = (len - done).min(zeros.len());
        arena.write(base, at + done, &zeros[..n])?;
        done += n;
    }
    Ok(())
}

pub(crate) fn is_nonzero(
    arena: &Arena,
    base: ArenaRef,
    at: usize,
    len: usize,
) -> Result<bool, AccessError> {
    let r = base
        .narrow(at, len)
        .ok_or(AccessError::IndexOutOfBounds {
            index: at + len,
            len: base.len(),
        })?;
    Ok(arena.with_bytes(r, |b| b.iter().any(|&x| x != 0))?)
}

/// Read the value of a singular `ty` slot.
pub(crate) fn read_value(
    arena: &Arena,
    base: ArenaRef,
    at: usize,
    ty: FieldType,
    number: u32,
) -> Result<Value, AccessError> {
    Ok(match ty {
        FieldType::Bool => Value::Bool(read_array::<1>(arena, base, at)?[0] != 0),
        FieldType::Int32 | FieldType::SInt32 | FieldType::SFixed32 => {
            Value::Int32(i32::from_le_bytes(read_array(arena, base, at)?))
        }
        FieldType::Enum => Value::Enum(i32::from_le_bytes(read_array(arena, base, at)?)),
        FieldType::UInt32 | FieldType::Fixed32 => {
            Value::UInt32(u32::from_le_bytes(read_array(arena, base, at)?))
        }
        FieldType::Int64 | FieldType::SInt64 | FieldType::SFixed64 => {
            Value::Int64(i64::from_le_bytes(read_array(arena, base, at)?))
        }
        FieldType::UInt64 | FieldType::Fixed64 => {
            Value::UInt64(u64::from_le_bytes(read_array(arena, base, at)?))
        }
        FieldType::Float => Value::Float(f32::from_le_bytes(read_array(arena, base, at)?)),
        FieldType::Double => Value::Double(f64::from_le_bytes(read_array(arena, base, at)?)),
        FieldType::String => {
            let bytes = read_bytes(arena, base, at)?;
            Value::String(String::from_utf8(bytes).map_err(|_| AccessError::InvalidUtf8 { number })?)
        }
        FieldType::Bytes => Value::Bytes(read_bytes(arena, base, at)?),
        FieldType::Message => {
            let r = read_ref(arena, base, at)?;
            Value::Message((!r.is_null()).then_some(MessagePtr(r)))
        }
    })
}

/// Copy the bytes referenced by a string or bytes slot.
pub(crate) fn read_bytes(arena: &Arena, base: ArenaRef, at: usize) -> Result<Vec<u8>, AccessError> {
    let r = read_ref(arena, base, at)?;
    if r.is_null() {
        return Ok(Vec::new());
    }
    Ok(arena.to_vec(r)?)
}

/// Write a value already coerced to `ty` into a singular slot.
///
/// Strings and bytes are copied into `arena`; submessage references must
/// already resolve through it.
pub(crate) fn write_value(
    arena: &Arena,
    base: ArenaRef,
    at: usize,
    value: &Value,
) -> Result<(), AccessError> {
    match value {
        Value::Bool(b) => arena.write(base, at, &[*b as u8])?,
        Value::Int32(n) | Value::Enum(n) => arena.write(base, at, &n.to_le_bytes())?,
        Value::UInt32(n) => arena.write(base, at, &n.to_le_bytes())?,
        Value::Int64(n) => arena.write(base, at, &n.to_le_bytes())?,
        Value::UInt64(n) => arena.write(base, at, &n.to_le_bytes())?,
        Value::Float(x) => arena.write(base, at, &x.to_le_bytes())?,
        Value::Double(x) => arena.write(base, at, &x.to_le_bytes())?,
        Value::String(s) => write_bytes(arena, base, at, s.as_bytes())?,
        Value::Bytes(b) => write_bytes(arena, base, at, b)?,
        Value::Message(p) => write_ref(arena, base, at, checked(arena, p.map(|p| p.0))?)?,
        Value::Array(p) => write_ref(arena, base, at, checked(arena, p.map(|p| p.0))?)?,
        Value::Map(p) => write_ref(arena, base, at, checked(arena, p.map(|p| p.0))?)?,
    }
    Ok(())
}

fn checked(arena: &Arena, r: Option<ArenaRef>) -> Result<ArenaRef, AccessError> {
    match r {
        None => Ok(ArenaRef::NULL),
        Some(r) if arena.resolves(r) => Ok(r),
        Some(_) => Err(AccessError::ForeignArena),
    }
}

fn write_bytes(arena: &Arena, base: ArenaRef, at: usize, bytes: &[u8]) -> Result<(), AccessError> {
    let r = if bytes.is_empty() {
        ArenaRef::NULL
    } else {
        arena.alloc_copy(bytes, 1)?
    };
    write_ref(arena, base, at, r)
}

/// Allocate zeroed storage aligned for any slot.
pub(crate) fn alloc_storage(arena: &Arena, size: usize) -> Result<ArenaRef, AccessError> {
    Ok(arena.alloc(size, STORAGE_ALIGN)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_slots_round_trip() {
        let arena = Arena::new();
        let base = alloc_storage(&arena, 64).unwrap();
        let cases = [
            (FieldType::Bool, Value::Bool(true)),
            (FieldType::SInt32, Value::Int32(-7)),
            (FieldType::Fixed64, Value::UInt64(u64::MAX)),
            (FieldType::Double, Value::Double(2.5)),
            (FieldType::Enum, Value::Enum(3)),
            (FieldType::String, Value::String("héllo".into())),
            (FieldType::Bytes, Value::Bytes(vec![0, 1, 2])),
        ];
        for (ty, value) in cases {
            write_value(&arena, base, 16, &value).unwrap();
            assert_eq!(read_value(&arena, base, 16, ty, 1).unwrap(), value);
        }
    }

    #[test]
    fn empty_string_stored_as_null() {
        let arena = Arena::new();
        let base = alloc_storage(&arena, 16).unwrap();
        write_value(&arena, base, 0, &Value::String(String::new())).unwrap();
        assert!(read_ref(&arena, base, 0).unwrap().is_null());
        assert_eq!(arena.bytes_used(), 16);
    }

    #[test]
    fn foreign_message_ref_rejected() {
        let a = Arena::new();
        let b = Arena::new();
        let base = alloc_storage(&a, 16).unwrap();
        let other = alloc_storage(&b, 8).unwrap();
        assert_eq!(
            write_value(&a, base, 0, &Value::Message(Some(MessagePtr(other)))),
            Err(AccessError::ForeignArena)
        );
    }

    #[test]
    fn zero_and_nonzero() {
        let arena = Arena::new();
        let base = alloc_storage(&arena, 100).unwrap();
        arena.write(base, 90, &[1]).unwrap();
        assert!(is_nonzero(&arena, base, 80, 16).unwrap());
        zero(&arena, base, 0, 100).unwrap();
        assert!(!is_nonzero(&arena, base, 0, 100).unwrap());
    }
}
