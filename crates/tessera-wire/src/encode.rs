//! Message to wire payload.
//!
//! Present fields and set extensions are written in ascending number order,
//! followed by the preserved unknown bytes. Submessages and packed runs are
//! encoded into a scratch buffer first and then length-prefixed.

use tessera_core::{FieldMode, FieldType, Tag, WireType};
use tessera_layout::{MiniTableField, TableId};
use tessera_message::{AccessError, Array, Map, Message, Value};

use crate::config::EncodeOptions;
use crate::error::EncodeError;
use crate::varint::{put_varint, zigzag_encode32, zigzag_encode64};

/// Encode `msg` into a new buffer.
pub fn encode(msg: Message<'_>, options: &EncodeOptions) -> Result<Vec<u8>, EncodeError> {
    let mut out = Vec::new();
    encode_into(msg, options, &mut out)?;
    Ok(out)
}

/// Encode `msg`, appending to `out`.
pub fn encode_into(msg: Message<'_>, options: &EncodeOptions, out: &mut Vec<u8>) -> Result<(), EncodeError> {
    options.validate()?;
    Encoder { options }.message(out, msg, options.max_depth)
}

fn put_tag(out: &mut Vec<u8>, number: u32, wire_type: WireType) {
    put_varint(out, u64::from(Tag::new(number, wire_type).to_raw()));
}

fn put_delimited(out: &mut Vec<u8>, bytes: &[u8]) {
    put_varint(out, bytes.len() as u64);
    out.extend_from_slice(bytes);
}

/// Write the payload of one non-message value (no tag).
fn put_scalar(out: &mut Vec<u8>, ty: FieldType, number: u32, value: &Value) -> Result<(), EncodeError> {
    match (ty, value) {
        (FieldType::Bool, Value::Bool(b)) => out.push(*b as u8),
        (FieldType::Int32, Value::Int32(n)) | (FieldType::Enum, Value::Enum(n)) => {
            put_varint(out, *n as i64 as u64)
        }
        (FieldType::SInt32, Value::Int32(n)) => put_varint(out, u64::from(zigzag_encode32(*n))),
        (FieldType::SFixed32, Value::Int32(n)) => out.extend_from_slice(&n.to_le_bytes()),
        (FieldType::Int64, Value::Int64(n)) => put_varint(out, *n as u64),
        (FieldType::SInt64, Value::Int64(n)) => put_varint(out, zigzag_encode64(*n)),
        (FieldType::SFixed64, Value::Int64(n)) => out.extend_from_slice(&n.to_le_bytes()),
        (FieldType::UInt32, Value::UInt32(n)) => put_varint(out, u64::from(*n)),
        (FieldType::Fixed32, Value::UInt32(n)) => out.extend_from_slice(&n.to_le_bytes()),
        (FieldType::UInt64, Value::UInt64(n)) => put_varint(out, *n),
        (FieldType::Fixed64, Value::UInt64(n)) => out.extend_from_slice(&n.to_le_bytes()),
        (FieldType::Float, Value::Float(x)) => out.extend_from_slice(&x.to_le_bytes()),
        (FieldType::Double, Value::Double(x)) => out.extend_from_slice(&x.to_le_bytes()),
        (FieldType::String, Value::String(s)) => put_delimited(out, s.as_bytes()),
        (FieldType::Bytes, Value::Bytes(b)) => put_delimited(out, b),
        _ => {
            return Err(AccessError::TypeMismatch {
                number,
                field_type: ty,
                mode: FieldMode::Scalar,
            }
            .into())
        }
    }
    Ok(())
}

/// One thing to write: a table field or an extension, with its value.
struct Entry<'f> {
    field: &'f MiniTableField,
    sub: Option<TableId>,
    value: Value,
}

struct Encoder<'o> {
    options: &'o EncodeOptions,
}

impl Encoder<'_> {
    fn message(&self, out: &mut Vec<u8>, msg: Message<'_>, depth: usize) -> Result<(), EncodeError> {
        if depth == 0 {
            tracing::debug!(limit = self.options.max_depth, "wire encode depth limit reached");
            return Err(EncodeError::DepthExceeded {
                limit: self.options.max_depth,
            });
        }
        let table = msg.table();
        let extensions = msg.extensions()?;
        let mut entries = Vec::new();
        for item in msg.present_fields() {
            let (field, value) = item?;
            entries.push(Entry {
                field,
                sub: table.sub_table(field),
                value,
            });
        }
        for (ext, value) in &extensions {
            entries.push(Entry {
                field: &ext.field,
                sub: ext.sub,
                value: value.clone(),
            });
        }
        entries.sort_by_key(|e| e.field.number);

        for entry in &entries {
            self.entry(out, msg, entry, depth)?;
        }
        if !self.options.skip_unknown {
            out.extend_from_slice(&msg.unknown()?);
        }
        Ok(())
    }

    fn entry(&self, out: &mut Vec<u8>, msg: Message<'_>, entry: &Entry<'_>, depth: usize) -> Result<(), EncodeError> {
        let field = entry.field;
        let ty = field.field_type;
        match field.mode {
            FieldMode::Scalar => self.single(out, msg, field.number, ty, entry.sub, &entry.value, depth),
            FieldMode::Array => {
                let Value::Array(Some(ptr)) = entry.value else {
                    return Ok(());
                };
                let array = Array::attach(msg.arena(), msg.tables(), ty, entry.sub, ptr);
                if array.is_empty()? {
                    return Ok(());
                }
                if field.packed && ty.is_packable() {
                    let mut run = Vec::new();
                    for value in array.iter() {
                        put_scalar(&mut run, ty, field.number, &value?)?;
                    }
                    put_tag(out, field.number, WireType::Delimited);
                    put_delimited(out, &run);
                } else {
                    for value in array.iter() {
                        self.single(out, msg, field.number, ty, entry.sub, &value?, depth)?;
                    }
                }
                Ok(())
            }
            FieldMode::Map => {
                let Value::Map(Some(ptr)) = entry.value else {
                    return Ok(());
                };
                let entry_table = entry.sub.ok_or(AccessError::UnlinkedSubTable {
                    number: field.number,
                })?;
                let map = Map::attach(msg.arena(), msg.tables(), entry_table, ptr);
                for i in 0..map.len()? {
                    let mut scratch = Vec::new();
                    self.message(&mut scratch, map.entry(i)?, depth - 1)?;
                    put_tag(out, field.number, WireType::Delimited);
                    put_delimited(out, &scratch);
                }
                Ok(())
            }
        }
    }

    /// Write one tagged value of a singular field or array element.
    #[allow(clippy::too_many_arguments)]
    fn single(
        &self,
        out: &mut Vec<u8>,
        msg: Message<'_>,
        number: u32,
        ty: FieldType,
        sub: Option<TableId>,
        value: &Value,
        depth: usize,
    ) -> Result<(), EncodeError> {
        if ty != FieldType::Message {
            put_tag(out, number, ty.wire_type());
            return put_scalar(out, ty, number, value);
        }
        let Value::Message(Some(ptr)) = value else {
            return Ok(());
        };
        let sub = sub.ok_or(AccessError::UnlinkedSubTable { number })?;
        let child = Message::attach(msg.arena(), msg.tables(), sub, *ptr)?;
        let mut scratch = Vec::new();
        self.message(&mut scratch, child, depth - 1)?;
        put_tag(out, number, WireType::Delimited);
        put_delimited(out, &scratch);
        Ok(())
    }
}
