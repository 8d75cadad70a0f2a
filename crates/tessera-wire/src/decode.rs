//! Wire payload to message.
//!
//! Fields are looked up in the message's mini-table as their tags arrive.
//! Singular fields overwrite, singular submessages merge, repeated fields
//! append (packed and unpacked runs are both accepted), and map entries are
//! inserted last-wins. Numbers the table does not know are tried against the
//! extension registry, then kept verbatim in the unknown span.

use smallvec::SmallVec;
use tessera_arena::Arena;
use tessera_core::{FieldMode, FieldType, Tag, WireType};
use tessera_layout::{ExtensionRegistry, MiniTableExtension, MiniTableField, TableId, TableSet};
use tessera_message::{AccessError, Array, Message, Value};

use crate::config::DecodeOptions;
use crate::error::{DecodeError, ParseErrorKind};
use crate::varint::{zigzag_decode32, zigzag_decode64, Reader};

/// Decode `input` into `msg`, merging with whatever it already holds.
pub fn decode(input: &[u8], msg: Message<'_>, options: &DecodeOptions) -> Result<(), DecodeError> {
    run(input, msg, None, options)
}

/// [`decode`], resolving extension numbers through `extensions`.
pub fn decode_with_extensions(
    input: &[u8],
    msg: Message<'_>,
    extensions: &ExtensionRegistry,
    options: &DecodeOptions,
) -> Result<(), DecodeError> {
    run(input, msg, Some(extensions), options)
}

/// Allocate a fresh instance of `table` in `arena` and decode into it.
///
/// On error the partially decoded message is discarded with the error; its
/// storage stays in the arena.
pub fn decode_new<'a>(
    input: &[u8],
    arena: &'a Arena,
    tables: &'a TableSet,
    table: TableId,
    options: &DecodeOptions,
) -> Result<Message<'a>, DecodeError> {
    let msg = Message::new(arena, tables, table)?;
    decode(input, msg, options)?;
    Ok(msg)
}

fn run(
    input: &[u8],
    msg: Message<'_>,
    extensions: Option<&ExtensionRegistry>,
    options: &DecodeOptions,
) -> Result<(), DecodeError> {
    options.validate()?;
    let decoder = Decoder {
        input,
        extensions,
        options,
    };
    decoder
        .message(msg, 0, input.len(), options.max_depth)
        .inspect_err(|e| match e {
            DecodeError::Parse { offset, kind } => {
                tracing::debug!(offset, %kind, table = %msg.table_id(), "wire decode failed");
            }
            other => tracing::debug!(error = %other, table = %msg.table_id(), "wire decode failed"),
        })
}

/// Where a decoded value goes: a table field or an extension.
#[derive(Clone, Copy)]
enum Target<'t> {
    Field(&'t MiniTableField),
    Extension(&'t MiniTableExtension),
}

impl Target<'_> {
    fn set(self, msg: Message<'_>, value: Value) -> Result<(), AccessError> {
        match self {
            Target::Field(f) => msg.set_field(f, value),
            Target::Extension(e) => msg.set_extension(e, value),
        }
    }

    fn sub_message<'a>(self, msg: Message<'a>) -> Result<Message<'a>, AccessError> {
        match self {
            Target::Field(f) => msg.mutable_message(f.number, Some(msg.arena())),
            Target::Extension(e) => match msg.mutable_extension(e, Some(msg.arena()))? {
                Value::Message(Some(ptr)) => {
                    let sub = e.sub.ok_or(AccessError::UnlinkedSubTable {
                        number: e.number(),
                    })?;
                    Message::attach(msg.arena(), msg.tables(), sub, ptr)
                }
                _ => Err(mismatch(&e.field)),
            },
        }
    }

    fn array<'a>(self, msg: Message<'a>) -> Result<Array<'a>, AccessError> {
        match self {
            Target::Field(f) => msg.mutable_array(f.number, Some(msg.arena())),
            Target::Extension(e) => match msg.mutable_extension(e, Some(msg.arena()))? {
                Value::Array(Some(ptr)) => Ok(Array::attach(
                    msg.arena(),
                    msg.tables(),
                    e.field.field_type,
                    e.sub,
                    ptr,
                )),
                _ => Err(mismatch(&e.field)),
            },
        }
    }
}

fn mismatch(field: &MiniTableField) -> AccessError {
    AccessError::TypeMismatch {
        number: field.number,
        field_type: field.field_type,
        mode: field.mode,
    }
}

struct Decoder<'i, 'x> {
    input: &'i [u8],
    extensions: Option<&'x ExtensionRegistry>,
    options: &'x DecodeOptions,
}

impl Decoder<'_, '_> {
    fn depth_exceeded(&self) -> DecodeError {
        tracing::debug!(limit = self.options.max_depth, "wire decode depth limit reached");
        DecodeError::DepthExceeded {
            limit: self.options.max_depth,
        }
    }

    fn message(&self, msg: Message<'_>, start: usize, end: usize, depth: usize) -> Result<(), DecodeError> {
        if depth == 0 {
            return Err(self.depth_exceeded());
        }
        let mut r = Reader::new(self.input, start, end);
        while !r.is_empty() {
            let tag_start = r.pos();
            let raw = r.read_varint()?;
            let tag = Tag::from_raw(raw)
                .ok_or_else(|| DecodeError::parse(tag_start, ParseErrorKind::InvalidTag { raw }))?;
            if tag.wire_type == WireType::EndGroup {
                return Err(DecodeError::parse(
                    tag_start,
                    ParseErrorKind::UnexpectedEndGroup { number: tag.number },
                ));
            }
            if let Some(field) = msg.table().find_field(tag.number) {
                self.field(&mut r, msg, Target::Field(field), field, tag, tag_start, depth)?;
            } else if let Some(ext) = self
                .extensions
                .and_then(|reg| reg.find(msg.table_id(), tag.number))
            {
                self.field(&mut r, msg, Target::Extension(ext), &ext.field, tag, tag_start, depth)?;
            } else {
                self.skip(&mut r, tag)?;
                if self.options.preserve_unknown {
                    msg.append_unknown(r.slice(tag_start, r.pos()))?;
                }
            }
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn field(
        &self,
        r: &mut Reader<'_>,
        msg: Message<'_>,
        target: Target<'_>,
        field: &MiniTableField,
        tag: Tag,
        tag_start: usize,
        depth: usize,
    ) -> Result<(), DecodeError> {
        let ty = field.field_type;
        let wrong_wire = |expected: WireType| {
            DecodeError::parse(
                tag_start,
                ParseErrorKind::WireTypeMismatch {
                    number: field.number,
                    expected,
                    actual: tag.wire_type,
                },
            )
        };
        match field.mode {
            FieldMode::Scalar => {
                if tag.wire_type != ty.wire_type() {
                    return Err(wrong_wire(ty.wire_type()));
                }
                if ty == FieldType::Message {
                    let (start, end) = r.read_delimited()?;
                    let child = target.sub_message(msg)?;
                    self.message(child, start, end, depth - 1)
                } else {
                    let value = self.scalar(r, ty, field.number)?;
                    target.set(msg, value)?;
                    Ok(())
                }
            }
            FieldMode::Array => {
                let packed_run = tag.wire_type == WireType::Delimited && ty.is_packable();
                if !packed_run && tag.wire_type != ty.wire_type() {
                    return Err(wrong_wire(ty.wire_type()));
                }
                let array = target.array(msg)?;
                if packed_run {
                    let (start, end) = r.read_delimited()?;
                    let mut run = Reader::new(self.input, start, end);
                    while !run.is_empty() {
                        array.push(self.scalar(&mut run, ty, field.number)?)?;
                    }
                    Ok(())
                } else if ty == FieldType::Message {
                    let (start, end) = r.read_delimited()?;
                    let child = array.push_message()?;
                    self.message(child, start, end, depth - 1)
                } else {
                    array.push(self.scalar(r, ty, field.number)?)?;
                    Ok(())
                }
            }
            FieldMode::Map => {
                if tag.wire_type != WireType::Delimited {
                    return Err(wrong_wire(WireType::Delimited));
                }
                let (start, end) = r.read_delimited()?;
                let map = msg.mutable_map(field.number, Some(msg.arena()))?;
                let entry = Message::new(msg.arena(), msg.tables(), map.entry_table())?;
                self.message(entry, start, end, depth - 1)?;
                map.insert_entry(entry.ptr())?;
                Ok(())
            }
        }
    }

    /// Read one non-message value of type `ty`.
    fn scalar(&self, r: &mut Reader<'_>, ty: FieldType, number: u32) -> Result<Value, DecodeError> {
        Ok(match ty {
            FieldType::Bool => Value::Bool(r.read_varint()? != 0),
            FieldType::Int32 => Value::Int32(r.read_varint()? as i32),
            FieldType::Int64 => Value::Int64(r.read_varint()? as i64),
            FieldType::UInt32 => Value::UInt32(r.read_varint()? as u32),
            FieldType::UInt64 => Value::UInt64(r.read_varint()?),
            FieldType::SInt32 => Value::Int32(zigzag_decode32(r.read_varint()? as u32)),
            FieldType::SInt64 => Value::Int64(zigzag_decode64(r.read_varint()?)),
            FieldType::Enum => Value::Enum(r.read_varint()? as i32),
            FieldType::Fixed32 => Value::UInt32(r.read_fixed32()?),
            FieldType::SFixed32 => Value::Int32(r.read_fixed32()? as i32),
            FieldType::Float => Value::Float(f32::from_bits(r.read_fixed32()?)),
            FieldType::Fixed64 => Value::UInt64(r.read_fixed64()?),
            FieldType::SFixed64 => Value::Int64(r.read_fixed64()? as i64),
            FieldType::Double => Value::Double(f64::from_bits(r.read_fixed64()?)),
            FieldType::String => {
                let (start, end) = r.read_delimited()?;
                let text = std::str::from_utf8(r.slice(start, end))
                    .map_err(|_| DecodeError::parse(start, ParseErrorKind::InvalidUtf8 { number }))?;
                Value::String(text.to_owned())
            }
            FieldType::Bytes => {
                let (start, end) = r.read_delimited()?;
                Value::Bytes(r.slice(start, end).to_vec())
            }
            FieldType::Message => return Err(AccessError::TypeMismatch {
                number,
                field_type: ty,
                mode: FieldMode::Scalar,
            }
            .into()),
        })
    }

    /// Step over the value of an unrecognised field.
    fn skip(&self, r: &mut Reader<'_>, tag: Tag) -> Result<(), DecodeError> {
        match tag.wire_type {
            WireType::Varint => r.read_varint().map(|_| ()),
            WireType::Fixed64 => r.skip(8),
            WireType::Fixed32 => r.skip(4),
            WireType::Delimited => r.read_delimited().map(|_| ()),
            WireType::StartGroup => self.skip_group(r, tag.number),
            WireType::EndGroup => Err(DecodeError::parse(
                r.pos(),
                ParseErrorKind::UnexpectedEndGroup { number: tag.number },
            )),
        }
    }

    /// Skip a group body through its matching end tag.
    fn skip_group(&self, r: &mut Reader<'_>, number: u32) -> Result<(), DecodeError> {
        let mut open: SmallVec<[u32; 8]> = SmallVec::new();
        open.push(number);
        while let Some(&innermost) = open.last() {
            let at = r.pos();
            let raw = r.read_varint()?;
            let tag = Tag::from_raw(raw)
                .ok_or_else(|| DecodeError::parse(at, ParseErrorKind::InvalidTag { raw }))?;
            match tag.wire_type {
                WireType::StartGroup => {
                    if open.len() >= self.options.max_depth {
                        return Err(self.depth_exceeded());
                    }
                    open.push(tag.number);
                }
                WireType::EndGroup => {
                    if tag.number != innermost {
                        return Err(DecodeError::parse(
                            at,
                            ParseErrorKind::UnexpectedEndGroup { number: tag.number },
                        ));
                    }
                    open.pop();
                }
                WireType::Varint => {
                    r.read_varint()?;
                }
                WireType::Fixed64 => r.skip(8)?,
                WireType::Fixed32 => r.skip(4)?,
                WireType::Delimited => {
                    r.read_delimited()?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_layout::{FieldSpec, MiniTableBuilder};

    fn table(specs: &[FieldSpec]) -> (TableSet, TableId) {
        let mut b = MiniTableBuilder::new(specs.len());
        for s in specs {
            b.add_field(*s).unwrap();
        }
        let mut tables = TableSet::new();
        let id = tables.insert(b.finish().unwrap());
        (tables, id)
    }

    #[test]
    fn point_decodes() {
        let (tables, id) = table(&[
            FieldSpec::scalar(1, FieldType::Int32),
            FieldSpec::scalar(2, FieldType::Int32),
        ]);
        let arena = Arena::new();
        let msg = decode_new(&[0x08, 0x03, 0x10, 0x04], &arena, &tables, id, &DecodeOptions::new()).unwrap();
        assert_eq!(msg.get(1).unwrap(), Value::Int32(3));
        assert_eq!(msg.get(2).unwrap(), Value::Int32(4));
    }

    #[test]
    fn negative_int32_from_ten_byte_varint() {
        let (tables, id) = table(&[FieldSpec::scalar(1, FieldType::Int32)]);
        let arena = Arena::new();
        let input = [0x08, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x01];
        let msg = decode_new(&input, &arena, &tables, id, &DecodeOptions::new()).unwrap();
        assert_eq!(msg.get(1).unwrap(), Value::Int32(-1));
    }

    #[test]
    fn wire_type_mismatch_reports_tag_offset() {
        let (tables, id) = table(&[
            FieldSpec::scalar(1, FieldType::Int32),
            FieldSpec::scalar(2, FieldType::Int32),
        ]);
        let arena = Arena::new();
        let msg = Message::new(&arena, &tables, id).unwrap();
        let err = decode(&[0x08, 0x01, 0x15, 0, 0, 0, 0], msg, &DecodeOptions::new()).unwrap_err();
        assert_eq!(
            err,
            DecodeError::Parse {
                offset: 2,
                kind: ParseErrorKind::WireTypeMismatch {
                    number: 2,
                    expected: WireType::Varint,
                    actual: WireType::Fixed32,
                },
            }
        );
        assert_eq!(msg.get(1).unwrap(), Value::Int32(1));
    }

    #[test]
    fn invalid_utf8_rejected_for_strings_only() {
        let (tables, id) = table(&[
            FieldSpec::scalar(1, FieldType::String),
            FieldSpec::scalar(2, FieldType::Bytes),
        ]);
        let arena = Arena::new();
        let msg = Message::new(&arena, &tables, id).unwrap();
        decode(&[0x12, 0x01, 0xff], msg, &DecodeOptions::new()).unwrap();
        assert_eq!(msg.get(2).unwrap(), Value::Bytes(vec![0xff]));
        let err = decode(&[0x0a, 0x01, 0xff], msg, &DecodeOptions::new()).unwrap_err();
        assert_eq!(
            err,
            DecodeError::parse(2, ParseErrorKind::InvalidUtf8 { number: 1 })
        );
    }

    #[test]
    fn unknown_group_is_skipped_and_preserved() {
        let (tables, id) = table(&[FieldSpec::scalar(1, FieldType::Int32)]);
        let arena = Arena::new();
        // field 5 group { field 6 varint 1; field 7 group {} } then field 1 = 2
        let input = [0x2b, 0x30, 0x01, 0x3b, 0x3c, 0x2c, 0x08, 0x02];
        let msg = decode_new(&input, &arena, &tables, id, &DecodeOptions::new()).unwrap();
        assert_eq!(msg.unknown().unwrap(), &input[..6]);
        assert_eq!(msg.get(1).unwrap(), Value::Int32(2));
    }

    #[test]
    fn mismatched_end_group_rejected() {
        let (tables, id) = table(&[FieldSpec::scalar(1, FieldType::Int32)]);
        let arena = Arena::new();
        let msg = Message::new(&arena, &tables, id).unwrap();
        let err = decode(&[0x2b, 0x34], msg, &DecodeOptions::new()).unwrap_err();
        assert_eq!(
            err,
            DecodeError::parse(1, ParseErrorKind::UnexpectedEndGroup { number: 6 })
        );
        let err = decode(&[0x2c], msg, &DecodeOptions::new()).unwrap_err();
        assert_eq!(
            err,
            DecodeError::parse(0, ParseErrorKind::UnexpectedEndGroup { number: 5 })
        );
    }

    #[test]
    fn group_nesting_bounded() {
        let (tables, id) = table(&[FieldSpec::scalar(1, FieldType::Int32)]);
        let arena = Arena::new();
        let msg = Message::new(&arena, &tables, id).unwrap();
        let input = vec![0x2b; 8];
        let options = DecodeOptions::new().with_max_depth(4);
        assert_eq!(
            decode(&input, msg, &options),
            Err(DecodeError::DepthExceeded { limit: 4 })
        );
    }

    #[test]
    fn unknown_dropped_when_not_preserved() {
        let (tables, id) = table(&[FieldSpec::scalar(1, FieldType::Int32)]);
        let arena = Arena::new();
        let msg = Message::new(&arena, &tables, id).unwrap();
        let options = DecodeOptions {
            preserve_unknown: false,
            ..DecodeOptions::new()
        };
        decode(&[0x18, 0x05, 0x08, 0x01], msg, &options).unwrap();
        assert!(!msg.has_unknown().unwrap());
        assert_eq!(msg.get(1).unwrap(), Value::Int32(1));
    }

    #[test]
    fn zero_tag_is_invalid() {
        let (tables, id) = table(&[FieldSpec::scalar(1, FieldType::Int32)]);
        let arena = Arena::new();
        let msg = Message::new(&arena, &tables, id).unwrap();
        assert_eq!(
            decode(&[0x00], msg, &DecodeOptions::new()),
            Err(DecodeError::parse(0, ParseErrorKind::InvalidTag { raw: 0 }))
        );
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn arbitrary_input_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
                let (tables, id) = table(&[
                    FieldSpec::scalar(1, FieldType::Int32),
                    FieldSpec::scalar(2, FieldType::String),
                    FieldSpec::repeated(3, FieldType::SInt64),
                    FieldSpec::scalar(4, FieldType::Double),
                ]);
                let arena = Arena::new();
                let msg = Message::new(&arena, &tables, id).unwrap();
                let _ = decode(&bytes, msg, &DecodeOptions::new());
            }
        }
    }
}
