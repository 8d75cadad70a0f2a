//! The compact layout encoding ("mini-descriptor").
//!
//! Every number is written as base-32 digits, least significant first. Each
//! digit is one printable byte: digits that are followed by more digits come
//! from the continuation alphabet, the last digit from the terminal
//! alphabet, so numbers are self-delimiting.
//!
//! A table is:
//!
//! ```text
//! '$' size align_log2 hasbit_words oneof_count field_count
//!     case_offset{oneof_count}
//!     (number_delta type_code offset presence){field_count}
//! ```
//!
//! `type_code` is `type | mode << 5 | packed << 7`. `presence` is 0 for
//! implicit presence, `1 + 2 * bit` for a presence bit, and `2 + 2 * index`
//! for oneof membership.
//!
//! A file is a sequence of tables in declaration pre-order; a table's nested
//! tables follow it between `{` and `}`.

use smallvec::SmallVec;
use tessera_core::{align_up, is_valid_field_number, FieldMode, FieldType};

use crate::builder::MiniTableBuilder;
use crate::error::{LayoutError, MalformedKind, MalformedLayout};
use crate::field::{FieldSpec, MiniTableField, Presence};
use crate::table::MiniTable;

const CONTINUATION: &[u8; 32] = b"abcdefghijklmnopqrstuvwxyz6789+/";
const TERMINAL: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ012345";

const TABLE_MARKER: u8 = b'$';
const NEST_OPEN: u8 = b'{';
const NEST_CLOSE: u8 = b'}';

/// Deepest `{` nesting accepted by [`decode_file`].
pub const MAX_NESTING: usize = 64;

/// Append `value` as base-32 digits.
pub fn put_number(out: &mut Vec<u8>, mut value: u32) {
    while value >= 32 {
        out.push(CONTINUATION[(value & 31) as usize]);
        value >>= 5;
    }
    out.push(TERMINAL[value as usize]);
}

fn digit(byte: u8) -> Option<(u32, bool)> {
    match byte {
        b'a'..=b'z' => Some(((byte - b'a') as u32, false)),
        b'6'..=b'9' => Some(((byte - b'6') as u32 + 26, false)),
        b'+' => Some((30, false)),
        b'/' => Some((31, false)),
        b'A'..=b'Z' => Some(((byte - b'A') as u32, true)),
        b'0'..=b'5' => Some(((byte - b'0') as u32 + 26, true)),
        _ => None,
    }
}

struct Reader<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(input: &'a [u8], pos: usize) -> Self {
        Self { input, pos }
    }

    fn err(&self, kind: MalformedKind) -> MalformedLayout {
        MalformedLayout::new(self.pos, kind)
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn number(&mut self) -> Result<u32, MalformedLayout> {
        let mut value: u32 = 0;
        for shift in (0..35).step_by(5) {
            let byte = self.peek().ok_or(self.err(MalformedKind::UnexpectedEnd))?;
            let (d, last) = digit(byte).ok_or(self.err(MalformedKind::InvalidByte { byte }))?;
            if shift == 30 && d > 3 {
                return Err(self.err(MalformedKind::NumberOverflow));
            }
            if last && shift > 0 && d == 0 {
                return Err(self.err(MalformedKind::NonCanonicalNumber));
            }
            value |= d << shift;
            self.pos += 1;
            if last {
                return Ok(value);
            }
        }
        Err(self.err(MalformedKind::NumberOverflow))
    }

    fn number_u16(&mut self) -> Result<u16, MalformedLayout> {
        let start = self.pos;
        let v = self.number()?;
        u16::try_from(v).map_err(|_| MalformedLayout::new(start, MalformedKind::ValueOutOfRange))
    }
}

/// Encode one table.
pub fn encode_table(table: &MiniTable) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + table.field_count() * 4);
    write_table(&mut out, table);
    out
}

fn write_table(out: &mut Vec<u8>, table: &MiniTable) {
    out.push(TABLE_MARKER);
    put_number(out, table.size() as u32);
    put_number(out, table.align().trailing_zeros());
    put_number(out, table.hasbit_words() as u32);
    put_number(out, table.oneof_count() as u32);
    put_number(out, table.field_count() as u32);
    for &offset in table.oneof_case_offsets() {
        put_number(out, offset as u32);
    }
    let mut prev = 0;
    for field in table.fields() {
        put_number(out, field.number - prev);
        prev = field.number;
        let code = field.field_type.code() | field.mode.code() << 5 | (field.packed as u32) << 7;
        put_number(out, code);
        put_number(out, field.offset as u32);
        let presence = match field.presence {
            Presence::Implicit => 0,
            Presence::HasBit(bit) => 1 + 2 * bit as u32,
            Presence::Oneof { index } => 2 + 2 * index as u32,
        };
        put_number(out, presence);
    }
}

/// Decode one table; the input must contain exactly one table.
pub fn decode_table(input: &[u8]) -> Result<MiniTable, MalformedLayout> {
    let mut reader = Reader::new(input, 0);
    let result = read_table(&mut reader).and_then(|table| {
        if reader.pos != input.len() {
            Err(reader.err(MalformedKind::TrailingBytes))
        } else {
            Ok(table)
        }
    });
    if let Err(e) = &result {
        tracing::debug!(offset = e.offset, kind = %e.kind, "mini-table decode failed");
    }
    result
}

#[derive(Clone, Copy)]
enum Owner {
    Hasbits,
    Case,
    Field { oneof: Option<u16> },
}

fn read_table(r: &mut Reader<'_>) -> Result<MiniTable, MalformedLayout> {
    match r.peek() {
        Some(TABLE_MARKER) => r.pos += 1,
        Some(_) => return Err(r.err(MalformedKind::MissingTableMarker)),
        None => return Err(r.err(MalformedKind::UnexpectedEnd)),
    }
    let header_start = r.pos;
    let size = r.number_u16()?;
    let align_log2 = r.number()?;
    if align_log2 > 3 {
        return Err(MalformedLayout::new(
            header_start,
            MalformedKind::InvalidAlignment { log2: align_log2 },
        ));
    }
    let align = 1usize << align_log2;
    let hasbit_words = r.number_u16()?;
    let oneof_count = r.number_u16()?;
    let field_count = r.number()? as usize;
    // Every field takes at least four bytes of input.
    if field_count > r.input.len().saturating_sub(r.pos) / 4 + 1 {
        return Err(r.err(MalformedKind::UnexpectedEnd));
    }

    let mut regions: Vec<(usize, usize, Owner)> = Vec::with_capacity(field_count + 1);
    if hasbit_words > 0 {
        regions.push((0, hasbit_words as usize * 4, Owner::Hasbits));
    }

    let mut case_offsets = Vec::with_capacity(oneof_count.min(1024) as usize);
    for _ in 0..oneof_count {
        let at = r.pos;
        let offset = r.number_u16()?;
        if offset as usize + 4 > size as usize {
            return Err(MalformedLayout::new(at, MalformedKind::OffsetOutOfRange { number: 0 }));
        }
        if offset % 4 != 0 {
            return Err(MalformedLayout::new(at, MalformedKind::MisalignedOffset { number: 0 }));
        }
        regions.push((offset as usize, offset as usize + 4, Owner::Case));
        case_offsets.push(offset);
    }

    let hasbit_limit = hasbit_words as usize * 32;
    let mut hasbits_used = vec![false; hasbit_limit.min(1 << 16)];
    let mut oneof_members = vec![0usize; oneof_count as usize];
    let mut fields = Vec::with_capacity(field_count);
    let mut number: u64 = 0;
    for _ in 0..field_count {
        let at = r.pos;
        let delta = r.number()?;
        number += delta as u64;
        if delta == 0 || number > u32::MAX as u64 || !is_valid_field_number(number as u32) {
            return Err(MalformedLayout::new(
                at,
                MalformedKind::InvalidFieldNumber { number },
            ));
        }
        let number = number as u32;

        let at = r.pos;
        let code = r.number()?;
        let field_type = FieldType::from_code(code & 31)
            .ok_or(MalformedLayout::new(at, MalformedKind::InvalidFieldType { code: code & 31 }))?;
        let mode = FieldMode::from_code((code >> 5) & 3)
            .ok_or(MalformedLayout::new(at, MalformedKind::InvalidMode { number }))?;
        let packed = (code >> 7) & 1 == 1;
        if code >> 8 != 0 {
            return Err(MalformedLayout::new(at, MalformedKind::ValueOutOfRange));
        }
        if packed && !(mode == FieldMode::Array && field_type.is_packable()) {
            return Err(MalformedLayout::new(at, MalformedKind::InvalidFieldShape { number }));
        }
        if mode == FieldMode::Map && field_type != FieldType::Message {
            return Err(MalformedLayout::new(at, MalformedKind::InvalidFieldShape { number }));
        }

        let at = r.pos;
        let offset = r.number_u16()?;
        let slot_size = tessera_core::field::slot_size(field_type, mode);
        let slot_align = tessera_core::field::slot_align(field_type, mode);
        if offset as usize + slot_size > size as usize {
            return Err(MalformedLayout::new(at, MalformedKind::OffsetOutOfRange { number }));
        }
        if offset as usize % slot_align != 0 || slot_align > align {
            return Err(MalformedLayout::new(at, MalformedKind::MisalignedOffset { number }));
        }

        let at = r.pos;
        let code = r.number()?;
        let presence = match code {
            0 => Presence::Implicit,
            c if c % 2 == 1 => {
                let bit = (c - 1) / 2;
                if mode != FieldMode::Scalar {
                    return Err(MalformedLayout::new(at, MalformedKind::InvalidFieldShape { number }));
                }
                if bit as usize >= hasbit_limit
                    || bit > u16::MAX as u32
                    || hasbits_used[bit as usize]
                {
                    return Err(MalformedLayout::new(at, MalformedKind::InvalidHasbit { number }));
                }
                hasbits_used[bit as usize] = true;
                Presence::HasBit(bit as u16)
            }
            c => {
                let index = (c - 2) / 2;
                if mode != FieldMode::Scalar {
                    return Err(MalformedLayout::new(at, MalformedKind::InvalidFieldShape { number }));
                }
                if index >= oneof_count as u32 {
                    return Err(MalformedLayout::new(at, MalformedKind::InvalidOneofIndex { number }));
                }
                oneof_members[index as usize] += 1;
                Presence::Oneof { index: index as u16 }
            }
        };

        regions.push((
            offset as usize,
            offset as usize + slot_size,
            Owner::Field {
                oneof: match presence {
                    Presence::Oneof { index } => Some(index),
                    _ => None,
                },
            },
        ));
        fields.push(MiniTableField {
            number,
            field_type,
            mode,
            packed,
            offset,
            presence,
            sub: None,
        });
    }

    if let Some(index) = oneof_members.iter().position(|&n| n == 0) {
        return Err(MalformedLayout::new(
            header_start,
            MalformedKind::EmptyOneof { index: index as u32 },
        ));
    }

    check_overlaps(&mut regions).map_err(|kind| MalformedLayout::new(header_start, kind))?;

    let end = regions.iter().map(|&(_, e, _)| e).max().unwrap_or(0);
    let header_align = if hasbit_words > 0 || oneof_count > 0 { 4 } else { 1 };
    let expected_align = fields
        .iter()
        .map(MiniTableField::align)
        .fold(header_align, usize::max);
    if align != expected_align {
        return Err(MalformedLayout::new(
            header_start,
            MalformedKind::InvalidAlignment { log2: align_log2 },
        ));
    }
    let expected = align_up(end, align);
    if size as usize != expected {
        return Err(MalformedLayout::new(
            header_start,
            MalformedKind::SizeMismatch {
                declared: size as u32,
                expected,
            },
        ));
    }

    Ok(MiniTable::from_parts(
        size,
        align as u8,
        hasbit_words,
        case_offsets,
        fields,
    ))
}

/// Reject any two regions that overlap unless both are fields of the same
/// oneof.
fn check_overlaps(regions: &mut [(usize, usize, Owner)]) -> Result<(), MalformedKind> {
    regions.sort_by_key(|&(start, end, _)| (start, end));
    let mut active: SmallVec<[(usize, usize, Owner); 8]> = SmallVec::new();
    for &(start, end, owner) in regions.iter() {
        if start == end {
            continue;
        }
        active.retain(|&mut (_, e, _)| e > start);
        for &(other_start, _, other) in active.iter() {
            let shared = match (owner, other) {
                (
                    Owner::Field { oneof: Some(a), .. },
                    Owner::Field { oneof: Some(b), .. },
                ) => a == b,
                _ => false,
            };
            if !shared {
                return Err(MalformedKind::OverlappingSlots {
                    first: other_start as u32,
                    second: start as u32,
                });
            }
        }
        active.push((start, end, owner));
    }
    Ok(())
}

/// One table decoded from a file-form layout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedTable {
    /// The table.
    pub table: MiniTable,
    /// Index (in the returned list) of the table this one is nested in.
    pub parent: Option<usize>,
}

/// Decode a file-form layout: tables in pre-order with nesting brackets.
pub fn decode_file(input: &[u8]) -> Result<Vec<DecodedTable>, MalformedLayout> {
    let result = decode_file_inner(input);
    if let Err(e) = &result {
        tracing::debug!(offset = e.offset, kind = %e.kind, "file layout decode failed");
    }
    result
}

fn decode_file_inner(input: &[u8]) -> Result<Vec<DecodedTable>, MalformedLayout> {
    let mut out = Vec::new();
    let mut stack: SmallVec<[usize; 8]> = SmallVec::new();
    let mut last_table: Option<usize> = None;
    let mut reader = Reader::new(input, 0);
    while let Some(byte) = reader.peek() {
        match byte {
            TABLE_MARKER => {
                let table = read_table(&mut reader)?;
                out.push(DecodedTable {
                    table,
                    parent: stack.last().copied(),
                });
                last_table = Some(out.len() - 1);
            }
            NEST_OPEN => {
                let parent = last_table
                    .take()
                    .ok_or(reader.err(MalformedKind::UnbalancedNesting))?;
                if stack.len() >= MAX_NESTING {
                    return Err(reader.err(MalformedKind::NestingTooDeep { limit: MAX_NESTING }));
                }
                stack.push(parent);
                reader.pos += 1;
            }
            NEST_CLOSE => {
                if stack.pop().is_none() {
                    return Err(reader.err(MalformedKind::UnbalancedNesting));
                }
                last_table = None;
                reader.pos += 1;
            }
            _ => return Err(reader.err(MalformedKind::MissingTableMarker)),
        }
    }
    if !stack.is_empty() {
        return Err(reader.err(MalformedKind::UnbalancedNesting));
    }
    Ok(out)
}

enum EncoderState {
    Idle { after_table: bool },
    Message {
        builder: MiniTableBuilder,
        oneofs: Vec<Vec<u32>>,
        open_oneof: Option<Vec<u32>>,
    },
}

/// Produces a file-form layout from an explicit construction sequence.
///
/// ```
/// use tessera_core::FieldType;
/// use tessera_layout::{decode_file, FieldSpec, MiniDescriptorEncoder};
///
/// let mut enc = MiniDescriptorEncoder::new();
/// enc.start_message(1).unwrap();
/// enc.put_field(FieldSpec::optional(1, FieldType::Message)).unwrap();
/// enc.end_message().unwrap();
/// enc.enter_nested().unwrap();
/// enc.start_message(0).unwrap();
/// enc.end_message().unwrap();
/// enc.leave_nested().unwrap();
/// let bytes = enc.finish().unwrap();
///
/// let tables = decode_file(&bytes).unwrap();
/// assert_eq!(tables[1].parent, Some(0));
/// ```
pub struct MiniDescriptorEncoder {
    out: Vec<u8>,
    depth: usize,
    state: EncoderState,
}

impl MiniDescriptorEncoder {
    /// Start an empty file.
    pub fn new() -> Self {
        Self {
            out: Vec::new(),
            depth: 0,
            state: EncoderState::Idle { after_table: false },
        }
    }

    /// Begin a message with `field_count` fields.
    pub fn start_message(&mut self, field_count: usize) -> Result<(), LayoutError> {
        if let EncoderState::Message { .. } = self.state {
            return Err(LayoutError::EncoderState {
                reason: "message already open",
            });
        }
        self.state = EncoderState::Message {
            builder: MiniTableBuilder::new(field_count),
            oneofs: Vec::new(),
            open_oneof: None,
        };
        Ok(())
    }

    /// Add a field to the open message (and to the open oneof, if any).
    pub fn put_field(&mut self, spec: FieldSpec) -> Result<(), LayoutError> {
        match &mut self.state {
            EncoderState::Message {
                builder,
                open_oneof,
                ..
            } => {
                builder.add_field(spec)?;
                if let Some(members) = open_oneof {
                    members.push(spec.number);
                }
                Ok(())
            }
            EncoderState::Idle { .. } => Err(LayoutError::EncoderState {
                reason: "field outside a message",
            }),
        }
    }

    /// Begin a oneof; fields put until [`end_oneof`](Self::end_oneof) join it.
    pub fn start_oneof(&mut self) -> Result<(), LayoutError> {
        match &mut self.state {
            EncoderState::Message { open_oneof, .. } if open_oneof.is_none() => {
                *open_oneof = Some(Vec::new());
                Ok(())
            }
            _ => Err(LayoutError::EncoderState {
                reason: "oneof outside a message or already open",
            }),
        }
    }

    /// Close the open oneof.
    pub fn end_oneof(&mut self) -> Result<(), LayoutError> {
        match &mut self.state {
            EncoderState::Message {
                oneofs, open_oneof, ..
            } => {
                let members = open_oneof.take().ok_or(LayoutError::EncoderState {
                    reason: "no open oneof",
                })?;
                oneofs.push(members);
                Ok(())
            }
            EncoderState::Idle { .. } => Err(LayoutError::EncoderState {
                reason: "no open oneof",
            }),
        }
    }

    /// Lay out the open message and append its table.
    pub fn end_message(&mut self) -> Result<(), LayoutError> {
        if let EncoderState::Idle { .. } = self.state {
            return Err(LayoutError::EncoderState {
                reason: "no open message",
            });
        }
        let state = std::mem::replace(&mut self.state, EncoderState::Idle { after_table: false });
        let EncoderState::Message {
            mut builder,
            oneofs,
            open_oneof,
        } = state
        else {
            return Err(LayoutError::EncoderState {
                reason: "no open message",
            });
        };
        if open_oneof.is_some() {
            return Err(LayoutError::EncoderState {
                reason: "oneof still open",
            });
        }
        for members in &oneofs {
            builder.add_oneof(members)?;
        }
        let table = builder.finish()?;
        self.put_table(&table)
    }

    /// Append a pre-built table.
    pub fn put_table(&mut self, table: &MiniTable) -> Result<(), LayoutError> {
        if let EncoderState::Message { .. } = self.state {
            return Err(LayoutError::EncoderState {
                reason: "message still open",
            });
        }
        write_table(&mut self.out, table);
        self.state = EncoderState::Idle { after_table: true };
        Ok(())
    }

    /// Open the nested scope of the table just written.
    pub fn enter_nested(&mut self) -> Result<(), LayoutError> {
        match self.state {
            EncoderState::Idle { after_table: true } => {
                self.out.push(NEST_OPEN);
                self.depth += 1;
                self.state = EncoderState::Idle { after_table: false };
                Ok(())
            }
            _ => Err(LayoutError::EncoderState {
                reason: "nesting must follow a table",
            }),
        }
    }

    /// Close the innermost nested scope.
    pub fn leave_nested(&mut self) -> Result<(), LayoutError> {
        match self.state {
            EncoderState::Idle { .. } if self.depth > 0 => {
                self.out.push(NEST_CLOSE);
                self.depth -= 1;
                self.state = EncoderState::Idle { after_table: false };
                Ok(())
            }
            _ => Err(LayoutError::EncoderState {
                reason: "no nested scope to leave",
            }),
        }
    }

    /// Return the encoded file.
    pub fn finish(self) -> Result<Vec<u8>, LayoutError> {
        if let EncoderState::Message { .. } = self.state {
            return Err(LayoutError::EncoderState {
                reason: "message still open",
            });
        }
        if self.depth != 0 {
            return Err(LayoutError::EncoderState {
                reason: "nested scope still open",
            });
        }
        Ok(self.out)
    }
}

impl Default for MiniDescriptorEncoder {
    fn default() -> Self {
        Self::new()
    }
}
