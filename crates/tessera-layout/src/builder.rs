//! Computing a mini-table from a list of fields.
//!
//! # Instance layout
//!
//! ```text
//! [ presence words (4 bytes each) ][ oneof case slots (4 bytes each) ][ field slots ... ][pad]
//! ```
//!
//! Presence bits are assigned in field-number order to singular fields that
//! ask for explicit presence and are not oneof members. Each oneof gets one
//! 32-bit case slot holding the number of its active member (0 for none),
//! and one shared storage slot as wide and as aligned as its widest member.
//! Field and oneof slots are placed largest-alignment first, then largest
//! size first, then lowest field number first, each at its natural alignment.

use smallvec::SmallVec;
use tessera_core::{align_up, is_valid_field_number, FieldMode, FieldType};

use crate::error::LayoutError;
use crate::field::{FieldSpec, MiniTableField, Presence};
use crate::table::MiniTable;

/// Builds a [`MiniTable`] field by field.
///
/// ```
/// use tessera_core::FieldType;
/// use tessera_layout::{FieldSpec, MiniTableBuilder};
///
/// let mut b = MiniTableBuilder::new(2);
/// b.add_field(FieldSpec::scalar(1, FieldType::Int32)).unwrap();
/// b.add_field(FieldSpec::scalar(2, FieldType::Int32)).unwrap();
/// let table = b.finish().unwrap();
/// assert_eq!(table.size(), 8);
/// ```
#[derive(Clone, Debug)]
pub struct MiniTableBuilder {
    declared: usize,
    fields: Vec<FieldSpec>,
    oneofs: Vec<SmallVec<[u32; 4]>>,
}

enum Item {
    Field(usize),
    Oneof(usize),
}

impl MiniTableBuilder {
    /// Start a message with `field_count` fields.
    pub fn new(field_count: usize) -> Self {
        Self {
            declared: field_count,
            fields: Vec::with_capacity(field_count),
            oneofs: Vec::new(),
        }
    }

    /// Add a field.
    pub fn add_field(&mut self, spec: FieldSpec) -> Result<(), LayoutError> {
        if self.fields.len() >= self.declared {
            return Err(LayoutError::TooManyFields {
                declared: self.declared,
            });
        }
        let number = spec.number;
        if !is_valid_field_number(number) {
            return Err(LayoutError::InvalidFieldNumber { number });
        }
        if self.fields.iter().any(|f| f.number == number) {
            return Err(LayoutError::DuplicateField { number });
        }
        if spec.packed && !(spec.mode == FieldMode::Array && spec.field_type.is_packable()) {
            return Err(LayoutError::InvalidPacked { number });
        }
        if spec.mode == FieldMode::Map && spec.field_type != FieldType::Message {
            return Err(LayoutError::InvalidMapField { number });
        }
        if spec.explicit_presence && spec.mode.is_repeated() {
            return Err(LayoutError::InvalidPresence { number });
        }
        self.fields.push(spec);
        Ok(())
    }

    /// Group already-added singular fields into a oneof.
    ///
    /// Returns the oneof's index.
    pub fn add_oneof(&mut self, members: &[u32]) -> Result<u16, LayoutError> {
        if members.is_empty() {
            return Err(LayoutError::EmptyOneof);
        }
        let mut group = SmallVec::<[u32; 4]>::new();
        for &number in members {
            let spec = self
                .fields
                .iter()
                .find(|f| f.number == number)
                .ok_or(LayoutError::UnknownOneofMember { number })?;
            if spec.mode.is_repeated() {
                return Err(LayoutError::RepeatedOneofMember { number });
            }
            if group.contains(&number) || self.oneofs.iter().any(|o| o.contains(&number)) {
                return Err(LayoutError::DuplicateOneofMember { number });
            }
            group.push(number);
        }
        if self.oneofs.len() >= u16::MAX as usize {
            return Err(LayoutError::SizeOverflow {
                size: self.oneofs.len() * 4,
            });
        }
        self.oneofs.push(group);
        Ok((self.oneofs.len() - 1) as u16)
    }

    /// Compute offsets and presence, and produce the table.
    pub fn finish(mut self) -> Result<MiniTable, LayoutError> {
        self.fields.sort_by_key(|f| f.number);

        let oneof_of = |number: u32| -> Option<u16> {
            self.oneofs
                .iter()
                .position(|o| o.contains(&number))
                .map(|i| i as u16)
        };

        let mut presence = Vec::with_capacity(self.fields.len());
        let mut hasbits = 0usize;
        for spec in &self.fields {
            let p = match oneof_of(spec.number) {
                Some(index) => Presence::Oneof { index },
                None if spec.explicit_presence => {
                    let bit = u16::try_from(hasbits).map_err(|_| LayoutError::SizeOverflow {
                        size: hasbits / 8,
                    })?;
                    hasbits += 1;
                    Presence::HasBit(bit)
                }
                None => Presence::Implicit,
            };
            presence.push(p);
        }

        let hasbit_words = hasbits.div_ceil(32);
        let cases_start = hasbit_words * 4;
        let oneof_case_offsets: Vec<usize> = (0..self.oneofs.len())
            .map(|i| cases_start + 4 * i)
            .collect();
        let header_end = cases_start + 4 * self.oneofs.len();

        // (align, size, lowest number, item)
        let mut items: Vec<(usize, usize, u32, Item)> = Vec::new();
        for (i, spec) in self.fields.iter().enumerate() {
            if matches!(presence[i], Presence::Oneof { .. }) {
                continue;
            }
            let size = tessera_core::field::slot_size(spec.field_type, spec.mode);
            let align = tessera_core::field::slot_align(spec.field_type, spec.mode);
            items.push((align, size, spec.number, Item::Field(i)));
        }
        for (o, members) in self.oneofs.iter().enumerate() {
            let mut align = 1;
            let mut size = 0;
            let mut lowest = u32::MAX;
            for spec in self.fields.iter().filter(|f| members.contains(&f.number)) {
                align = align.max(tessera_core::field::slot_align(spec.field_type, spec.mode));
                size = size.max(tessera_core::field::slot_size(spec.field_type, spec.mode));
                lowest = lowest.min(spec.number);
            }
            items.push((align, size, lowest, Item::Oneof(o)));
        }
        items.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.cmp(&a.1)).then(a.2.cmp(&b.2)));

        let mut offsets = vec![0usize; self.fields.len()];
        let mut end = header_end;
        let mut align = if header_end > 0 { 4 } else { 1 };
        for (item_align, item_size, _, item) in &items {
            let at = align_up(end, *item_align);
            end = at + item_size;
            align = align.max(*item_align);
            match item {
                Item::Field(i) => offsets[*i] = at,
                Item::Oneof(o) => {
                    for (i, spec) in self.fields.iter().enumerate() {
                        if self.oneofs[*o].contains(&spec.number) {
                            offsets[i] = at;
                        }
                    }
                }
            }
        }
        let size = align_up(end, align);
        if size > u16::MAX as usize {
            return Err(LayoutError::SizeOverflow { size });
        }

        let fields: Vec<MiniTableField> = self
            .fields
            .iter()
            .zip(presence)
            .zip(&offsets)
            .map(|((spec, presence), &offset)| MiniTableField {
                number: spec.number,
                field_type: spec.field_type,
                mode: spec.mode,
                packed: spec.packed,
                offset: offset as u16,
                presence,
                sub: None,
            })
            .collect();

        tracing::trace!(
            size,
            align,
            fields = fields.len(),
            oneofs = oneof_case_offsets.len(),
            hasbits,
            "mini-table built"
        );
        Ok(MiniTable::from_parts(
            size as u16,
            align as u8,
            hasbit_words as u16,
            oneof_case_offsets.into_iter().map(|o| o as u16).collect(),
            fields,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(specs: &[FieldSpec], oneofs: &[&[u32]]) -> Result<MiniTable, LayoutError> {
        let mut b = MiniTableBuilder::new(specs.len());
        for spec in specs {
            b.add_field(*spec)?;
        }
        for members in oneofs {
            b.add_oneof(members)?;
        }
        b.finish()
    }

    #[test]
    fn point_layout() {
        let t = build(
            &[
                FieldSpec::scalar(1, FieldType::Int32),
                FieldSpec::scalar(2, FieldType::Int32),
            ],
            &[],
        )
        .unwrap();
        assert_eq!(t.size(), 8);
        assert_eq!(t.align(), 4);
        assert_eq!(t.hasbit_words(), 0);
        assert_eq!(t.fields()[0].offset, 0);
        assert_eq!(t.fields()[1].offset, 4);
    }

    #[test]
    fn empty_message_has_zero_size() {
        let t = build(&[], &[]).unwrap();
        assert_eq!(t.size(), 0);
        assert_eq!(t.align(), 1);
    }

    #[test]
    fn fields_sorted_by_number() {
        let t = build(
            &[
                FieldSpec::scalar(9, FieldType::Bool),
                FieldSpec::scalar(3, FieldType::Double),
                FieldSpec::scalar(5, FieldType::String),
            ],
            &[],
        )
        .unwrap();
        let numbers: Vec<u32> = t.fields().iter().map(|f| f.number).collect();
        assert_eq!(numbers, vec![3, 5, 9]);
    }

    #[test]
    fn larger_alignment_placed_first() {
        let t = build(
            &[
                FieldSpec::scalar(1, FieldType::Bool),
                FieldSpec::scalar(2, FieldType::Int64),
                FieldSpec::scalar(3, FieldType::Int32),
            ],
            &[],
        )
        .unwrap();
        assert_eq!(t.find_field(2).unwrap().offset, 0);
        assert_eq!(t.find_field(3).unwrap().offset, 8);
        assert_eq!(t.find_field(1).unwrap().offset, 12);
        assert_eq!(t.size(), 16);
        assert_eq!(t.align(), 8);
    }

    #[test]
    fn hasbits_assigned_in_number_order() {
        let t = build(
            &[
                FieldSpec::optional(7, FieldType::Int32),
                FieldSpec::optional(2, FieldType::Int32),
                FieldSpec::scalar(3, FieldType::Int32),
            ],
            &[],
        )
        .unwrap();
        assert_eq!(t.hasbit_words(), 1);
        assert_eq!(t.find_field(2).unwrap().presence, Presence::HasBit(0));
        assert_eq!(t.find_field(7).unwrap().presence, Presence::HasBit(1));
        assert_eq!(t.find_field(3).unwrap().presence, Presence::Implicit);
        assert!(t.fields().iter().all(|f| f.offset >= 4));
    }

    #[test]
    fn thirty_three_hasbits_take_two_words() {
        let specs: Vec<FieldSpec> = (1..=33)
            .map(|n| FieldSpec::optional(n, FieldType::Bool))
            .collect();
        let t = build(&specs, &[]).unwrap();
        assert_eq!(t.hasbit_words(), 2);
        assert_eq!(t.find_field(33).unwrap().hasbit(), Some(32));
        assert!(t.fields().iter().all(|f| f.offset >= 8));
    }

    #[test]
    fn oneof_members_share_storage_and_case_slot() {
        let t = build(
            &[
                FieldSpec::scalar(1, FieldType::Int32),
                FieldSpec::scalar(2, FieldType::Int32),
            ],
            &[&[1, 2]],
        )
        .unwrap();
        assert_eq!(t.oneof_count(), 1);
        assert_eq!(t.oneof_case_offset(0), Some(0));
        let a = t.find_field(1).unwrap();
        let b = t.find_field(2).unwrap();
        assert_eq!(a.offset, b.offset);
        assert_eq!(a.presence, Presence::Oneof { index: 0 });
        assert_eq!(b.presence, Presence::Oneof { index: 0 });
        assert_eq!(t.size(), 8);
    }

    #[test]
    fn oneof_slot_sized_to_widest_member() {
        let t = build(
            &[
                FieldSpec::scalar(1, FieldType::Bool),
                FieldSpec::scalar(2, FieldType::String),
                FieldSpec::scalar(3, FieldType::Int32),
            ],
            &[&[1, 2]],
        )
        .unwrap();
        let shared = t.find_field(1).unwrap().offset;
        assert_eq!(shared, t.find_field(2).unwrap().offset);
        assert_eq!(shared % 8, 0);
        let other = t.find_field(3).unwrap().offset as usize;
        assert!(other >= shared as usize + 16 || other + 4 <= shared as usize);
    }

    #[test]
    fn oneof_members_get_no_hasbit() {
        let t = build(
            &[
                FieldSpec::optional(1, FieldType::Int32),
                FieldSpec::optional(2, FieldType::Int32),
            ],
            &[&[1]],
        )
        .unwrap();
        assert_eq!(t.find_field(1).unwrap().presence, Presence::Oneof { index: 0 });
        assert_eq!(t.find_field(2).unwrap().presence, Presence::HasBit(0));
        assert_eq!(t.hasbit_words(), 1);
        assert_eq!(t.oneof_case_offset(0), Some(4));
    }

    #[test]
    fn indirect_fields_use_reference_slots() {
        let t = build(
            &[
                FieldSpec::repeated(1, FieldType::Bool),
                FieldSpec::map(2),
                FieldSpec::scalar(3, FieldType::Message),
            ],
            &[],
        )
        .unwrap();
        for f in t.fields() {
            assert_eq!(f.size(), 16);
            assert_eq!(f.offset % 8, 0);
        }
        assert_eq!(t.sub_count(), 2);
        assert_eq!(t.find_field(1).unwrap().sub, None);
        assert_eq!(t.find_field(2).unwrap().sub, Some(0));
        assert_eq!(t.find_field(3).unwrap().sub, Some(1));
    }

    #[test]
    fn duplicate_number_rejected() {
        let err = build(
            &[
                FieldSpec::scalar(1, FieldType::Int32),
                FieldSpec::scalar(1, FieldType::Int64),
            ],
            &[],
        )
        .unwrap_err();
        assert_eq!(err, LayoutError::DuplicateField { number: 1 });
    }

    #[test]
    fn invalid_numbers_rejected() {
        assert_eq!(
            build(&[FieldSpec::scalar(0, FieldType::Int32)], &[]).unwrap_err(),
            LayoutError::InvalidFieldNumber { number: 0 }
        );
        assert_eq!(
            build(&[FieldSpec::scalar(1 << 29, FieldType::Int32)], &[]).unwrap_err(),
            LayoutError::InvalidFieldNumber { number: 1 << 29 }
        );
    }

    #[test]
    fn oneof_requires_added_singular_fields() {
        let specs = [
            FieldSpec::scalar(1, FieldType::Int32),
            FieldSpec::repeated(2, FieldType::Int32),
        ];
        assert_eq!(
            build(&specs, &[&[1, 3]]).unwrap_err(),
            LayoutError::UnknownOneofMember { number: 3 }
        );
        assert_eq!(
            build(&specs, &[&[2]]).unwrap_err(),
            LayoutError::RepeatedOneofMember { number: 2 }
        );
        assert_eq!(
            build(&specs, &[&[1], &[1]]).unwrap_err(),
            LayoutError::DuplicateOneofMember { number: 1 }
        );
        assert_eq!(build(&specs, &[&[]]).unwrap_err(), LayoutError::EmptyOneof);
    }

    #[test]
    fn too_many_fields_rejected() {
        let mut b = MiniTableBuilder::new(1);
        b.add_field(FieldSpec::scalar(1, FieldType::Int32)).unwrap();
        assert_eq!(
            b.add_field(FieldSpec::scalar(2, FieldType::Int32)),
            Err(LayoutError::TooManyFields { declared: 1 })
        );
    }

    #[test]
    fn shape_violations_rejected() {
        let mut b = MiniTableBuilder::new(4);
        assert_eq!(
            b.add_field(FieldSpec::scalar(1, FieldType::Int32).with_packed(true)),
            Err(LayoutError::InvalidPacked { number: 1 })
        );
        assert_eq!(
            b.add_field(FieldSpec::repeated(2, FieldType::Bytes).with_packed(true)),
            Err(LayoutError::InvalidPacked { number: 2 })
        );
        assert_eq!(
            b.add_field(FieldSpec {
                field_type: FieldType::Int32,
                ..FieldSpec::map(3)
            }),
            Err(LayoutError::InvalidMapField { number: 3 })
        );
        assert_eq!(
            b.add_field(FieldSpec {
                explicit_presence: true,
                ..FieldSpec::repeated(4, FieldType::Int32)
            }),
            Err(LayoutError::InvalidPresence { number: 4 })
        );
    }

    #[test]
    fn oversized_layout_rejected() {
        let specs: Vec<FieldSpec> = (1..=5000)
            .map(|n| FieldSpec::scalar(n, FieldType::String))
            .collect();
        assert!(matches!(
            build(&specs, &[]),
            Err(LayoutError::SizeOverflow { .. })
        ));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn arb_specs() -> impl Strategy<Value = Vec<FieldSpec>> {
            prop::collection::btree_map(
                1u32..500,
                (0usize..FieldType::ALL.len(), 0u32..3, any::<bool>()),
                0..24,
            )
            .prop_map(|m| {
                m.into_iter()
                    .map(|(number, (ty, mode, presence))| {
                        let ty = FieldType::ALL[ty];
                        match mode {
                            0 if presence => FieldSpec::optional(number, ty),
                            0 => FieldSpec::scalar(number, ty),
                            1 => FieldSpec::repeated(number, ty),
                            _ => FieldSpec::map(number),
                        }
                    })
                    .collect()
            })
        }

        proptest! {
            #[test]
            fn slots_never_overlap(specs in arb_specs()) {
                let t = build(&specs, &[]).unwrap();
                let header = t.hasbit_words() * 4;
                let mut spans: Vec<(usize, usize)> = t
                    .fields()
                    .iter()
                    .map(|f| (f.offset as usize, f.offset as usize + f.size()))
                    .collect();
                spans.sort();
                for w in spans.windows(2) {
                    prop_assert!(w[0].1 <= w[1].0);
                }
                for (start, end) in &spans {
                    prop_assert!(*start >= header);
                    prop_assert!(*end <= t.size());
                }
                prop_assert_eq!(t.size() % t.align(), 0);
            }

            #[test]
            fn slots_are_naturally_aligned(specs in arb_specs()) {
                let t = build(&specs, &[]).unwrap();
                for f in t.fields() {
                    prop_assert_eq!(f.offset as usize % f.align(), 0);
                    prop_assert!(f.align() <= t.align());
                }
            }
        }
    }
}
