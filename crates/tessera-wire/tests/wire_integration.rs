//! Wire codec integration tests over the shared table fixtures.

use proptest::prelude::*;
use tessera_arena::Arena;
use tessera_core::{FieldMode, FieldType};
use tessera_layout::{ExtensionRegistry, MiniTableExtension};
use tessera_message::{MapKey, Message, Value};
use tessera_test_utils::fixtures;
use tessera_wire::{
    decode, decode_new, decode_with_extensions, encode, DecodeError, DecodeOptions, EncodeOptions,
    ParseErrorKind,
};

fn reencode(input: &[u8], fixture: &fixtures::TableFixture) -> Vec<u8> {
    let arena = Arena::new();
    let msg = decode_new(input, &arena, &fixture.tables, fixture.root, &DecodeOptions::new()).unwrap();
    encode(msg, &EncodeOptions::new()).unwrap()
}

#[test]
fn point_decodes_and_reencodes() {
    let point = fixtures::point();
    let arena = Arena::new();
    let msg = decode_new(&[0x08, 0x03, 0x10, 0x04], &arena, &point.tables, point.root, &DecodeOptions::new()).unwrap();
    assert_eq!(msg.get(1).unwrap(), Value::Int32(3));
    assert_eq!(msg.get(2).unwrap(), Value::Int32(4));
    assert_eq!(encode(msg, &EncodeOptions::new()).unwrap(), [0x08, 0x03, 0x10, 0x04]);
}

#[test]
fn truncated_input_keeps_earlier_fields() {
    let point = fixtures::point();
    let arena = Arena::new();
    let msg = Message::new(&arena, &point.tables, point.root).unwrap();
    let err = decode(&[0x08, 0x03, 0x10], msg, &DecodeOptions::new()).unwrap_err();
    assert!(matches!(
        err,
        DecodeError::Parse {
            kind: ParseErrorKind::Truncated,
            ..
        }
    ));
    assert_eq!(msg.get(1).unwrap(), Value::Int32(3));
    assert_eq!(msg.get(2).unwrap(), Value::Int32(0));
}

#[test]
fn unknown_fields_round_trip_verbatim() {
    let point = fixtures::point();
    let input = [0x08, 0x03, 0x18, 0x07, 0x4D, 0x01, 0x02, 0x03, 0x04];
    assert_eq!(reencode(&input, &point), input);

    let arena = Arena::new();
    let msg = Message::new(&arena, &point.tables, point.root).unwrap();
    let options = DecodeOptions {
        preserve_unknown: false,
        ..DecodeOptions::new()
    };
    decode(&input, msg, &options).unwrap();
    assert_eq!(encode(msg, &EncodeOptions::new()).unwrap(), [0x08, 0x03]);
}

#[test]
fn packed_and_unpacked_input_both_accepted() {
    let repeated = fixtures::repeated();
    // field 1 arrives unpacked, field 2 packed; each re-encodes in its own form
    let input = [0x08, 0x07, 0x12, 0x02, 0x05, 0x06];
    assert_eq!(
        reencode(&input, &repeated),
        [0x0A, 0x01, 0x07, 0x10, 0x05, 0x10, 0x06]
    );
}

#[test]
fn repeated_strings_append_in_order() {
    let repeated = fixtures::repeated();
    let arena = Arena::new();
    let input = [0x1A, 0x01, b'a', 0x1A, 0x00, 0x1A, 0x01, b'c'];
    let msg = decode_new(&input, &arena, &repeated.tables, repeated.root, &DecodeOptions::new()).unwrap();
    let names = msg.array(3).unwrap().unwrap().to_vec().unwrap();
    assert_eq!(
        names,
        [
            Value::String("a".into()),
            Value::String(String::new()),
            Value::String("c".into()),
        ]
    );
}

#[test]
fn map_entries_are_last_wins() {
    let tree = fixtures::tree();
    let arena = Arena::new();
    let input = [
        0x22, 0x05, 0x0A, 0x01, b'a', 0x10, 0x01, // a: 1
        0x22, 0x05, 0x0A, 0x01, b'b', 0x10, 0x03, // b: 3
        0x22, 0x05, 0x0A, 0x01, b'a', 0x10, 0x02, // a: 2
    ];
    let msg = decode_new(&input, &arena, &tree.tables, tree.root, &DecodeOptions::new()).unwrap();
    let labels = msg.map(4).unwrap().unwrap();
    assert_eq!(labels.len().unwrap(), 2);
    assert_eq!(labels.get(&MapKey::String("a".into())).unwrap(), Some(Value::Int32(2)));
    assert_eq!(labels.get(&MapKey::String("b".into())).unwrap(), Some(Value::Int32(3)));
}

#[test]
fn nesting_is_bounded_by_max_depth() {
    let tree = fixtures::tree();
    // Node { child { child { value: 1 } } }
    let input = [0x12, 0x04, 0x12, 0x02, 0x08, 0x01];
    let arena = Arena::new();

    let msg = decode_new(&input, &arena, &tree.tables, tree.root, &DecodeOptions::new().with_max_depth(3)).unwrap();
    let grandchild = msg.sub_message(2).unwrap().unwrap().sub_message(2).unwrap().unwrap();
    assert_eq!(grandchild.get(1).unwrap(), Value::Int32(1));

    let err = decode_new(&input, &arena, &tree.tables, tree.root, &DecodeOptions::new().with_max_depth(2)).unwrap_err();
    assert_eq!(err, DecodeError::DepthExceeded { limit: 2 });
}

#[test]
fn repeated_submessages_decode_in_order() {
    let tree = fixtures::tree();
    let arena = Arena::new();
    let input = [0x1A, 0x02, 0x08, 0x01, 0x1A, 0x02, 0x08, 0x02];
    let msg = decode_new(&input, &arena, &tree.tables, tree.root, &DecodeOptions::new()).unwrap();
    let children = msg.array(3).unwrap().unwrap();
    assert_eq!(children.len().unwrap(), 2);
    assert_eq!(children.message(1).unwrap().get(1).unwrap(), Value::Int32(2));
    assert_eq!(encode(msg, &EncodeOptions::new()).unwrap(), input);
}

#[test]
fn oneof_keeps_last_member_seen() {
    let oneof = fixtures::oneof();
    let arena = Arena::new();
    let msg = decode_new(&[0x08, 0x05, 0x12, 0x01, b'x'], &arena, &oneof.tables, oneof.root, &DecodeOptions::new()).unwrap();
    assert_eq!(msg.which_oneof(0).unwrap().map(|f| f.number), Some(2));
    assert_eq!(msg.get(1).unwrap(), Value::Int32(0));

    decode(&[0x1A, 0x02, 0x08, 0x09], msg, &DecodeOptions::new()).unwrap();
    assert_eq!(msg.which_oneof(0).unwrap().map(|f| f.number), Some(3));
    assert!(!msg.has(2).unwrap());
    assert_eq!(msg.sub_message(3).unwrap().unwrap().get(1).unwrap(), Value::Int32(9));
}

#[test]
fn registered_extensions_are_decoded_and_encoded() {
    let point = fixtures::point();
    let mut registry = ExtensionRegistry::new();
    let ext = MiniTableExtension::new(point.root, 10, FieldType::Int32, FieldMode::Scalar, false).unwrap();
    registry.add(ext).unwrap();

    let arena = Arena::new();
    let msg = Message::new(&arena, &point.tables, point.root).unwrap();
    decode_with_extensions(&[0x08, 0x01, 0x50, 0x07], msg, &registry, &DecodeOptions::new()).unwrap();
    assert_eq!(msg.get_extension(&ext).unwrap(), Value::Int32(7));
    assert!(!msg.has_unknown().unwrap());
    assert_eq!(encode(msg, &EncodeOptions::new()).unwrap(), [0x08, 0x01, 0x50, 0x07]);

    let plain = Message::new(&arena, &point.tables, point.root).unwrap();
    decode(&[0x50, 0x07], plain, &DecodeOptions::new()).unwrap();
    assert!(!plain.has_extension(&ext).unwrap());
    assert_eq!(plain.unknown().unwrap(), [0x50, 0x07]);
}

#[test]
fn wire_type_mismatch_is_an_error() {
    let point = fixtures::point();
    let arena = Arena::new();
    let err = decode_new(&[0x0D, 0, 0, 0, 0], &arena, &point.tables, point.root, &DecodeOptions::new()).unwrap_err();
    assert!(matches!(
        err,
        DecodeError::Parse {
            offset: 0,
            kind: ParseErrorKind::WireTypeMismatch { number: 1, .. }
        }
    ));
}

fn scalar_values() -> impl Strategy<Value = Vec<(u32, Value)>> {
    (
        (-1.0e9f64..1.0e9, -1.0e6f32..1.0e6, any::<i64>(), any::<u64>(), any::<i32>()),
        (any::<u64>(), any::<u32>(), any::<bool>(), "[a-z]{0,12}", proptest::collection::vec(any::<u8>(), 0..12)),
        (any::<u32>(), any::<i32>(), any::<i32>(), any::<i64>(), any::<i32>(), any::<i64>()),
    )
        .prop_map(|((d, f, i64v, u64v, i32v), (f64v, f32v, b, s, bytes), (u32v, e, sf32, sf64, si32, si64))| {
            vec![
                (1, Value::Double(d)),
                (2, Value::Float(f)),
                (3, Value::Int64(i64v)),
                (4, Value::UInt64(u64v)),
                (5, Value::Int32(i32v)),
                (6, Value::UInt64(f64v)),
                (7, Value::UInt32(f32v)),
                (8, Value::Bool(b)),
                (9, Value::String(s)),
                (12, Value::Bytes(bytes)),
                (13, Value::UInt32(u32v)),
                (14, Value::Enum(e)),
                (15, Value::Int32(sf32)),
                (16, Value::Int64(sf64)),
                (17, Value::Int32(si32)),
                (18, Value::Int64(si64)),
            ]
        })
}

proptest! {
    #[test]
    fn every_scalar_type_survives_encode_and_decode(values in scalar_values()) {
        let scalars = fixtures::scalars();
        let arena = Arena::new();
        let msg = Message::new(&arena, &scalars.tables, scalars.root).unwrap();
        for (number, value) in &values {
            msg.set(*number, value.clone()).unwrap();
        }
        let bytes = encode(msg, &EncodeOptions::new()).unwrap();
        let copy = decode_new(&bytes, &arena, &scalars.tables, scalars.root, &DecodeOptions::new()).unwrap();
        for (number, value) in &values {
            prop_assert!(copy.has(*number).unwrap());
            prop_assert_eq!(&copy.get(*number).unwrap(), value);
        }
    }
}
