//! End-to-end scenarios through the facade: schema to table to message to
//! bytes and back.

use tessera::layout::{decode_table, encode_table, Presence};
use tessera::prelude::*;
use tessera_test_utils::{fixtures, schemas};

fn point_pool() -> DefPool {
    let mut pool = DefPool::new();
    pool.add_file(&schemas::geo()).unwrap();
    pool
}

#[test]
fn point_encodes_to_known_bytes_and_back() {
    let pool = point_pool();
    let point = pool.find_message("geo.Point").unwrap();
    let arena = Arena::new();
    let msg = DynamicMessage::new(&pool, &arena, point.id()).unwrap();
    msg.set(point.field_by_name("x").unwrap(), Value::Int32(3)).unwrap();
    msg.set(point.field_by_name("y").unwrap(), Value::Int32(4)).unwrap();
    let bytes = encode(msg.message(), &EncodeOptions::new()).unwrap();
    assert_eq!(bytes, [0x08, 0x03, 0x10, 0x04]);

    let back = decode_new(&bytes, &arena, pool.tables(), point.table(), &DecodeOptions::new()).unwrap();
    assert_eq!(back.get(1).unwrap(), Value::Int32(3));
    assert_eq!(back.get(2).unwrap(), Value::Int32(4));
}

#[test]
fn two_member_oneof_shares_one_case_slot() {
    let mut b = MiniTableBuilder::new(2);
    b.add_field(FieldSpec::scalar(1, FieldType::Int32)).unwrap();
    b.add_field(FieldSpec::scalar(2, FieldType::Int32)).unwrap();
    b.add_oneof(&[1, 2]).unwrap();
    let table = b.finish().unwrap();
    assert_eq!(table.oneof_count(), 1);
    let [first, second] = table.fields() else {
        panic!("two fields expected");
    };
    assert_eq!(first.presence, Presence::Oneof { index: 0 });
    assert_eq!(second.presence, Presence::Oneof { index: 0 });
    assert_eq!(first.offset, second.offset);

    let mut tables = TableSet::new();
    let id = tables.insert(table);
    let arena = Arena::new();
    let msg = Message::new(&arena, &tables, id).unwrap();
    msg.set(1, Value::Int32(10)).unwrap();
    msg.set(2, Value::Int32(20)).unwrap();
    assert!(!msg.has(1).unwrap());
    assert!(msg.has(2).unwrap());
    assert_eq!(msg.which_oneof(0).unwrap().map(|f| f.number), Some(2));
    msg.clear(2).unwrap();
    assert!(msg.which_oneof(0).unwrap().is_none());
}

#[test]
fn fused_arena_keeps_decoded_message_alive() {
    let pool = point_pool();
    let point = pool.find_message("geo.Point").unwrap();
    let keeper = Arena::new();
    let ptr = {
        let owner = Arena::new();
        let msg = decode_new(&[0x08, 0x03, 0x10, 0x04], &owner, pool.tables(), point.table(), &DecodeOptions::new()).unwrap();
        assert!(owner.fuse(&keeper));
        msg.ptr()
    };
    let msg = Message::attach(&keeper, pool.tables(), point.table(), ptr).unwrap();
    assert_eq!(encode(msg, &EncodeOptions::new()).unwrap(), [0x08, 0x03, 0x10, 0x04]);
}

#[test]
fn truncated_payload_keeps_fields_before_the_failing_tag() {
    let point = fixtures::point();
    let arena = Arena::new();
    let msg = Message::new(&arena, &point.tables, point.root).unwrap();
    let err = decode(&[0x08, 0x03, 0x10, 0x84], msg, &DecodeOptions::new()).unwrap_err();
    assert!(matches!(err, DecodeError::Parse { .. }));
    assert_eq!(msg.get(1).unwrap(), Value::Int32(3));
}

#[test]
fn clear_is_idempotent_and_discard_unknown_without_unknowns_is_a_no_op() {
    let tree = fixtures::tree();
    let arena = Arena::new();
    let input = [0x08, 0x07, 0x12, 0x02, 0x08, 0x01, 0x22, 0x05, 0x0A, 0x01, b'a', 0x10, 0x01];
    let msg = decode_new(&input, &arena, &tree.tables, tree.root, &DecodeOptions::new()).unwrap();

    msg.discard_unknown(DecodeOptions::DEFAULT_MAX_DEPTH).unwrap();
    assert_eq!(encode(msg, &EncodeOptions::new()).unwrap(), input);

    msg.clear(1).unwrap();
    let once = encode(msg, &EncodeOptions::new()).unwrap();
    msg.clear(1).unwrap();
    assert_eq!(encode(msg, &EncodeOptions::new()).unwrap(), once);
    assert_eq!(once, &input[2..]);
}

#[test]
fn pool_tables_survive_the_table_codec() {
    let mut pool = point_pool();
    pool.add_file(&schemas::catalog()).unwrap();
    for (_, table) in pool.tables().iter() {
        let decoded = decode_table(&encode_table(table)).unwrap();
        assert_eq!(decoded.field_count(), table.field_count());
        assert_eq!(decoded.size(), table.size());
        assert_eq!(decoded, table.unlinked());
    }
}

fn geo() -> FileDescriptor {
    schemas::geo()
}

static GEO: FileInit<'static> = FileInit {
    name: "geo.proto",
    deps: &[],
    descriptor: geo,
    layout: None,
};

#[test]
fn generated_initializer_loads_once() {
    let mut pool = DefPool::new();
    let id = pool.load_init(&GEO).unwrap();
    assert_eq!(pool.load_init(&GEO).unwrap(), id);
    assert_eq!(pool.file_count(), 1);
    let path = pool.find_message("geo.Path").unwrap();
    let hops = path.field_by_name("hops").unwrap();
    assert!(hops.has_presence());
    assert!(!path.field_by_name("label").unwrap().has_presence());
}
