//! Benchmark profiles for Tessera.
//!
//! - [`path_pool`]: a def pool holding `geo.proto`.
//! - [`path_payload`]: a wire-encoded `geo.Path` with `n` points.
//! - [`wide_table_specs`]: field specs for a table with `n` mixed fields.

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use tessera_arena::Arena;
use tessera_core::FieldType;
use tessera_defs::{DefPool, DynamicMessage};
use tessera_layout::FieldSpec;
use tessera_message::Value;
use tessera_test_utils::schemas;
use tessera_wire::EncodeOptions;

/// A pool holding the `geo.proto` schema.
pub fn path_pool() -> DefPool {
    let mut pool = DefPool::new();
    pool.add_file(&schemas::geo()).expect("geo.proto builds");
    pool
}

/// Encode a `geo.Path` with `n` points `(i, -i)` and a label.
pub fn path_payload(pool: &DefPool, n: usize) -> Vec<u8> {
    let path = pool.find_message("geo.Path").expect("geo.Path in pool");
    let points = path.field_by_name("points").expect("points field");
    let label = path.field_by_name("label").expect("label field");

    let arena = Arena::new();
    let msg = DynamicMessage::new(pool, &arena, path.id()).unwrap();
    msg.set(label, Value::String("bench".into())).unwrap();
    let array = msg.message().mutable_array(points.number(), Some(&arena)).unwrap();
    for i in 0..n as i32 {
        let point = array.push_message().unwrap();
        point.set(1, Value::Int32(i)).unwrap();
        point.set(2, Value::Int32(-i)).unwrap();
    }
    tessera_wire::encode(msg.message(), &EncodeOptions::new()).unwrap()
}

/// `n` field specs cycling through scalar, optional and repeated fields of
/// several types, numbered from 1 with every fifth number skipped.
pub fn wide_table_specs(n: usize) -> Vec<FieldSpec> {
    const TYPES: [FieldType; 6] = [
        FieldType::Int32,
        FieldType::Double,
        FieldType::String,
        FieldType::Bool,
        FieldType::Fixed64,
        FieldType::Bytes,
    ];
    (0..n)
        .map(|i| {
            let number = (i + i / 4 + 1) as u32;
            let ty = TYPES[i % TYPES.len()];
            match i % 3 {
                0 => FieldSpec::scalar(number, ty),
                1 => FieldSpec::optional(number, ty),
                _ => FieldSpec::repeated(number, ty),
            }
        })
        .collect()
}
