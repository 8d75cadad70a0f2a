//! Criterion micro-benchmarks for wire decoding and encoding.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use tessera_arena::Arena;
use tessera_bench::{path_payload, path_pool};
use tessera_wire::{decode_new, encode, DecodeOptions, EncodeOptions};

/// Benchmark: decode a path of 1K points.
fn bench_decode_path_1k(c: &mut Criterion) {
    let pool = path_pool();
    let payload = path_payload(&pool, 1000);
    let table = pool.find_message("geo.Path").unwrap().table();
    let options = DecodeOptions::new();

    c.bench_function("wire_decode_path_1k", |b| {
        b.iter(|| {
            let arena = Arena::new();
            let msg = decode_new(black_box(&payload), &arena, pool.tables(), table, &options).unwrap();
            black_box(msg.ptr());
        });
    });
}

/// Benchmark: encode a path of 1K points.
fn bench_encode_path_1k(c: &mut Criterion) {
    let pool = path_pool();
    let payload = path_payload(&pool, 1000);
    let table = pool.find_message("geo.Path").unwrap().table();
    let arena = Arena::new();
    let msg = decode_new(&payload, &arena, pool.tables(), table, &DecodeOptions::new()).unwrap();
    let options = EncodeOptions::new();

    c.bench_function("wire_encode_path_1k", |b| {
        b.iter(|| {
            black_box(encode(msg, &options).unwrap());
        });
    });
}

criterion_group!(benches, bench_decode_path_1k, bench_encode_path_1k);
criterion_main!(benches);
