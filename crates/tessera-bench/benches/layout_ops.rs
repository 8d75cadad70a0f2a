//! Criterion micro-benchmarks for mini-table building and the
//! mini-descriptor codec.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use tessera_bench::wide_table_specs;
use tessera_defs::DefPool;
use tessera_layout::{decode_table, encode_table, MiniTableBuilder};
use tessera_test_utils::schemas;

/// Benchmark: build a 64-field table.
fn bench_build_64_fields(c: &mut Criterion) {
    let specs = wide_table_specs(64);

    c.bench_function("layout_build_64_fields", |b| {
        b.iter(|| {
            let mut builder = MiniTableBuilder::new(specs.len());
            for spec in &specs {
                builder.add_field(*spec).unwrap();
            }
            black_box(builder.finish().unwrap());
        });
    });
}

/// Benchmark: decode a 64-field table's mini-descriptor.
fn bench_decode_table_64(c: &mut Criterion) {
    let specs = wide_table_specs(64);
    let mut builder = MiniTableBuilder::new(specs.len());
    for spec in &specs {
        builder.add_field(*spec).unwrap();
    }
    let encoded = encode_table(&builder.finish().unwrap());

    c.bench_function("layout_decode_table_64", |b| {
        b.iter(|| {
            black_box(decode_table(black_box(&encoded)).unwrap());
        });
    });
}

/// Benchmark: add two schema files to a fresh pool.
fn bench_pool_add_files(c: &mut Criterion) {
    let geo = schemas::geo();
    let catalog = schemas::catalog();

    c.bench_function("layout_pool_add_files", |b| {
        b.iter(|| {
            let mut pool = DefPool::new();
            pool.add_file(&geo).unwrap();
            pool.add_file(&catalog).unwrap();
            black_box(pool.tables().len());
        });
    });
}

criterion_group!(
    benches,
    bench_build_64_fields,
    bench_decode_table_64,
    bench_pool_add_files
);
criterion_main!(benches);
