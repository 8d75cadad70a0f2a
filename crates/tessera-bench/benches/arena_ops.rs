//! Criterion micro-benchmarks for arena allocation and fusing.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use tessera_arena::{Arena, ArenaConfig};

/// Benchmark: 1K small allocations in a fresh arena.
fn bench_alloc_1k_small(c: &mut Criterion) {
    c.bench_function("arena_alloc_1k_small", |b| {
        b.iter(|| {
            let arena = Arena::new();
            for i in 0..1000usize {
                black_box(arena.alloc(8 + i % 24, 8).unwrap());
            }
            black_box(arena.bytes_used());
        });
    });
}

/// Benchmark: write then read back a 64-byte allocation.
fn bench_write_read_64(c: &mut Criterion) {
    let arena = Arena::new();
    let r = arena.alloc(64, 8).unwrap();
    let data = [0xA5u8; 64];
    let mut out = [0u8; 64];

    c.bench_function("arena_write_read_64", |b| {
        b.iter(|| {
            arena.write(r, 0, black_box(&data)).unwrap();
            arena.read(r, 0, &mut out).unwrap();
            black_box(&out);
        });
    });
}

/// Benchmark: fuse a chain of 64 arenas.
fn bench_fuse_chain_64(c: &mut Criterion) {
    c.bench_function("arena_fuse_chain_64", |b| {
        b.iter(|| {
            let arenas: Vec<Arena> = (0..64).map(|_| Arena::with_config(ArenaConfig::new()).unwrap()).collect();
            for pair in arenas.windows(2) {
                pair[0].fuse(&pair[1]);
            }
            black_box(arenas[0].group_size());
        });
    });
}

criterion_group!(
    benches,
    bench_alloc_1k_small,
    bench_write_read_64,
    bench_fuse_chain_64
);
criterion_main!(benches);
