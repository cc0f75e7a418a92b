//! Tile Cache Benchmarks
//!
//! Performance benchmarks for the LRU tile cache

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tessera_core::TileCache;

fn bench_touch_oldest(c: &mut Criterion) {
    let mut group = c.benchmark_group("touch_oldest");

    for capacity in [64, 256, 1024].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(capacity), capacity, |b, &capacity| {
            let mut cache = TileCache::new(capacity).unwrap();
            b.iter(|| {
                let slot = cache.oldest_slot();
                black_box(cache.touch(slot))
            });
        });
    }

    group.finish();
}

fn bench_touch_scattered(c: &mut Criterion) {
    let mut group = c.benchmark_group("touch_scattered");

    for capacity in [64, 256, 1024].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(capacity), capacity, |b, &capacity| {
            let mut cache = TileCache::new(capacity).unwrap();
            let mut slot = 0usize;
            b.iter(|| {
                slot = (slot * 31 + 17) % capacity;
                black_box(cache.touch(slot))
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_touch_oldest, bench_touch_scattered);
criterion_main!(benches);
