//! Request Queue Benchmarks
//!
//! Performance benchmarks for request submission and draining

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tessera_core::{PageProducer, RequestPriority, RequestQueue};

fn bench_submit_sort_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("submit_sort_drain");

    for count in [100, 1000, 10000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            b.iter_batched(
                || (PageProducer::new(256, 9), RequestQueue::new()),
                |(mut producer, mut queue)| {
                    for i in 0..count {
                        let x = (i * 7) % 256;
                        let y = (i * 13) % 256;
                        queue.submit(&mut producer, x, y, (i % 9) as u32);
                    }
                    queue.sort(RequestPriority::FineFirst);
                    while let Some(request) = queue.pop() {
                        black_box(request);
                    }
                },
                criterion::BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_submit_sort_drain);
criterion_main!(benches);
