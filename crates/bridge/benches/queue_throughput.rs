use bridge::FrameQueue;
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

/// Record the size of a capture frame descriptor (80 bytes)
#[derive(Debug, Clone, Copy, Default)]
struct Record {
    words: [u64; 10],
}

/// Benchmark a put immediately followed by a get, the steady state of a
/// consumer keeping up with the producer
fn benchmark_put_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("put_get");

    for capacity in [4usize, 25, 256] {
        let queue = FrameQueue::<Record>::new(capacity).unwrap();
        let mut out = [Record::default(); 1];

        group.bench_with_input(
            BenchmarkId::new("unit_window", capacity),
            &capacity,
            |b, _| {
                let mut n = 0u64;
                b.iter(|| {
                    let mut record = Record::default();
                    record.words[0] = n;
                    queue.put(black_box(record)).unwrap();
                    black_box(queue.get(&mut out).unwrap());
                    n += 1;
                });
            },
        );
    }

    group.finish();
}

/// Benchmark rejected puts against a full queue (the drop path)
fn benchmark_put_full(c: &mut Criterion) {
    let queue = FrameQueue::<Record>::new(25).unwrap();
    while queue.put(Record::default()).is_ok() {}

    c.bench_function("put_full", |b| {
        b.iter(|| black_box(queue.put(black_box(Record::default())).is_err()));
    });
}

/// Benchmark sliding window reads of increasing size
fn benchmark_window_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("window_read");

    for window in [1usize, 5, 25] {
        let queue = FrameQueue::<Record>::new(25).unwrap();
        let mut out = vec![Record::default(); window];

        group.bench_with_input(BenchmarkId::new("window", window), &window, |b, _| {
            b.iter(|| {
                while queue.put(Record::default()).is_ok() {}
                black_box(queue.get(&mut out).unwrap());
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_put_get,
    benchmark_put_full,
    benchmark_window_read
);
criterion_main!(benches);
