//! Storage backend benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use hybridtx_bench::pattern_data;
use hybridtx_storage::{FileBackend, InMemoryBackend, StorageBackend};
use tempfile::TempDir;

/// Benchmark InMemoryBackend appends of WAL-sized lines.
fn bench_inmemory_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("inmemory_append");

    for size in [16, 64, 512].iter() {
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let mut backend = InMemoryBackend::new();
            let data = pattern_data(size);

            b.iter(|| black_box(backend.append(black_box(&data)).unwrap()));
        });
    }

    group.finish();
}

/// Benchmark FileBackend append followed by sync, the cost of one durable
/// WAL line.
fn bench_file_append_sync(c: &mut Criterion) {
    let mut group = c.benchmark_group("file_append_sync");
    group.sample_size(20);

    for size in [16, 512].iter() {
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let temp_dir = TempDir::new().unwrap();
            let mut backend = FileBackend::open(&temp_dir.path().join("bench.log")).unwrap();
            let data = pattern_data(size);

            b.iter(|| {
                backend.append(black_box(&data)).unwrap();
                backend.sync().unwrap();
            });
        });
    }

    group.finish();
}

/// Benchmark reading a whole log, as done by the startup audit.
fn bench_read_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("read_all");

    for lines in [1_000, 100_000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(lines), lines, |b, &lines| {
            let temp_dir = TempDir::new().unwrap();
            let mut backend = FileBackend::open(&temp_dir.path().join("bench.log")).unwrap();
            for i in 0..lines {
                backend
                    .append(format!("COMMIT txn-{i}\n").as_bytes())
                    .unwrap();
            }
            backend.sync().unwrap();

            b.iter(|| black_box(backend.read_all().unwrap()));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_inmemory_append,
    bench_file_append_sync,
    bench_read_all
);
criterion_main!(benches);
