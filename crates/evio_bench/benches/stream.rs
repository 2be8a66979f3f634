//! Stream write, read and random-access benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use evio_bench::utils::generate_events;
use evio_core::{InMemoryBackend, OpenOptions, Registry};
use tempfile::TempDir;

fn write_buffer(events: &[Vec<u32>]) -> InMemoryBackend {
    let registry = Registry::new();
    let buffer = InMemoryBackend::new();
    let handle = registry.open(buffer.clone(), "wb").unwrap();
    for event in events {
        registry.write(handle, event).unwrap();
    }
    registry.close(handle).unwrap();
    buffer
}

/// Benchmark writing events into a memory buffer.
fn bench_write_buffer(c: &mut Criterion) {
    let mut group = c.benchmark_group("write_buffer");

    for words in [16, 256, 4096].iter() {
        let events = generate_events(1000, *words);
        group.throughput(Throughput::Elements(events.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(words), &events, |b, events| {
            b.iter(|| black_box(write_buffer(events)));
        });
    }

    group.finish();
}

/// Benchmark writing events to a file.
fn bench_write_file(c: &mut Criterion) {
    let mut group = c.benchmark_group("write_file");
    group.sample_size(20);

    for block_words in [1024u32, 64_000].iter() {
        let events = generate_events(2000, 256);
        group.throughput(Throughput::Bytes(2000 * 258 * 4));
        group.bench_with_input(
            BenchmarkId::from_parameter(block_words),
            block_words,
            |b, &block_words| {
                let dir = TempDir::new().unwrap();
                let registry = Registry::new();
                let options = OpenOptions::new().block_words(block_words);
                let mut n = 0;
                b.iter(|| {
                    let path = dir.path().join(format!("bench_{n}.evio"));
                    n += 1;
                    let handle = registry.open_with(path.as_path(), "w", &options).unwrap();
                    for event in &events {
                        registry.write(handle, black_box(event)).unwrap();
                    }
                    registry.close(handle).unwrap();
                });
            },
        );
    }

    group.finish();
}

/// Benchmark sequential reads, copying and in place.
fn bench_read_sequential(c: &mut Criterion) {
    let mut group = c.benchmark_group("read_sequential");
    let buffer = write_buffer(&generate_events(5000, 128));
    group.throughput(Throughput::Elements(5000));

    group.bench_function("alloc", |b| {
        let registry = Registry::new();
        b.iter(|| {
            let handle = registry.open(buffer.clone(), "rb").unwrap();
            while let Some(event) = registry.read_alloc(handle).unwrap() {
                black_box(event);
            }
            registry.close(handle).unwrap();
        });
    });

    group.bench_function("no_copy", |b| {
        let registry = Registry::new();
        b.iter(|| {
            let handle = registry.open(buffer.clone(), "rb").unwrap();
            while let Some(first) = registry.read_no_copy(handle, |event| event[0]).unwrap() {
                black_box(first);
            }
            registry.close(handle).unwrap();
        });
    });

    group.finish();
}

/// Benchmark building the random-access index.
fn bench_random_index(c: &mut Criterion) {
    let mut group = c.benchmark_group("random_index");

    for count in [100, 10_000].iter() {
        let buffer = write_buffer(&generate_events(*count, 32));
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &buffer, |b, buffer| {
            let registry = Registry::new();
            b.iter(|| {
                let handle = registry.open(buffer.clone(), "rab").unwrap();
                black_box(registry.event_table(handle).unwrap());
                registry.close(handle).unwrap();
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_write_buffer,
    bench_write_file,
    bench_read_sequential,
    bench_random_index,
);

criterion_main!(benches);
