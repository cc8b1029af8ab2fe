//! Benchmarks for the value codec and windowed reads.
//!
//! Run with: cargo bench --bench codec

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use cfbridge::codec::{decode, encode};
use cfbridge::convention::DEFAULT_FILL_VALUE;
use cfbridge::storage::{DataType, MemoryStorage, Storage};
use cfbridge::window::{read_window, Window};

/// Grid with every tenth value missing
fn generate_grid(size: usize) -> Vec<f64> {
    (0..size)
        .map(|i| {
            if i % 10 == 0 {
                DEFAULT_FILL_VALUE
            } else {
                (i as f64 * 0.01).sin() * 100.0
            }
        })
        .collect()
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");

    for size in [1_000, 100_000, 1_000_000] {
        let raw = generate_grid(size);
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("fill_only", size), &raw, |b, raw| {
            b.iter(|| decode(black_box(raw.clone()), DEFAULT_FILL_VALUE, 1.0, 0.0))
        });

        group.bench_with_input(BenchmarkId::new("scaled", size), &raw, |b, raw| {
            b.iter(|| decode(black_box(raw.clone()), DEFAULT_FILL_VALUE, 0.01, 273.15))
        });
    }

    group.finish();
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");

    for size in [1_000, 100_000, 1_000_000] {
        let values = decode(generate_grid(size), DEFAULT_FILL_VALUE, 1.0, 0.0);
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("with_nan", size), &values, |b, values| {
            b.iter(|| encode(black_box(values), DEFAULT_FILL_VALUE).len())
        });
    }

    group.finish();
}

fn bench_time_slice(c: &mut Criterion) {
    let (times, rows, columns) = (24, 180, 360);
    let mut storage = MemoryStorage::new();
    storage.add_dimension("time", times).unwrap();
    storage.add_dimension("lat", rows).unwrap();
    storage.add_dimension("lon", columns).unwrap();
    storage
        .add_variable("t2m", DataType::Double, &["time", "lat", "lon"])
        .unwrap();
    storage
        .write(
            "t2m",
            &[0, 0, 0],
            &[times, rows, columns],
            &generate_grid(times * rows * columns),
        )
        .unwrap();
    let variable = storage.find_variable("t2m").unwrap();

    let mut group = c.benchmark_group("time_slice");
    group.throughput(Throughput::Elements((rows * columns) as u64));

    group.bench_function("read", |b| {
        let window = Window::for_time(&variable, 0, 12).unwrap();
        b.iter(|| read_window(&storage, &variable, black_box(&window), None).unwrap())
    });

    group.bench_function("read_flipped", |b| {
        let window = Window::for_time(&variable, 0, 12).unwrap();
        b.iter(|| read_window(&storage, &variable, black_box(&window), Some(1)).unwrap())
    });

    group.finish();
}

criterion_group!(benches, bench_decode, bench_encode, bench_time_slice);
criterion_main!(benches);
