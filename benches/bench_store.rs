//! Micro benchmarks for the rate limit store.
//! Pure CPU - no network, no runtime, no eviction task.
//!
//! ```bash
//! cargo bench --bench bench_store
//! ```

use std::time::Duration;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use tollgate_lib::security::rate_limit::{InMemoryStore, StateStore};

// ---------------------------------------------------------------------------
// Fixture: a store pre-populated with N distinct client keys
// ---------------------------------------------------------------------------
fn populated_store(keys: usize) -> (InMemoryStore, Vec<String>) {
    let store = InMemoryStore::new(u64::MAX, Duration::from_millis(1));
    let names: Vec<String> = (0..keys)
        .map(|i| format!("10.{}.{}.{}", (i >> 16) & 0xff, (i >> 8) & 0xff, i & 0xff))
        .collect();
    for name in &names {
        store.increment(name);
    }
    (store, names)
}

fn bench_increment(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_increment");
    for keys in [1usize, 1_000, 100_000] {
        let (store, names) = populated_store(keys);
        let mut i = 0usize;
        group.bench_with_input(BenchmarkId::from_parameter(keys), &keys, |b, _| {
            b.iter(|| {
                i = (i + 1) % names.len();
                store.increment(std::hint::black_box(&names[i]))
            });
        });
    }
    group.finish();
}

fn bench_available(c: &mut Criterion) {
    let (store, names) = populated_store(1_000);
    c.bench_function("store_available", |b| {
        b.iter(|| store.available(std::hint::black_box(&names[500])));
    });
}

fn bench_stats(c: &mut Criterion) {
    let (store, _) = populated_store(10_000);
    c.bench_function("store_stats_10k", |b| {
        b.iter(|| store.stats().len());
    });
}

criterion_group!(store_benches, bench_increment, bench_available, bench_stats);
criterion_main!(store_benches);
