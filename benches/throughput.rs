//! Throughput Benchmark for EmberCache
//!
//! This benchmark measures the performance of the engine under various
//! workloads. Capacity bounds are raised well past the working set so LRU
//! eviction never runs inside a measurement.
//!
//! Engine tracing is routed through `RUST_LOG`; it stays silent unless a
//! filter is set, so enabling it shows how much logging costs a hot path.

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use embercache::storage::CacheEngine;
use std::sync::{Arc, Once};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const UNBOUNDED: usize = 10_000_000;

fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .try_init();
    });
}

/// Benchmark set operations
fn bench_set(c: &mut Criterion) {
    init_tracing();
    let engine = Arc::new(CacheEngine::with_max_items(UNBOUNDED));

    let mut group = c.benchmark_group("set");
    group.throughput(Throughput::Elements(1));

    group.bench_function("set_small", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = Bytes::from(format!("key:{}", i));
            let value = Bytes::from("small_value");
            engine.set(key, value);
            i += 1;
        });
    });

    group.bench_function("set_medium", |b| {
        let mut i = 0u64;
        let value = Bytes::from("x".repeat(1024)); // 1KB value
        b.iter(|| {
            let key = Bytes::from(format!("key:{}", i));
            engine.set(key, value.clone());
            i += 1;
        });
    });

    group.bench_function("set_large", |b| {
        let mut i = 0u64;
        let value = Bytes::from("x".repeat(64 * 1024)); // 64KB value
        b.iter(|| {
            let key = Bytes::from(format!("key:{}", i));
            engine.set(key, value.clone());
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark get operations, including the zero-copy paths
fn bench_get(c: &mut Criterion) {
    init_tracing();
    let engine = Arc::new(CacheEngine::with_max_items(UNBOUNDED));

    // Pre-populate with data
    for i in 0..100_000 {
        let key = Bytes::from(format!("key:{}", i));
        let value = Bytes::from(format!("value:{}", i));
        engine.set(key, value);
    }

    let mut group = c.benchmark_group("get");
    group.throughput(Throughput::Elements(1));

    group.bench_function("get_existing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = format!("key:{}", i % 100_000);
            black_box(engine.get(key.as_bytes()));
            i += 1;
        });
    });

    group.bench_function("get_missing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = format!("missing:{}", i);
            black_box(engine.get(key.as_bytes()));
            i += 1;
        });
    });

    group.bench_function("get_into_existing", |b| {
        let mut i = 0u64;
        let mut dst = [0u8; 64];
        b.iter(|| {
            let key = format!("key:{}", i % 100_000);
            black_box(engine.get_into(key.as_bytes(), &mut dst));
            i += 1;
        });
    });

    group.bench_function("get_lease_existing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = format!("key:{}", i % 100_000);
            black_box(engine.get_lease(key.as_bytes()));
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark mixed workload (80% reads, 20% writes)
fn bench_mixed(c: &mut Criterion) {
    init_tracing();
    let engine = Arc::new(CacheEngine::with_max_items(UNBOUNDED));

    // Pre-populate
    for i in 0..10_000 {
        let key = Bytes::from(format!("key:{}", i));
        let value = Bytes::from(format!("value:{}", i));
        engine.set(key, value);
    }

    let mut group = c.benchmark_group("mixed");
    group.throughput(Throughput::Elements(1));

    group.bench_function("80_read_20_write", |b| {
        let mut i = 0u64;
        b.iter(|| {
            if i % 5 == 0 {
                // 20% writes
                let key = Bytes::from(format!("new:{}", i));
                engine.set(key, Bytes::from("value"));
            } else {
                // 80% reads
                let key = format!("key:{}", i % 10_000);
                black_box(engine.get(key.as_bytes()));
            }
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark composite types
fn bench_composite(c: &mut Criterion) {
    init_tracing();
    let engine = Arc::new(CacheEngine::with_max_items(UNBOUNDED));

    let mut group = c.benchmark_group("composite");
    group.throughput(Throughput::Elements(1));

    group.bench_function("lpush_single_list", |b| {
        let key = Bytes::from("bench:list");
        b.iter(|| {
            black_box(engine.lpush(key.clone(), Bytes::from("item")));
        });
    });

    group.bench_function("hset_spread", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = Bytes::from(format!("hash:{}", i % 1000));
            black_box(engine.hset(key, Bytes::from("field"), Bytes::from("value")));
            i += 1;
        });
    });

    group.bench_function("xadd_single_stream", |b| {
        let key = Bytes::from("bench:stream");
        b.iter(|| {
            black_box(engine.xadd(key.clone(), Bytes::from("payload")));
        });
    });

    group.finish();
}

/// Benchmark concurrent access
fn bench_concurrent(c: &mut Criterion) {
    use std::thread;

    init_tracing();
    let mut group = c.benchmark_group("concurrent");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("4_threads_mixed", |b| {
        b.iter(|| {
            let engine = Arc::new(CacheEngine::with_max_items(UNBOUNDED));
            let handles: Vec<_> = (0..4)
                .map(|t| {
                    let engine = Arc::clone(&engine);
                    thread::spawn(move || {
                        for i in 0..10_000 {
                            let key = Bytes::from(format!("key:{}:{}", t, i));
                            engine.set(key.clone(), Bytes::from("value"));
                            engine.get(&key);
                        }
                    })
                })
                .collect();

            for handle in handles {
                handle.join().unwrap();
            }

            black_box(engine.len());
        });
    });

    group.finish();
}

/// Benchmark expiry operations
fn bench_expiry(c: &mut Criterion) {
    init_tracing();
    let engine = Arc::new(CacheEngine::with_max_items(UNBOUNDED));

    let mut group = c.benchmark_group("expiry");
    group.throughput(Throughput::Elements(1));

    group.bench_function("set_with_ttl", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = Bytes::from(format!("key:{}", i));
            engine.set_with_ttl(key, Bytes::from("value"), Duration::from_secs(3600));
            i += 1;
        });
    });

    group.bench_function("expire_existing", |b| {
        // Pre-create keys
        for i in 0..10_000 {
            let key = Bytes::from(format!("expire:{}", i));
            engine.set(key, Bytes::from("value"));
        }

        let mut i = 0u64;
        b.iter(|| {
            let key = format!("expire:{}", i % 10_000);
            engine.expire(key.as_bytes(), Duration::from_secs(3600));
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark the indexed query path
fn bench_find(c: &mut Criterion) {
    init_tracing();
    let engine = Arc::new(CacheEngine::with_max_items(UNBOUNDED));

    for i in 0..10_000 {
        let key = Bytes::from(format!("doc:{}", i));
        let doc = format!(r#"{{"age": {}, "name": "user{}"}}"#, i % 100, i);
        engine.set(key, Bytes::from(doc));
    }
    engine.create_numeric_index("age");

    let mut group = c.benchmark_group("find");

    group.bench_function("find_narrow", |b| {
        b.iter(|| {
            black_box(engine.find_keys("age == 42"));
        });
    });

    group.bench_function("find_wide", |b| {
        b.iter(|| {
            black_box(engine.find_keys("age >= 50"));
        });
    });

    group.bench_function("indexed_write", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = Bytes::from(format!("doc:{}", i % 10_000));
            let doc = format!(r#"{{"age": {}}}"#, i % 100);
            engine.set(key, Bytes::from(doc));
            i += 1;
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_set,
    bench_get,
    bench_mixed,
    bench_composite,
    bench_concurrent,
    bench_expiry,
    bench_find,
);

criterion_main!(benches);
