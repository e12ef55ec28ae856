use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use engine::Engine;
use tempfile::tempdir;

const N_KEYS: i64 = 10_000;
const BENCH_CAPACITY: usize = 4096;

/// Spread keys around so pages and bloom slots see varied bit patterns.
fn key_for(i: i64) -> i64 {
    i * 2_654_435_761 % 1_000_000_007
}

fn loaded_engine() -> (tempfile::TempDir, Engine) {
    let dir = tempdir().unwrap();
    let mut engine = Engine::open(dir.path().join("db"), BENCH_CAPACITY).unwrap();
    for i in 0..N_KEYS {
        engine.put(key_for(i), i).unwrap();
    }
    engine.flush().unwrap();
    (dir, engine)
}

fn engine_put_benchmark(c: &mut Criterion) {
    c.bench_function("engine_put_10k", |b| {
        b.iter_batched(
            || {
                let dir = tempdir().unwrap();
                let engine = Engine::open(dir.path().join("db"), BENCH_CAPACITY).unwrap();
                (dir, engine)
            },
            |(_dir, mut engine)| {
                for i in 0..N_KEYS {
                    engine.put(key_for(i), i).unwrap();
                }
            },
            BatchSize::SmallInput,
        );
    });
}

fn engine_get_hit_benchmark(c: &mut Criterion) {
    c.bench_function("engine_get_hit_10k", |b| {
        b.iter_batched(
            loaded_engine,
            |(_dir, engine)| {
                for i in 0..N_KEYS {
                    assert!(engine.get(key_for(i)).unwrap().is_some());
                }
            },
            BatchSize::LargeInput,
        );
    });
}

fn engine_get_hit_btree_benchmark(c: &mut Criterion) {
    c.bench_function("engine_get_hit_btree_10k", |b| {
        b.iter_batched(
            || {
                let (dir, mut engine) = loaded_engine();
                engine.set_use_btree(true);
                (dir, engine)
            },
            |(_dir, engine)| {
                for i in 0..N_KEYS {
                    assert!(engine.get(key_for(i)).unwrap().is_some());
                }
            },
            BatchSize::LargeInput,
        );
    });
}

fn engine_get_miss_benchmark(c: &mut Criterion) {
    c.bench_function("engine_get_miss_10k", |b| {
        b.iter_batched(
            loaded_engine,
            |(_dir, engine)| {
                for i in 0..N_KEYS {
                    // Beyond the modulus, so never written.
                    assert!(engine.get(2_000_000_000 + i).unwrap().is_none());
                }
            },
            BatchSize::LargeInput,
        );
    });
}

fn engine_scan_benchmark(c: &mut Criterion) {
    c.bench_function("engine_scan_windows", |b| {
        b.iter_batched(
            loaded_engine,
            |(_dir, engine)| {
                for lo in (0..1_000_000_000i64).step_by(100_000_000) {
                    let results = engine.scan(lo, lo + 1_000_000).unwrap();
                    criterion::black_box(results);
                }
            },
            BatchSize::LargeInput,
        );
    });
}

criterion_group!(
    benches,
    engine_put_benchmark,
    engine_get_hit_benchmark,
    engine_get_hit_btree_benchmark,
    engine_get_miss_benchmark,
    engine_scan_benchmark
);
criterion_main!(benches);
