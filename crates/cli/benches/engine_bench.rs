use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use engine::Db;
use tempfile::tempdir;

const N_KEYS: usize = 2_000;
const VALUE_SIZE: usize = 100;

fn engine_put_benchmark(c: &mut Criterion) {
    c.bench_function("engine_put_2k", |b| {
        b.iter_batched(
            || {
                let dir = tempdir().unwrap();
                let mut db = Db::open(dir.path().join("bench.kv")).unwrap();
                db.use_table("bench").unwrap();
                (dir, db)
            },
            |(_dir, mut db)| {
                for i in 0..N_KEYS {
                    db.put(format!("key{:08}", i).as_bytes(), &vec![b'x'; VALUE_SIZE])
                        .unwrap();
                }
            },
            BatchSize::SmallInput,
        );
    });
}

fn engine_get_benchmark(c: &mut Criterion) {
    c.bench_function("engine_get_hit_2k", |b| {
        b.iter_batched(
            || {
                let dir = tempdir().unwrap();
                // small threshold so most reads go through segments
                let mut db =
                    Db::open_with_max_segment_size(dir.path().join("bench.kv"), 16_384).unwrap();
                db.use_table("bench").unwrap();
                for i in 0..N_KEYS {
                    db.put(format!("key{:08}", i).as_bytes(), &vec![b'x'; VALUE_SIZE])
                        .unwrap();
                }
                (dir, db)
            },
            |(_dir, db)| {
                for i in 0..N_KEYS {
                    let key = format!("key{:08}", i).into_bytes();
                    assert!(db.get(&key).unwrap().is_some());
                }
            },
            BatchSize::LargeInput,
        );
    });
}

criterion_group!(benches, engine_put_benchmark, engine_get_benchmark);
criterion_main!(benches);
