//! Performance benchmarks for statesync-engine

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;
use statesync_engine::{
    digest, fingerprint_map, layered_hash, merkle_root, ConflictPolicy, HashAlgorithm, Payload,
    RecordStore, StoreSnapshot,
};

fn payload(i: usize) -> Payload {
    json!({
        "app": format!("app-{}", i),
        "env": "prod",
        "replicas": i % 7,
        "tags": ["edge", "crm", format!("t{}", i)],
    })
    .as_object()
    .cloned()
    .unwrap_or_default()
}

fn seeded_store(size: usize) -> RecordStore {
    let mut store = RecordStore::new();
    for i in 0..size {
        store.create("deployment", payload(i));
    }
    store
}

fn bench_hashing(c: &mut Criterion) {
    let mut group = c.benchmark_group("hashing");
    let data = vec![0xabu8; 4096];

    for algorithm in HashAlgorithm::ALL {
        group.bench_with_input(
            BenchmarkId::new("digest_4k", algorithm.name()),
            &algorithm,
            |b, &algorithm| b.iter(|| digest(black_box(&data), algorithm)),
        );
    }

    group.bench_function("fingerprint_record", |b| {
        let data = payload(42);
        b.iter(|| fingerprint_map(black_box(&data)))
    });

    group.bench_function("layered_hash_base_10", |b| {
        b.iter(|| layered_hash(black_box("secret"), black_box("salt"), 10))
    });

    for size in [16usize, 256, 4096].iter() {
        let hashes: Vec<String> = (0..*size)
            .map(|i| digest(i.to_string(), HashAlgorithm::Sha256))
            .collect();
        group.bench_with_input(BenchmarkId::new("merkle_root", size), &hashes, |b, hashes| {
            b.iter(|| merkle_root(black_box(hashes)))
        });
    }

    group.finish();
}

fn bench_store_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_operations");

    group.bench_function("create", |b| {
        let mut store = RecordStore::new();
        let mut i = 0usize;
        b.iter(|| {
            i += 1;
            store.create(black_box("deployment"), payload(i)).version
        })
    });

    group.bench_function("get_record", |b| {
        let store = seeded_store(1000);
        let id = store.records().next().map(|r| r.id.clone()).unwrap_or_default();
        b.iter(|| store.get(black_box(&id)).is_some())
    });

    group.bench_function("query_window", |b| {
        let store = seeded_store(1000);
        b.iter(|| {
            store
                .query()
                .of_type("deployment")
                .filter(|r| r.data["replicas"].as_u64() == Some(3))
                .offset(10)
                .limit(20)
                .count()
        })
    });

    group.finish();
}

fn bench_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge");

    for size in [10usize, 100, 500].iter() {
        group.bench_with_input(BenchmarkId::new("merge_remote", size), size, |b, &size| {
            let local = seeded_store(size);
            let remote: Vec<_> = local
                .records()
                .enumerate()
                .map(|(i, r)| {
                    let mut r = r.clone();
                    if i % 3 == 0 {
                        r.apply_patch(payload(i + 10_000), r.updated_at);
                    }
                    r
                })
                .collect();

            b.iter(|| {
                let mut store = local.clone();
                store.merge_remote("kv", black_box(remote.clone()), ConflictPolicy::Latest)
            })
        });
    }

    group.finish();
}

fn bench_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot");

    for size in [100usize, 1000].iter() {
        let store = seeded_store(*size);

        group.bench_with_input(BenchmarkId::new("export", size), &store, |b, store| {
            b.iter(|| store.export())
        });

        let json = store.export().to_json().unwrap_or_default();
        group.bench_with_input(BenchmarkId::new("import", size), &json, |b, json| {
            b.iter(|| {
                let mut restored = RecordStore::new();
                StoreSnapshot::from_json(black_box(json)).and_then(|s| restored.import(s))
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_hashing,
    bench_store_operations,
    bench_merge,
    bench_snapshot
);
criterion_main!(benches);
