use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;
use std::hint::black_box;
use std::sync::Arc;

use keepsake::{
    Backend, Browser, Cell, Memo, Registry, Signal, StorageArea, StorageMedium, StoreContext,
    WebStorage,
};

fn signal_read_benchmark(c: &mut Criterion) {
    let signal: Signal<i32> = Signal::new(42);

    c.bench_function("signal_read", |b| {
        b.iter(|| {
            black_box(signal.get());
        });
    });
}

fn memo_computation_benchmark(c: &mut Criterion) {
    let a: Signal<i32> = Signal::new(5);
    let b: Signal<i32> = Signal::new(10);

    let sum = Memo::new({
        let a = a.clone();
        let b = b.clone();
        move || a.get() + b.get()
    });

    c.bench_function("memo_computation", |b| {
        b.iter(|| {
            black_box(sum.get());
        });
    });
}

fn cell_effects_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("cell_effects");

    for effect_count in [1, 10, 100].iter() {
        let cell = Cell::new(0usize);
        for _ in 0..*effect_count {
            cell.register_effect(|value| {
                black_box(value);
            })
            .unwrap();
        }

        group.bench_with_input(
            BenchmarkId::from_parameter(effect_count),
            effect_count,
            |b, _| {
                let mut i = 0;
                b.iter(|| {
                    cell.set(black_box(i)).unwrap();
                    i += 1;
                });
            },
        );
    }
    group.finish();
}

fn local_store_write_benchmark(c: &mut Criterion) {
    let storage = WebStorage::new(StorageArea::Local);
    let medium = Arc::new(StorageMedium::new(storage));
    let store = Backend::open(medium, &StoreContext::default(), "counter", 0u64);

    c.bench_function("local_store_write", |b| {
        let mut i = 0;
        b.iter(|| {
            store.set(black_box(i)).unwrap();
            i += 1;
        });
    });
}

fn registry_create_benchmark(c: &mut Criterion) {
    let browser = Browser::default();

    c.bench_function("registry_create", |b| {
        b.iter(|| {
            let registry = Registry::new(browser.clone());
            for kind in ["memory", "local", "session", "cookie", "url"] {
                registry.create(kind, kind, Some(json!(1))).unwrap();
            }
            registry.clear_all();
        });
    });
}

criterion_group!(
    benches,
    signal_read_benchmark,
    memo_computation_benchmark,
    cell_effects_benchmark,
    local_store_write_benchmark,
    registry_create_benchmark,
);
criterion_main!(benches);
