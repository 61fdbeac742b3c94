use std::sync::Arc;

use bson::{Document, doc};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use frames_mapper::{Mapper, PathCache, Projection, Schema, compile};
use frames_query::FindOptions;
use frames_store::MemoryStore;

static INVENTORY: Schema = Schema::sub_frame("Inventory", &["gold", "skulls"]);
static LAIR: Schema = Schema::frame("Lair", "lairs", &["name", "inventory"]);
static DRAGON: Schema = Schema::frame("Dragon", "dragons", &["name", "lair", "rivals"]);

const LAIRS: i64 = 50;

fn lairs() -> Vec<Document> {
    (0..LAIRS)
        .map(|i| {
            doc! {
                "_id": i,
                "name": format!("Lair {i}"),
                "inventory": { "gold": i * 100, "skulls": i },
            }
        })
        .collect()
}

fn dragons(n: usize) -> Vec<Document> {
    (0..n as i64)
        .map(|i| {
            let rivals = vec![(i + 1) % n as i64, (i + 7) % n as i64];
            doc! {
                "_id": i,
                "name": format!("Dragon {i}"),
                "lair": i % LAIRS,
                "rivals": rivals,
            }
        })
        .collect()
}

fn seeded_mapper(n: usize) -> Mapper {
    let store = MemoryStore::new();
    store.create_collection("lairs").unwrap().insert_many(lairs()).unwrap();
    store.create_collection("dragons").unwrap().insert_many(dragons(n)).unwrap();
    Mapper::new(Arc::new(store))
}

fn lair_with_inventory() -> Projection {
    Projection::new().reference(
        "lair",
        &LAIR,
        Projection::new().embed("inventory", &INVENTORY, Projection::new()),
    )
}

fn bench_compile(c: &mut Criterion) {
    let projection = lair_with_inventory().include("name").reference("rivals", &DRAGON, Projection::new());
    let declared = DRAGON.declared_fields();
    c.bench_function("mapper/compile", |b| b.iter(|| compile(Some(&projection), &declared)));
}

fn bench_path_cache(c: &mut Criterion) {
    let cache = PathCache::new();
    let doc = frames_mapper::Document::from(doc! { "lair": { "inventory": { "gold": 1 } } });
    c.bench_function("mapper/value_at", |b| {
        b.iter(|| cache.value_at("lair.inventory.gold", &doc))
    });
}

fn bench_many(c: &mut Criterion) {
    let mut group = c.benchmark_group("mapper/many");
    for n in [100, 1_000] {
        let mapper = seeded_mapper(n);
        let plain = Projection::new();
        let nested = lair_with_inventory();
        let rivals = Projection::new().reference("rivals", &DRAGON, Projection::new());

        group.bench_with_input(BenchmarkId::new("plain", n), &n, |b, _| {
            b.iter(|| mapper.many(&DRAGON, doc! {}, Some(&plain), &FindOptions::default()).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("reference_embed", n), &n, |b, _| {
            b.iter(|| mapper.many(&DRAGON, doc! {}, Some(&nested), &FindOptions::default()).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("reference_list", n), &n, |b, _| {
            b.iter(|| mapper.many(&DRAGON, doc! {}, Some(&rivals), &FindOptions::default()).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_compile, bench_path_cache, bench_many);
criterion_main!(benches);
