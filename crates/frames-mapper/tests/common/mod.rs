use std::sync::{Arc, Mutex};

use bson::{DateTime, Document, doc};
use frames_mapper::{Mapper, Projection, Schema};
use frames_query::FindOptions;
use frames_store::{Collection, MemoryStore, Source, StoreError};

pub static DRAGON: Schema =
    Schema::frame("Dragon", "dragons", &["name", "breed"]).with_private(&["breed"]);

pub static INVENTORY: Schema =
    Schema::sub_frame("Inventory", &["gold", "skulls", "keeper"]).with_private(&["gold"]);

pub static LAIR: Schema = Schema::frame("Lair", "lairs", &["name", "inventory"]);

pub static COMPLEX_DRAGON: Schema = Schema::frame(
    "ComplexDragon",
    "dragons",
    &["name", "breed", "dob", "lair", "traits", "rivals", "haunts", "hoards", "misc"],
)
.with_private(&["breed"])
.with_default_projection(lair_with_inventory);

/// `{lair: {$ref: Lair, inventory: {$sub: Inventory}}}`
pub fn lair_with_inventory() -> Projection {
    Projection::new().reference(
        "lair",
        &LAIR,
        Projection::new().embed("inventory", &INVENTORY, Projection::new()),
    )
}

pub const LAIRS: &str = "lairs";
pub const DRAGONS: &str = "dragons";

pub fn lairs() -> Vec<Document> {
    vec![
        doc! { "_id": 10, "name": "Cave", "inventory": { "gold": 1000, "skulls": 100, "keeper": 2 } },
        doc! { "_id": 20, "name": "Castle", "inventory": { "gold": 2000, "skulls": 200 } },
        doc! { "_id": 30, "name": "Crypt", "inventory": { "gold": 3000, "skulls": 300 } },
    ]
}

/// Burt and Albert share the Cave; Nigel's lair no longer exists.
pub fn dragons() -> Vec<Document> {
    vec![
        doc! {
            "_id": 1,
            "name": "Burt",
            "breed": "Cold-drake",
            "dob": DateTime::from_millis(297_907_200_000),
            "lair": 10,
            "traits": ["irritable", "narcissistic"],
            "rivals": [2, 99, 3],
            "haunts": { "summer": 20, "winter": 98 },
            "hoards": {
                "vault": { "gold": 5, "skulls": 1 },
                "pockets": [{ "gold": 1, "skulls": 0 }, { "gold": 2, "skulls": 0 }],
            },
        },
        doc! {
            "_id": 2,
            "name": "Fred",
            "breed": "Fire-drake",
            "lair": 20,
            "traits": ["impulsive", "loud"],
            "rivals": [1],
            "haunts": {},
            "hoards": {},
        },
        doc! {
            "_id": 3,
            "name": "Albert",
            "breed": "Stone-drake",
            "lair": 10,
            "rivals": [],
        },
        doc! {
            "_id": 4,
            "name": "Nigel",
            "breed": "Wyvern",
            "lair": 404,
        },
    ]
}

pub fn seeded_store() -> MemoryStore {
    let store = MemoryStore::new();
    store.create_collection(LAIRS).unwrap().insert_many(lairs()).unwrap();
    store.create_collection(DRAGONS).unwrap().insert_many(dragons()).unwrap();
    store
}

/// A [`Source`] that records every `find` issued through it.
pub struct CountingSource {
    inner: MemoryStore,
    finds: Arc<Mutex<Vec<(String, Document)>>>,
}

impl CountingSource {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            finds: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Number of `find` calls against `collection`.
    pub fn finds(&self, collection: &str) -> usize {
        self.finds
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _)| name == collection)
            .count()
    }

    /// Filters passed to `find` against `collection`, in call order.
    pub fn filters(&self, collection: &str) -> Vec<Document> {
        self.finds
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _)| name == collection)
            .map(|(_, filter)| filter.clone())
            .collect()
    }

    pub fn reset(&self) {
        self.finds.lock().unwrap().clear();
    }
}

impl Source for CountingSource {
    fn collection(&self, name: &str) -> Result<Arc<dyn Collection>, StoreError> {
        Ok(Arc::new(CountingCollection {
            inner: self.inner.collection(name)?,
            finds: Arc::clone(&self.finds),
        }))
    }
}

struct CountingCollection {
    inner: Arc<dyn Collection>,
    finds: Arc<Mutex<Vec<(String, Document)>>>,
}

impl Collection for CountingCollection {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn find(
        &self,
        filter: &Document,
        projection: Option<&Document>,
        options: &FindOptions,
    ) -> Result<Vec<Document>, StoreError> {
        self.finds
            .lock()
            .unwrap()
            .push((self.inner.name().to_string(), filter.clone()));
        self.inner.find(filter, projection, options)
    }

    fn count(&self, filter: &Document) -> Result<u64, StoreError> {
        self.inner.count(filter)
    }
}

/// Routes the mapper's events to the test output. Filter with `RUST_LOG`,
/// e.g. `RUST_LOG=frames_mapper=debug`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A mapper over the seeded store, plus the source so tests can count
/// round trips.
pub fn mapper() -> (Mapper, Arc<CountingSource>) {
    init_tracing();
    let source = Arc::new(CountingSource::new(seeded_store()));
    let mapper = Mapper::new(source.clone());
    (mapper, source)
}
