mod collection;
mod store;

pub use collection::MemoryCollection;
pub use store::MemoryStore;
