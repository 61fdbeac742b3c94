mod error;
mod filter;
mod projection;
mod sort;
mod store;

pub use error::StoreError;
pub use filter::{Expression, parse_filter};
pub use projection::Projection;
pub use sort::{compare_values, sort_documents};
pub use store::{Collection, Source};

#[cfg(feature = "memory")]
mod memory;

#[cfg(feature = "memory")]
pub use memory::{MemoryCollection, MemoryStore};
