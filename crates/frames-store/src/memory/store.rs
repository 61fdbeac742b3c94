use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::StoreError;
use crate::store::{Collection, Source};

use super::collection::MemoryCollection;

/// An in-process [`Source`] holding each collection as a snapshot-swapped
/// persistent vector.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Arc<MemoryCollection>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a collection, or return the existing one with that name.
    pub fn create_collection(&self, name: &str) -> Result<Arc<MemoryCollection>, StoreError> {
        let mut collections = self
            .collections
            .write()
            .map_err(|e| StoreError::Storage(format!("collections lock poisoned: {e}")))?;
        let collection = collections
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemoryCollection::new(name)));
        Ok(Arc::clone(collection))
    }

    pub fn drop_collection(&self, name: &str) -> Result<(), StoreError> {
        let mut collections = self
            .collections
            .write()
            .map_err(|e| StoreError::Storage(format!("collections lock poisoned: {e}")))?;
        collections.remove(name);
        Ok(())
    }

    pub fn get_collection(&self, name: &str) -> Result<Arc<MemoryCollection>, StoreError> {
        let collections = self
            .collections
            .read()
            .map_err(|e| StoreError::Storage(format!("collections lock poisoned: {e}")))?;
        collections
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::CollectionNotFound(name.to_string()))
    }
}

impl Source for MemoryStore {
    fn collection(&self, name: &str) -> Result<Arc<dyn Collection>, StoreError> {
        let collection: Arc<dyn Collection> = self.get_collection(name)?;
        Ok(collection)
    }
}
