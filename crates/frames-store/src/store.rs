use std::sync::Arc;

use bson::Document;
use frames_query::FindOptions;

use crate::error::StoreError;

/// A queryable set of documents.
///
/// Filters and projections are mongo-style documents. An empty filter
/// matches every document; a missing projection returns whole documents.
pub trait Collection: Send + Sync {
    fn name(&self) -> &str;

    fn find(
        &self,
        filter: &Document,
        projection: Option<&Document>,
        options: &FindOptions,
    ) -> Result<Vec<Document>, StoreError>;

    fn find_one(
        &self,
        filter: &Document,
        projection: Option<&Document>,
    ) -> Result<Option<Document>, StoreError> {
        let mut docs = self.find(filter, projection, &FindOptions::limit(1))?;
        Ok(if docs.is_empty() {
            None
        } else {
            Some(docs.swap_remove(0))
        })
    }

    fn count(&self, filter: &Document) -> Result<u64, StoreError>;
}

/// Resolves collection names to collections.
pub trait Source: Send + Sync {
    fn collection(&self, name: &str) -> Result<Arc<dyn Collection>, StoreError>;
}

impl<S: Source + ?Sized> Source for Arc<S> {
    fn collection(&self, name: &str) -> Result<Arc<dyn Collection>, StoreError> {
        (**self).collection(name)
    }
}
