use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;
use bson::oid::ObjectId;
use bson::{Bson, Document};
use frames_query::FindOptions;
use imbl::Vector;
use tracing::trace;

use crate::error::StoreError;
use crate::filter::parse_filter;
use crate::projection::Projection;
use crate::sort::sort_documents;
use crate::store::Collection;

/// A collection held in memory.
///
/// Readers load the current snapshot without locking; writers serialize on
/// a mutex, build the next vector (cheap due to imbl structural sharing)
/// and swap it in.
pub struct MemoryCollection {
    name: String,
    docs: ArcSwap<Vector<Document>>,
    write_lock: Mutex<()>,
}

impl MemoryCollection {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            docs: ArcSwap::new(Arc::new(Vector::new())),
            write_lock: Mutex::new(()),
        }
    }

    pub fn len(&self) -> usize {
        self.docs.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn insert_one(&self, doc: Document) -> Result<Bson, StoreError> {
        let mut ids = self.insert_many(std::iter::once(doc))?;
        ids.pop()
            .ok_or_else(|| StoreError::Storage("insert produced no id".into()))
    }

    /// Append documents, assigning an `ObjectId` to any without an `_id`.
    /// Returns the ids in insertion order.
    pub fn insert_many<I>(&self, docs: I) -> Result<Vec<Bson>, StoreError>
    where
        I: IntoIterator<Item = Document>,
    {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| StoreError::Storage(format!("write lock poisoned: {e}")))?;

        let mut next = (**self.docs.load()).clone();
        let mut ids = Vec::new();
        for doc in docs {
            let doc = with_id(doc);
            if let Some(id) = doc.get("_id") {
                ids.push(id.clone());
            }
            next.push_back(doc);
        }
        self.docs.store(Arc::new(next));
        Ok(ids)
    }
}

/// Ensure `_id` is present and leads the document.
fn with_id(doc: Document) -> Document {
    if doc.contains_key("_id") {
        return doc;
    }
    let mut out = Document::new();
    out.insert("_id", ObjectId::new());
    for (key, value) in doc {
        out.insert(key, value);
    }
    out
}

impl Collection for MemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    fn find(
        &self,
        filter: &Document,
        projection: Option<&Document>,
        options: &FindOptions,
    ) -> Result<Vec<Document>, StoreError> {
        let expr = parse_filter(filter)?;
        let projection = projection.map(Projection::parse).transpose()?;

        let snapshot = self.docs.load_full();
        let mut matched: Vec<Document> = snapshot
            .iter()
            .filter(|doc| expr.matches(doc))
            .cloned()
            .collect();
        sort_documents(&mut matched, &options.sort);

        let skip = options.skip.unwrap_or(0);
        let limit = options.limit.unwrap_or(usize::MAX);
        let docs: Vec<Document> = matched
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|doc| match &projection {
                Some(p) => p.apply(&doc),
                None => doc,
            })
            .collect();

        trace!(collection = %self.name, returned = docs.len(), "find");
        Ok(docs)
    }

    fn count(&self, filter: &Document) -> Result<u64, StoreError> {
        let expr = parse_filter(filter)?;
        let snapshot = self.docs.load_full();
        Ok(snapshot.iter().filter(|doc| expr.matches(doc)).count() as u64)
    }
}
