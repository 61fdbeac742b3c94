use std::sync::Arc;

use arc_swap::ArcSwap;
use imbl::HashMap;
use tracing::trace;

use crate::value::{Document, Value};

/// Memoized dotted-path splitting plus path-based access into documents.
///
/// The table only grows: every writer for a given path stores the same
/// keys, so a lost race is harmless. Lookups never lock.
pub struct PathCache {
    keys: ArcSwap<HashMap<String, Arc<[String]>>>,
}

impl Default for PathCache {
    fn default() -> Self {
        Self::new()
    }
}

impl PathCache {
    pub fn new() -> Self {
        Self {
            keys: ArcSwap::from_pointee(HashMap::new()),
        }
    }

    /// Number of distinct paths seen so far.
    pub fn len(&self) -> usize {
        self.keys.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Split `path` on `.`. Empty segments are kept as-is.
    pub fn keys(&self, path: &str) -> Arc<[String]> {
        if let Some(keys) = self.keys.load().get(path) {
            return Arc::clone(keys);
        }

        trace!(path, "path cache miss");
        let keys: Arc<[String]> = path.split('.').map(str::to_string).collect();
        self.keys.rcu(|current| {
            let mut next = (**current).clone();
            next.insert(path.to_string(), Arc::clone(&keys));
            next
        });
        keys
    }

    /// The value at `path`, or `None` if any segment is missing or an
    /// intermediate value is not a mapping. Records are walked through.
    pub fn value_at<'a>(&self, path: &str, root: &'a Document) -> Option<&'a Value> {
        let keys = self.keys(path);
        let (last, parents) = keys.split_last()?;
        let mut current = root;
        for key in parents {
            current = match current.get(key)? {
                Value::Document(doc) => doc,
                Value::Record(record) => record.document(),
                _ => return None,
            };
        }
        current.get(last)
    }

    pub fn value_at_mut<'a>(&self, path: &str, root: &'a mut Document) -> Option<&'a mut Value> {
        let keys = self.keys(path);
        let (last, parents) = keys.split_last()?;
        parent_mut(parents, root)?.get_mut(last)
    }

    /// Remove the value at each path. Paths whose parent is missing are
    /// skipped.
    pub fn delete_at<P: AsRef<str>>(&self, paths: &[P], root: &mut Document) {
        for path in paths {
            let keys = self.keys(path.as_ref());
            let Some((last, parents)) = keys.split_last() else {
                continue;
            };
            if let Some(parent) = parent_mut(parents, root) {
                parent.remove(last);
            }
        }
    }
}

fn parent_mut<'a>(keys: &[String], root: &'a mut Document) -> Option<&'a mut Document> {
    let mut current = root;
    for key in keys {
        current = match current.get_mut(key)? {
            Value::Document(doc) => doc,
            Value::Record(record) => record.document_mut(),
            _ => return None,
        };
    }
    Some(current)
}
