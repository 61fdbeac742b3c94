use std::collections::{HashMap, HashSet};

use bson::Bson;

use crate::record::Record;
use crate::value::Value;

/// A hashable form of an identifier. Integers of either width and whole
/// doubles share a key so they match the store's numeric equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum IdKey {
    ObjectId([u8; 12]),
    String(String),
    Int(i64),
    Other(String),
}

impl IdKey {
    pub(crate) fn of(id: &Bson) -> Option<Self> {
        Some(match id {
            Bson::ObjectId(oid) => IdKey::ObjectId(oid.bytes()),
            Bson::String(s) => IdKey::String(s.clone()),
            Bson::Int32(n) => IdKey::Int(i64::from(*n)),
            Bson::Int64(n) => IdKey::Int(*n),
            Bson::Double(n) if n.fract() == 0.0 && n.abs() < i64::MAX as f64 => {
                IdKey::Int(*n as i64)
            }
            Bson::Null | Bson::Undefined | Bson::Document(_) | Bson::Array(_) => return None,
            other => IdKey::Other(other.to_string()),
        })
    }
}

/// Distinct identifiers in first-seen order.
#[derive(Debug, Default)]
pub(crate) struct IdSet {
    seen: HashSet<IdKey>,
    ids: Vec<Bson>,
}

impl IdSet {
    pub(crate) fn len(&self) -> usize {
        self.ids.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub(crate) fn into_ids(self) -> Vec<Bson> {
        self.ids
    }

    fn insert(&mut self, id: &Bson) {
        if let Some(key) = IdKey::of(id)
            && self.seen.insert(key)
        {
            self.ids.push(id.clone());
        }
    }

    /// Gather identifiers from a single id, a list of ids or a mapping of
    /// keys to ids. Values that are already records are skipped.
    pub(crate) fn collect(&mut self, value: &Value) {
        match value {
            Value::Bson(id) => self.insert(id),
            Value::Array(items) => {
                for item in items {
                    if let Value::Bson(id) = item {
                        self.insert(id);
                    }
                }
            }
            Value::Document(map) => {
                for (_, item) in map.iter() {
                    if let Value::Bson(id) = item {
                        self.insert(id);
                    }
                }
            }
            Value::Record(_) => {}
        }
    }
}

/// Resolved records keyed by their `_id`.
pub(crate) type Resolved = HashMap<IdKey, Record>;

pub(crate) fn index_by_id(records: Vec<Record>) -> Resolved {
    records
        .into_iter()
        .filter_map(|record| Some((IdKey::of(record.id()?)?, record)))
        .collect()
}

/// Replace identifiers at a reference slot with their records, keeping the
/// slot's shape. Dangling ids become null in single and map slots and are
/// dropped from lists.
pub(crate) fn substitute(value: &mut Value, resolved: &Resolved) {
    match value {
        Value::Bson(Bson::Null) | Value::Record(_) => {}
        Value::Bson(id) => {
            let next = lookup(id, resolved);
            *value = next;
        }
        Value::Array(items) => {
            let raw = std::mem::take(items);
            *items = raw
                .into_iter()
                .filter_map(|item| match item {
                    Value::Bson(id) => match lookup(&id, resolved) {
                        Value::Record(record) => Some(Value::Record(record)),
                        _ => None,
                    },
                    Value::Record(record) => Some(Value::Record(record)),
                    _ => None,
                })
                .collect();
        }
        Value::Document(map) => {
            for slot in map.values_mut() {
                if let Value::Bson(id) = slot {
                    let next = lookup(id, resolved);
                    *slot = next;
                }
            }
        }
    }
}

fn lookup(id: &Bson, resolved: &Resolved) -> Value {
    IdKey::of(id)
        .and_then(|key| resolved.get(&key))
        .map_or(Value::Bson(Bson::Null), |record| {
            Value::Record(Box::new(record.clone()))
        })
}
