use bson::oid::ObjectId;
use bson::{Bson, DateTime};

use crate::record::Record;

/// A field value inside a record's document.
///
/// Raw storage values arrive as `Bson`, `Document` and `Array`; the
/// dereference and embed passes replace them in place with `Record`s.
/// `Bson` never holds a document or an array.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bson(Bson),
    Document(Document),
    Array(Vec<Value>),
    Record(Box<Record>),
}

impl Default for Value {
    fn default() -> Self {
        Value::Bson(Bson::Null)
    }
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Bson(Bson::Null))
    }

    pub fn as_bson(&self) -> Option<&Bson> {
        match self {
            Value::Bson(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Bson(Bson::String(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Bson(Bson::Int32(n)) => Some(i64::from(*n)),
            Value::Bson(Bson::Int64(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Bson(Bson::Double(n)) => Some(*n),
            Value::Bson(Bson::Int32(n)) => Some(f64::from(*n)),
            Value::Bson(Bson::Int64(n)) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Value::Document(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(&**r),
            _ => None,
        }
    }

    /// Short name of the value's shape, used in error messages.
    pub fn kind(&self) -> String {
        match self {
            Value::Bson(b) => format!("{:?}", b.element_type()),
            Value::Document(_) => "Document".into(),
            Value::Array(_) => "Array".into(),
            Value::Record(r) => r.schema().name.into(),
        }
    }
}

impl From<Bson> for Value {
    fn from(value: Bson) -> Self {
        match value {
            Bson::Document(doc) => Value::Document(doc.into()),
            Bson::Array(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            other => Value::Bson(other),
        }
    }
}

impl From<bson::Document> for Value {
    fn from(doc: bson::Document) -> Self {
        Value::Document(doc.into())
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        Value::Document(doc)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Record(Box::new(record))
    }
}

macro_rules! scalar_value {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::Bson(Bson::from(value))
                }
            }
        )*
    };
}

scalar_value!(&str, String, bool, i32, i64, f64, ObjectId, DateTime);

/// Converts back to storage form: frames collapse to their `_id`,
/// sub-frames to their document.
impl From<&Value> for Bson {
    fn from(value: &Value) -> Self {
        match value {
            Value::Bson(b) => b.clone(),
            Value::Document(doc) => Bson::Document(doc.to_bson()),
            Value::Array(items) => Bson::Array(items.iter().map(Bson::from).collect()),
            Value::Record(record) => Bson::from(&**record),
        }
    }
}

/// An insertion-ordered mapping of field names to [`Value`]s.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    entries: Vec<(String, Value)>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Insert or replace a value. A replaced key keeps its position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        let value = value.into();
        match self.get_mut(&key) {
            Some(slot) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut Value> {
        self.entries.iter_mut().map(|(_, v)| v)
    }

    pub fn to_bson(&self) -> bson::Document {
        let mut out = bson::Document::new();
        for (key, value) in &self.entries {
            out.insert(key.clone(), Bson::from(value));
        }
        out
    }
}

impl From<bson::Document> for Document {
    fn from(doc: bson::Document) -> Self {
        doc.into_iter().map(|(k, v)| (k, Value::from(v))).collect()
    }
}

impl FromIterator<(String, Value)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut doc = Document::new();
        for (key, value) in iter {
            doc.insert(key, value);
        }
        doc
    }
}

impl IntoIterator for Document {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
