use bson::Bson;
use serde_json::{Map, Number, Value as Json};

use crate::error::FrameError;
use crate::path::PathCache;
use crate::schema::Schema;
use crate::value::{Document, Value};

/// A document wrapped with its schema.
///
/// Field access through [`attr`](Record::attr) and [`set`](Record::set) is
/// restricted to the schema's declared fields; [`get`](Record::get) reads
/// the raw document.
#[derive(Debug, Clone)]
pub struct Record {
    schema: &'static Schema,
    document: Document,
}

impl Record {
    pub fn new(schema: &'static Schema, document: impl Into<Document>) -> Self {
        Self {
            schema,
            document: document.into(),
        }
    }

    pub fn schema(&self) -> &'static Schema {
        self.schema
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    pub fn id(&self) -> Option<&Bson> {
        self.document.get("_id").and_then(Value::as_bson)
    }

    /// Read a declared field. Unset fields are `Ok(None)`.
    pub fn attr(&self, field: &str) -> Result<Option<&Value>, FrameError> {
        self.check_declared(field)?;
        Ok(self.document.get(field))
    }

    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> Result<(), FrameError> {
        self.check_declared(field)?;
        self.document.insert(field, value);
        Ok(())
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.document.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.document.contains_key(field)
    }

    /// The document as JSON-safe values, with the schema's private fields
    /// removed at every level.
    pub fn to_json(&self, paths: &PathCache) -> Json {
        let mut document = self.document.clone();
        paths.delete_at(self.schema.private_fields, &mut document);
        Json::Object(document_json(&document, paths))
    }

    fn check_declared(&self, field: &str) -> Result<(), FrameError> {
        if self.schema.declares(field) {
            Ok(())
        } else {
            Err(FrameError::UndeclaredField {
                schema: self.schema.name,
                field: field.to_string(),
            })
        }
    }
}

/// Frames compare by `_id`, sub-frames by content.
impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        if self.schema != other.schema {
            return false;
        }
        if self.schema.is_frame() {
            self.id() == other.id()
        } else {
            self.document == other.document
        }
    }
}

impl From<&Record> for Bson {
    fn from(record: &Record) -> Self {
        if record.schema.is_frame() {
            record.id().cloned().unwrap_or(Bson::Null)
        } else {
            Bson::Document(record.document.to_bson())
        }
    }
}

fn document_json(document: &Document, paths: &PathCache) -> Map<String, Json> {
    document
        .iter()
        .map(|(key, value)| (key.to_string(), value_json(value, paths)))
        .collect()
}

fn value_json(value: &Value, paths: &PathCache) -> Json {
    match value {
        Value::Bson(b) => bson_json(b),
        Value::Document(doc) => Json::Object(document_json(doc, paths)),
        Value::Array(items) => Json::Array(items.iter().map(|v| value_json(v, paths)).collect()),
        Value::Record(record) => record.to_json(paths),
    }
}

fn bson_json(value: &Bson) -> Json {
    match value {
        Bson::Null | Bson::Undefined => Json::Null,
        Bson::Boolean(b) => Json::Bool(*b),
        Bson::Int32(n) => Json::from(*n),
        Bson::Int64(n) => Json::from(*n),
        Bson::Double(n) => Number::from_f64(*n).map_or(Json::Null, Json::Number),
        Bson::String(s) => Json::String(s.clone()),
        Bson::ObjectId(oid) => Json::String(oid.to_hex()),
        Bson::DateTime(dt) => match dt.try_to_rfc3339_string() {
            Ok(s) => Json::String(s),
            Err(_) => Json::from(dt.timestamp_millis()),
        },
        Bson::Document(doc) => Json::Object(
            doc.iter()
                .map(|(k, v)| (k.clone(), bson_json(v)))
                .collect(),
        ),
        Bson::Array(items) => Json::Array(items.iter().map(bson_json).collect()),
        other => Json::String(other.to_string()),
    }
}
