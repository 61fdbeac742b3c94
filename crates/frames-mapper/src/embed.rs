use bson::Bson;

use crate::error::FrameError;
use crate::path::PathCache;
use crate::projection::Embed;
use crate::record::Record;
use crate::schema::Schema;
use crate::value::{Document, Value};

/// Wrap the embedded documents at `path` in every document as records of
/// the embed's schema, and return the wrapped records' documents so a
/// nested projection can be applied to them.
pub(crate) fn embed_path<'a>(
    paths: &PathCache,
    documents: &'a mut [&mut Document],
    path: &str,
    embed: &Embed,
) -> Result<Vec<&'a mut Document>, FrameError> {
    let mut wrapped = Vec::new();
    for document in documents.iter_mut() {
        let Some(value) = paths.value_at_mut(path, &mut **document) else {
            continue;
        };
        if embed.map {
            wrap_map(value, embed.schema, path)?;
        } else {
            wrap(value, embed.schema, path)?;
        }
        sub_documents(value, embed.map, &mut wrapped);
    }
    Ok(wrapped)
}

/// A single document or a list of them.
fn wrap(value: &mut Value, schema: &'static Schema, path: &str) -> Result<(), FrameError> {
    match value {
        Value::Document(_) => wrap_document(value, schema),
        Value::Array(items) => {
            for item in items.iter_mut() {
                wrap_document(item, schema);
            }
        }
        Value::Bson(Bson::Null) | Value::Record(_) => {}
        other => {
            return Err(FrameError::EmbedShape {
                path: path.to_string(),
                found: other.kind(),
            });
        }
    }
    Ok(())
}

/// A mapping whose values are documents or lists of documents.
fn wrap_map(value: &mut Value, schema: &'static Schema, path: &str) -> Result<(), FrameError> {
    match value {
        Value::Document(map) => {
            for entry in map.values_mut() {
                wrap(entry, schema, path)?;
            }
            Ok(())
        }
        Value::Bson(Bson::Null) => Ok(()),
        other => Err(FrameError::EmbedShape {
            path: path.to_string(),
            found: other.kind(),
        }),
    }
}

/// Non-document values are left as they are.
fn wrap_document(value: &mut Value, schema: &'static Schema) {
    if let Value::Document(document) = value {
        let document = std::mem::take(document);
        *value = Value::Record(Box::new(Record::new(schema, document)));
    }
}

fn sub_documents<'a>(value: &'a mut Value, map: bool, out: &mut Vec<&'a mut Document>) {
    match value {
        Value::Record(record) => out.push(record.document_mut()),
        Value::Array(items) => {
            for item in items.iter_mut() {
                if let Value::Record(record) = item {
                    out.push(record.document_mut());
                }
            }
        }
        Value::Document(entries) if map => {
            for entry in entries.values_mut() {
                sub_documents(entry, false, out);
            }
        }
        _ => {}
    }
}
