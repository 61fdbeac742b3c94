use std::sync::Arc;

use bson::{Bson, doc};
use frames_query::FindOptions;
use frames_store::Source;
use tracing::debug;

use crate::config::MapperConfig;
use crate::dereference::{IdSet, index_by_id, substitute};
use crate::embed::embed_path;
use crate::error::FrameError;
use crate::path::PathCache;
use crate::projection::{Compiled, Directive, Projection, Reference, compile, is_exclusion};
use crate::record::Record;
use crate::schema::Schema;
use crate::value::Document;

/// Runs structured-projection queries against a [`Source`].
///
/// Each query compiles its projection, fetches with the flat projection,
/// then resolves references (one batched `$in` lookup per reference path)
/// and embeds, recursing through nested projections.
pub struct Mapper {
    source: Arc<dyn Source>,
    paths: PathCache,
    config: MapperConfig,
}

impl Mapper {
    pub fn new(source: Arc<dyn Source>) -> Self {
        Self::with_config(source, MapperConfig::default())
    }

    pub fn with_config(source: Arc<dyn Source>, config: MapperConfig) -> Self {
        Self {
            source,
            paths: PathCache::new(),
            config,
        }
    }

    pub fn paths(&self) -> &PathCache {
        &self.paths
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    /// The first record matching `filter`.
    pub fn one(
        &self,
        schema: &'static Schema,
        filter: impl Into<bson::Document>,
        projection: Option<&Projection>,
    ) -> Result<Option<Record>, FrameError> {
        let mut records = self.many(schema, filter, projection, &FindOptions::limit(1))?;
        Ok(if records.is_empty() {
            None
        } else {
            Some(records.swap_remove(0))
        })
    }

    /// Every record matching `filter`. Without a projection the schema's
    /// default projection applies.
    pub fn many(
        &self,
        schema: &'static Schema,
        filter: impl Into<bson::Document>,
        projection: Option<&Projection>,
        options: &FindOptions,
    ) -> Result<Vec<Record>, FrameError> {
        let fallback;
        let projection = match projection {
            Some(p) => Some(p),
            None => {
                fallback = schema.default_projection.map(|f| f());
                fallback.as_ref()
            }
        };
        self.fetch(schema, &filter.into(), projection, options, 0, false)
    }

    pub fn count(
        &self,
        schema: &'static Schema,
        filter: impl Into<bson::Document>,
    ) -> Result<u64, FrameError> {
        let collection = schema.collection.ok_or(FrameError::NotAFrame(schema.name))?;
        Ok(self.source.collection(collection)?.count(&filter.into())?)
    }

    pub fn by_id(
        &self,
        schema: &'static Schema,
        id: impl Into<Bson>,
        projection: Option<&Projection>,
    ) -> Result<Option<Record>, FrameError> {
        self.one(schema, doc! { "_id": id.into() }, projection)
    }

    /// Refetch `record` by `_id` and replace its document. Returns `false`,
    /// leaving the record untouched, when it has no `_id` or no longer
    /// exists.
    pub fn reload(&self, record: &mut Record, projection: Option<&Projection>) -> Result<bool, FrameError> {
        let Some(id) = record.id().cloned() else {
            return Ok(false);
        };
        match self.by_id(record.schema(), id, projection)? {
            Some(fresh) => {
                *record.document_mut() = fresh.into_document();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// [`Record::to_json`] using this mapper's path cache.
    pub fn to_json(&self, record: &Record) -> serde_json::Value {
        record.to_json(&self.paths)
    }

    fn fetch(
        &self,
        schema: &'static Schema,
        filter: &bson::Document,
        projection: Option<&Projection>,
        options: &FindOptions,
        depth: usize,
        keep_id: bool,
    ) -> Result<Vec<Record>, FrameError> {
        let collection = schema.collection.ok_or(FrameError::NotAFrame(schema.name))?;
        let mut compiled = compile(projection, &schema.declared_fields());
        if keep_id && compiled.projection.get("_id").is_some_and(is_exclusion) {
            compiled.projection.remove("_id");
        }
        debug!(
            collection,
            references = compiled.references.len(),
            embeds = compiled.embeds.len(),
            explicit = compiled.explicit,
            depth,
            "compiled projection"
        );

        let raw = self
            .source
            .collection(collection)?
            .find(filter, Some(&compiled.projection), options)?;
        let mut documents: Vec<Document> = raw.into_iter().map(Document::from).collect();

        if compiled.has_directives() && !documents.is_empty() {
            let mut targets: Vec<&mut Document> = documents.iter_mut().collect();
            self.resolve(&mut targets, &compiled, depth)?;
        }

        Ok(documents
            .into_iter()
            .map(|document| Record::new(schema, document))
            .collect())
    }

    /// Apply a compiled projection's references and embeds to `documents`
    /// in place.
    fn resolve(
        &self,
        documents: &mut [&mut Document],
        compiled: &Compiled<'_>,
        depth: usize,
    ) -> Result<(), FrameError> {
        if depth >= self.config.max_depth {
            return Err(FrameError::DepthExceeded {
                limit: self.config.max_depth,
            });
        }

        for (path, reference) in &compiled.references {
            self.dereference(documents, path, reference, depth)?;
        }

        for (path, embed) in &compiled.embeds {
            let mut wrapped = embed_path(&self.paths, documents, path, embed)?;
            debug!(path = %path, schema = embed.schema.name, wrapped = wrapped.len(), "embedded");

            let nested = compile(Some(&embed.projection), &embed.schema.declared_fields());
            if nested.has_directives() && !wrapped.is_empty() {
                self.resolve(&mut wrapped, &nested, depth + 1)?;
            }
        }

        Ok(())
    }

    fn dereference(
        &self,
        documents: &mut [&mut Document],
        path: &str,
        reference: &Reference,
        depth: usize,
    ) -> Result<(), FrameError> {
        let mut ids = IdSet::default();
        for document in documents.iter() {
            if let Some(value) = self.paths.value_at(path, document) {
                ids.collect(value);
            }
        }
        if ids.is_empty() {
            return Ok(());
        }

        let requested = ids.len();
        let filter = doc! { "_id": { "$in": ids.into_ids() } };
        // Records are indexed by `_id`, so it is fetched even when the
        // nested projection excludes it and dropped once indexed.
        let found = self.fetch(
            reference.schema,
            &filter,
            Some(&reference.projection),
            &FindOptions::default(),
            depth + 1,
            true,
        )?;
        debug!(
            path,
            collection = reference.schema.collection,
            requested,
            found = found.len(),
            "dereferenced"
        );

        let mut resolved = index_by_id(found);
        let hide_id = matches!(
            reference.projection.get("_id"),
            Some(Directive::Include(flag)) if is_exclusion(flag)
        );
        if hide_id {
            for record in resolved.values_mut() {
                record.document_mut().remove("_id");
            }
        }
        for document in documents.iter_mut() {
            if let Some(value) = self.paths.value_at_mut(path, document) {
                substitute(value, &resolved);
            }
        }
        Ok(())
    }
}
