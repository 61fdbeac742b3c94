use std::collections::HashMap;

use bson::Bson;

use crate::schema::Schema;

/// Keys that mark directives in mongo-style projection documents. They carry
/// no meaning as plain fields and are dropped from the flat projection.
const RESERVED_KEYS: [&str; 2] = ["$ref", "$sub"];

/// A structured projection: plain inclusion flags mixed with reference and
/// embed directives, each of which may carry a nested projection.
///
/// ```
/// use frames_mapper::{Projection, Schema};
///
/// static LAIR: Schema = Schema::frame("Lair", "lairs", &["name", "inventory"]);
/// static INVENTORY: Schema = Schema::sub_frame("Inventory", &["gold", "skulls"]);
///
/// let projection = Projection::new()
///     .include("name")
///     .reference(
///         "lair",
///         &LAIR,
///         Projection::new().embed("inventory", &INVENTORY, Projection::new()),
///     );
/// assert_eq!(projection.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Projection {
    entries: Vec<(String, Directive)>,
}

/// What a projection says about one field.
#[derive(Debug, Clone)]
pub enum Directive {
    /// A plain projection value: `true`/`false`, `1`/`0`, or an operator
    /// document such as `{ "$slice": 2 }`.
    Include(Bson),
    Reference(Reference),
    Embed(Embed),
}

/// Resolve the field's identifiers against another frame's collection.
#[derive(Debug, Clone)]
pub struct Reference {
    pub schema: &'static Schema,
    pub projection: Projection,
    pub operators: bson::Document,
}

/// Wrap the field's embedded documents as sub-records.
#[derive(Debug, Clone)]
pub struct Embed {
    pub schema: &'static Schema,
    pub projection: Projection,
    /// The field is a mapping of keys to embedded documents (or lists of
    /// them) rather than a document or list.
    pub map: bool,
    pub operators: bson::Document,
}

impl Reference {
    pub fn new(schema: &'static Schema, projection: Projection) -> Self {
        Self {
            schema,
            projection,
            operators: bson::Document::new(),
        }
    }

    /// Keep a mongo projection operator, e.g. `$slice`, on the field.
    pub fn with_operator(mut self, operator: &str, value: impl Into<Bson>) -> Self {
        self.operators.insert(operator, value.into());
        self
    }
}

impl Embed {
    pub fn new(schema: &'static Schema, projection: Projection) -> Self {
        Self {
            schema,
            projection,
            map: false,
            operators: bson::Document::new(),
        }
    }

    pub fn map(schema: &'static Schema, projection: Projection) -> Self {
        Self {
            map: true,
            ..Self::new(schema, projection)
        }
    }

    pub fn with_operator(mut self, operator: &str, value: impl Into<Bson>) -> Self {
        self.operators.insert(operator, value.into());
        self
    }
}

impl From<Reference> for Directive {
    fn from(reference: Reference) -> Self {
        Directive::Reference(reference)
    }
}

impl From<Embed> for Directive {
    fn from(embed: Embed) -> Self {
        Directive::Embed(embed)
    }
}

impl Projection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&Directive> {
        self.entries.iter().find(|(k, _)| k == field).map(|(_, d)| d)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Directive)> {
        self.entries.iter().map(|(k, d)| (k.as_str(), d))
    }

    /// Set the directive for a field, replacing any earlier one.
    pub fn directive(mut self, field: impl Into<String>, directive: impl Into<Directive>) -> Self {
        let field = field.into();
        let directive = directive.into();
        match self.entries.iter_mut().find(|(k, _)| *k == field) {
            Some((_, slot)) => *slot = directive,
            None => self.entries.push((field, directive)),
        }
        self
    }

    pub fn include(self, field: impl Into<String>) -> Self {
        self.value(field, true)
    }

    pub fn exclude(self, field: impl Into<String>) -> Self {
        self.value(field, false)
    }

    pub fn value(self, field: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.directive(field, Directive::Include(value.into()))
    }

    pub fn reference(
        self,
        field: impl Into<String>,
        schema: &'static Schema,
        projection: Projection,
    ) -> Self {
        self.directive(field, Reference::new(schema, projection))
    }

    pub fn embed(self, field: impl Into<String>, schema: &'static Schema, projection: Projection) -> Self {
        self.directive(field, Embed::new(schema, projection))
    }

    pub fn embed_map(
        self,
        field: impl Into<String>,
        schema: &'static Schema,
        projection: Projection,
    ) -> Self {
        self.directive(field, Embed::map(schema, projection))
    }
}

impl<K: Into<String>, D: Into<Directive>> FromIterator<(K, D)> for Projection {
    fn from_iter<I: IntoIterator<Item = (K, D)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Projection::new(), |p, (field, directive)| p.directive(field, directive))
    }
}

/// The output of [`compile`]: a projection the store understands plus the
/// directives to resolve once the documents are back.
#[derive(Debug)]
pub struct Compiled<'p> {
    pub projection: bson::Document,
    pub references: HashMap<String, &'p Reference>,
    pub embeds: HashMap<String, &'p Embed>,
    /// A plain flag was present, so only named fields are fetched.
    pub explicit: bool,
}

impl Compiled<'_> {
    pub fn has_directives(&self) -> bool {
        !self.references.is_empty() || !self.embeds.is_empty()
    }
}

/// Flatten a structured projection.
///
/// With no projection (or an empty one) every declared field is included.
/// Directive fields are included as `true`, or as their operator document
/// when they carry operators. If no plain flag is present the result falls
/// back to every declared field, so directives alone never exclude scalar
/// fields.
pub fn compile<'p>(projection: Option<&'p Projection>, declared: &[&str]) -> Compiled<'p> {
    let mut compiled = Compiled {
        projection: bson::Document::new(),
        references: HashMap::new(),
        embeds: HashMap::new(),
        explicit: false,
    };

    let Some(projection) = projection.filter(|p| !p.is_empty()) else {
        compiled.projection = all_fields(declared);
        return compiled;
    };

    for (field, directive) in projection.iter() {
        match directive {
            _ if RESERVED_KEYS.contains(&field) => continue,
            Directive::Include(value @ Bson::Document(_)) => {
                compiled.projection.insert(field, value.clone());
            }
            Directive::Include(value) => {
                compiled.projection.insert(field, value.clone());
                compiled.explicit = true;
            }
            Directive::Reference(reference) => {
                compiled
                    .projection
                    .insert(field, flat_slot(&reference.operators));
                compiled.references.insert(field.to_string(), reference);
            }
            Directive::Embed(embed) => {
                compiled.projection.insert(field, flat_slot(&embed.operators));
                compiled.embeds.insert(field.to_string(), embed);
            }
        }
    }

    if !compiled.explicit {
        let mut all = all_fields(declared);
        for (field, value) in std::mem::take(&mut compiled.projection) {
            all.insert(field, value);
        }
        compiled.projection = all;
    }

    compiled
}

/// Whether a plain projection flag excludes its field.
pub(crate) fn is_exclusion(flag: &Bson) -> bool {
    match flag {
        Bson::Boolean(b) => !b,
        Bson::Int32(n) => *n == 0,
        Bson::Int64(n) => *n == 0,
        Bson::Double(n) => *n == 0.0,
        _ => false,
    }
}

fn all_fields(declared: &[&str]) -> bson::Document {
    let mut projection = bson::Document::new();
    for field in declared {
        projection.insert(*field, true);
    }
    projection
}

fn flat_slot(operators: &bson::Document) -> Bson {
    if operators.is_empty() {
        Bson::Boolean(true)
    } else {
        Bson::Document(operators.clone())
    }
}
