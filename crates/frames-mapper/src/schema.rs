use crate::projection::Projection;

/// Static description of a record type.
///
/// A schema with a collection is a frame: it is queried directly and its
/// documents carry an `_id`. A schema without one describes a sub-frame,
/// a document embedded inside another record.
///
/// ```
/// use frames_mapper::Schema;
///
/// static DRAGON: Schema = Schema::frame("Dragon", "dragons", &["name", "breed", "lair"])
///     .with_private(&["password"]);
/// static INVENTORY: Schema = Schema::sub_frame("Inventory", &["gold", "skulls"]);
///
/// assert!(DRAGON.declared_fields().contains(&"_id"));
/// assert!(!INVENTORY.is_frame());
/// ```
#[derive(Debug)]
pub struct Schema {
    pub name: &'static str,
    pub collection: Option<&'static str>,
    pub fields: &'static [&'static str],
    pub private_fields: &'static [&'static str],
    pub default_projection: Option<fn() -> Projection>,
}

impl Schema {
    pub const fn frame(
        name: &'static str,
        collection: &'static str,
        fields: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            collection: Some(collection),
            fields,
            private_fields: &[],
            default_projection: None,
        }
    }

    pub const fn sub_frame(name: &'static str, fields: &'static [&'static str]) -> Self {
        Self {
            name,
            collection: None,
            fields,
            private_fields: &[],
            default_projection: None,
        }
    }

    /// Dotted paths removed from JSON exports.
    pub const fn with_private(mut self, paths: &'static [&'static str]) -> Self {
        self.private_fields = paths;
        self
    }

    /// Projection used when a query omits one.
    pub const fn with_default_projection(mut self, projection: fn() -> Projection) -> Self {
        self.default_projection = Some(projection);
        self
    }

    pub fn is_frame(&self) -> bool {
        self.collection.is_some()
    }

    /// The declared fields; frames always include `_id`.
    pub fn declared_fields(&self) -> Vec<&'static str> {
        let mut fields = self.fields.to_vec();
        if self.is_frame() && !fields.contains(&"_id") {
            fields.insert(0, "_id");
        }
        fields
    }

    pub fn declares(&self, field: &str) -> bool {
        (self.is_frame() && field == "_id") || self.fields.contains(&field)
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other) || (self.name == other.name && self.collection == other.collection)
    }
}
