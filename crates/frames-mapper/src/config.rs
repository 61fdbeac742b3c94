use serde::Deserialize;

/// Tuning for a [`Mapper`](crate::Mapper).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    /// Deepest directive nesting a single query may resolve.
    pub max_depth: usize,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self { max_depth: 32 }
    }
}
