use serde::{Deserialize, Serialize};

use crate::sort::Sort;

/// Cursor options passed alongside a filter and projection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FindOptions {
    #[serde(default)]
    pub sort: Vec<Sort>,
    pub skip: Option<usize>,
    pub limit: Option<usize>,
}

impl FindOptions {
    pub fn limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Default::default()
        }
    }

    pub fn sorted(sort: Vec<Sort>) -> Self {
        Self {
            sort,
            ..Default::default()
        }
    }
}
