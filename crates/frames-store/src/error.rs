#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("collection not found: {0}")]
    CollectionNotFound(String),
    #[error("invalid filter: {0}")]
    InvalidFilter(String),
    #[error("invalid projection: {0}")]
    InvalidProjection(String),
    #[error("storage error: {0}")]
    Storage(String),
}
