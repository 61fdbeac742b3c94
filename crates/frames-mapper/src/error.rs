use frames_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("cannot embed {found} value at `{path}`")]
    EmbedShape { path: String, found: String },

    #[error("`{field}` is not a declared field of {schema}")]
    UndeclaredField { schema: &'static str, field: String },

    #[error("{0} has no collection")]
    NotAFrame(&'static str),

    #[error("invalid page {page} (page count {page_count})")]
    InvalidPage { page: usize, page_count: usize },

    #[error("projection nesting exceeds depth limit {limit}")]
    DepthExceeded { limit: usize },
}
