//! Search error types.

use thiserror::Error;

/// Errors raised by the embedder registry and the vector store.
#[derive(Debug, Error)]
pub enum SearchError {
    /// A course filter matched no catalog entry.
    #[error("No course found matching '{0}'")]
    CourseNotFound(String),

    /// The configured embedding model is not one this build can produce.
    #[error("unknown embedding model '{0}' (expected hash-<dimensions>)")]
    UnknownModel(String),

    /// An error propagated from the storage layer.
    #[error("store error: {0}")]
    Store(#[from] lectern_core::Error),
}

/// Convenience alias for search results.
pub type SearchResult<T> = std::result::Result<T, SearchError>;
