//! Ingestion error types.

use std::path::PathBuf;

use lectern_search::SearchError;
use thiserror::Error;

/// Errors that can occur while reading, parsing or storing a transcript.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The transcript could not be read from disk.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The transcript is malformed.
    #[error("parse error in {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// Walking a course folder failed.
    #[error("failed to walk {}: {source}", path.display())]
    Walk {
        path: PathBuf,
        source: walkdir::Error,
    },

    /// An error propagated from the vector store.
    #[error("store error: {0}")]
    Store(#[from] SearchError),
}

impl IngestError {
    /// Returns `true` when the error concerns a single document and a batch
    /// may continue with the next one.
    pub fn is_document_error(&self) -> bool {
        matches!(self, Self::Read { .. } | Self::Parse { .. })
    }
}

/// Convenience alias for ingestion results.
pub type IngestResult<T> = std::result::Result<T, IngestError>;
