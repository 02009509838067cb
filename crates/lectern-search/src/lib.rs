//! Vector search for lectern.
//!
//! Embeds course chunks and catalog titles, stores them through
//! `lectern-core`'s SQLite schema, and exposes the search tools whose
//! results carry source links back to the lessons they came from.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod embedding;
pub mod error;
pub mod source;
pub mod store;
pub mod tools;

pub use embedding::{cosine_similarity, embedder_for, Embedder, HashingEmbedder, DEFAULT_MODEL};
pub use error::{SearchError, SearchResult};
pub use source::{Source, DELIMITER};
pub use store::{SearchHit, VectorStore};
pub use tools::{CourseOutlineTool, CourseSearchTool, SearchRequest, Tool, ToolManager};
