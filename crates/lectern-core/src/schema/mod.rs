//! SQLite schema and data access for courses, lessons and chunks.

mod db;
mod migrations;

pub use db::{ChunkFilter, Database, StoredChunk, StoredCourseEmbedding};
pub use migrations::{Migration, MIGRATIONS};
