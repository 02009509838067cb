pub mod chunk;
pub mod course;
pub mod ids;

pub use chunk::CourseChunk;
pub use course::{Course, Lesson};
pub use ids::{ChunkId, CourseId};
