use serde::{Deserialize, Serialize};

use crate::model::ids::ChunkId;

/// A segment of course text prepared for embedding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseChunk {
    pub id: ChunkId,
    pub content: String,
    pub course_title: String,

    /// Lesson the text came from; `None` for transcripts without lessons.
    pub lesson_number: Option<u32>,

    /// Position of the chunk across the whole course.
    pub chunk_index: u32,
}

impl CourseChunk {
    #[must_use]
    pub fn new(
        course_title: impl Into<String>,
        lesson_number: Option<u32>,
        chunk_index: u32,
        content: impl Into<String>,
    ) -> Self {
        let course_title = course_title.into();
        Self {
            id: ChunkId::for_chunk(&course_title, chunk_index),
            content: content.into(),
            course_title,
            lesson_number,
            chunk_index,
        }
    }
}
