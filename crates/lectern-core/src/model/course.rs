use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::CourseId;

/// A numbered lesson within a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    pub lesson_number: u32,
    pub title: String,

    /// Link to the lesson video or page, when the transcript names one.
    pub lesson_link: Option<String>,
}

impl Lesson {
    #[must_use]
    pub fn new(lesson_number: u32, title: impl Into<String>) -> Self {
        Self {
            lesson_number,
            title: title.into(),
            lesson_link: None,
        }
    }

    #[must_use]
    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.lesson_link = Some(link.into());
        self
    }
}

/// One ingested course transcript.
///
/// The title is the course's natural key: the id is derived from it, and
/// re-ingesting a transcript with the same title updates the same course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    pub title: String,
    pub course_link: Option<String>,
    pub instructor: Option<String>,

    /// Lessons in document order.
    pub lessons: Vec<Lesson>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Course {
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        let title = title.into();
        let now = Utc::now();
        Self {
            id: CourseId::for_title(&title),
            title,
            course_link: None,
            instructor: None,
            lessons: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.course_link = Some(link.into());
        self
    }

    #[must_use]
    pub fn with_instructor(mut self, instructor: impl Into<String>) -> Self {
        self.instructor = Some(instructor.into());
        self
    }

    #[must_use]
    pub fn with_lesson(mut self, lesson: Lesson) -> Self {
        self.lessons.push(lesson);
        self
    }

    /// Look up a lesson by number.
    #[must_use]
    pub fn lesson(&self, lesson_number: u32) -> Option<&Lesson> {
        self.lessons
            .iter()
            .find(|l| l.lesson_number == lesson_number)
    }
}
