//! Course transcript parsing.
//!
//! A transcript starts with a header block naming the course, followed by
//! the lesson body:
//!
//! ```text
//! Course Title: Building Towards Computer Use with Anthropic
//! Course Link: https://www.deeplearning.ai/short-courses/building-toward-computer-use-with-anthropic/
//! Course Instructor: Colt Steele
//!
//! Lesson 0: Introduction
//! Lesson Link: https://learn.deeplearning.ai/courses/building-toward-computer-use-with-anthropic/lesson/a6k0z/introduction
//! Welcome to Building Toward Computer Use with Anthropic. ...
//! ```

use std::path::Path;
use std::sync::LazyLock;

use lectern_core::model::{Course, CourseChunk, Lesson};
use regex::Regex;

use crate::chunker::Chunker;
use crate::error::{IngestError, IngestResult};

struct Patterns {
    course_title: Regex,
    course_link: Regex,
    course_instructor: Regex,
    lesson: Regex,
    lesson_link: Regex,
}

#[allow(clippy::expect_used)]
static PATTERNS: LazyLock<Patterns> = LazyLock::new(|| {
    let re = |pattern: &str| Regex::new(pattern).expect("header pattern is valid");
    Patterns {
        course_title: re(r"(?i)^course title:\s*(.+)$"),
        course_link: re(r"(?i)^course link:\s*(.+)$"),
        course_instructor: re(r"(?i)^course instructor:\s*(.+)$"),
        lesson: re(r"(?i)^lesson\s+(\d+):\s*(.+)$"),
        lesson_link: re(r"(?i)^lesson link:\s*(.*)$"),
    }
});

/// A lesson header and the body lines collected under it.
struct LessonText {
    lesson: Lesson,
    lines: Vec<String>,
}

/// Turns transcripts into a [`Course`] and its [`CourseChunk`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentProcessor {
    chunker: Chunker,
}

impl DocumentProcessor {
    #[must_use]
    pub const fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunker: Chunker::new(chunk_size, chunk_overlap),
        }
    }

    #[must_use]
    pub const fn with_chunker(chunker: Chunker) -> Self {
        Self { chunker }
    }

    #[must_use]
    pub const fn chunker(&self) -> &Chunker {
        &self.chunker
    }

    /// Read and parse the transcript at `path`.
    ///
    /// Invalid UTF-8 is replaced rather than rejected.
    ///
    /// # Errors
    /// Returns [`IngestError::Read`] if the file cannot be read and
    /// [`IngestError::Parse`] if it is not a valid transcript.
    pub fn process_course_document(&self, path: &Path) -> IngestResult<(Course, Vec<CourseChunk>)> {
        let bytes = std::fs::read(path).map_err(|source| IngestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let text = String::from_utf8_lossy(&bytes);

        self.process_text(&text).map_err(|message| IngestError::Parse {
            path: path.to_path_buf(),
            message,
        })
    }

    /// Parse transcript text. Errors are plain messages; callers attach the path.
    pub fn process_text(&self, text: &str) -> Result<(Course, Vec<CourseChunk>), String> {
        let patterns = &*PATTERNS;
        let lines: Vec<&str> = text.lines().map(str::trim).collect();

        let first = lines
            .iter()
            .position(|line| !line.is_empty())
            .ok_or_else(|| "document is empty".to_string())?;

        let title = patterns
            .course_title
            .captures(lines[first])
            .and_then(|caps| caps.get(1))
            .map_or(lines[first], |m| m.as_str().trim());
        let mut course = Course::new(title);

        // Header block: link and instructor lines in any order, blank lines allowed.
        let mut body_start = first + 1;
        while let Some(line) = lines.get(body_start) {
            if let Some(link) = capture(&patterns.course_link, line) {
                course.course_link = Some(link.to_string());
            } else if let Some(instructor) = capture(&patterns.course_instructor, line) {
                course.instructor = Some(instructor.to_string());
            } else if !line.is_empty() {
                break;
            }
            body_start += 1;
        }

        let (preamble, lessons) = split_lessons(&lines[body_start..])?;

        let mut chunks = Vec::new();
        if lessons.is_empty() {
            for content in self.chunker.chunk(&preamble.join("\n")) {
                push_chunk(&mut chunks, &course.title, None, content)?;
            }
        } else {
            if preamble.iter().any(|line| !line.is_empty()) {
                log::debug!("Ignoring text before the first lesson of {}", course.title);
            }
            for LessonText { lesson, lines: body } in lessons {
                for content in self.chunker.chunk(&body.join("\n")) {
                    let content = format!(
                        "Course {} Lesson {} content: {content}",
                        course.title, lesson.lesson_number
                    );
                    push_chunk(&mut chunks, &course.title, Some(lesson.lesson_number), content)?;
                }
                course.lessons.push(lesson);
            }
        }

        log::debug!(
            "Parsed {}: {} lessons, {} chunks",
            course.title,
            course.lessons.len(),
            chunks.len()
        );
        Ok((course, chunks))
    }
}

fn capture<'a>(pattern: &Regex, line: &'a str) -> Option<&'a str> {
    pattern
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
}

/// Split the body into the text before the first lesson header and the lessons.
fn split_lessons<'a>(lines: &[&'a str]) -> Result<(Vec<&'a str>, Vec<LessonText>), String> {
    let patterns = &*PATTERNS;
    let mut preamble = Vec::new();
    let mut lessons: Vec<LessonText> = Vec::new();

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        i += 1;

        let Some(caps) = patterns.lesson.captures(line) else {
            match lessons.last_mut() {
                Some(current) => current.lines.push(line.to_string()),
                None => preamble.push(line),
            }
            continue;
        };

        let number = caps
            .get(1)
            .map_or("", |m| m.as_str())
            .parse::<u32>()
            .map_err(|e| format!("invalid lesson number in '{line}': {e}"))?;
        if lessons.iter().any(|l| l.lesson.lesson_number == number) {
            return Err(format!("duplicate lesson number {number}"));
        }

        let title = caps.get(2).map_or("", |m| m.as_str().trim());
        let mut lesson = Lesson::new(number, title);
        if let Some(link) = lines.get(i).and_then(|next| capture(&patterns.lesson_link, next)) {
            if !link.is_empty() {
                lesson = lesson.with_link(link);
            }
            i += 1;
        }

        lessons.push(LessonText {
            lesson,
            lines: Vec::new(),
        });
    }

    Ok((preamble, lessons))
}

fn push_chunk(
    chunks: &mut Vec<CourseChunk>,
    course_title: &str,
    lesson_number: Option<u32>,
    content: String,
) -> Result<(), String> {
    let index = u32::try_from(chunks.len()).map_err(|_| "too many chunks".to_string())?;
    chunks.push(CourseChunk::new(course_title, lesson_number, index, content));
    Ok(())
}
