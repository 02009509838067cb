//! End-to-end check of lesson links: ingest one transcript, search it, and
//! print every source the search reported.

use anyhow::{Context, Result};
use lectern_ingest::{Config, DocumentProcessor};
use lectern_search::{CourseSearchTool, SearchRequest, DELIMITER};
use std::io::Write;
use std::path::Path;

pub fn run_link_check(path: &Path, query: &str, config: &Config, out: &mut dyn Write) -> Result<()> {
    let processor = DocumentProcessor::new(config.chunk_size, config.chunk_overlap);
    let store = super::open_store(config, config.max_results)?;

    writeln!(out, "Processing course document...")?;
    let (course, chunks) = processor
        .process_course_document(path)
        .context("Failed to process course document")?;

    writeln!(out, "Course: {}", course.title)?;
    writeln!(out, "Lessons: {}", course.lessons.len())?;
    for lesson in &course.lessons {
        writeln!(out, "  Lesson {}: {}", lesson.lesson_number, lesson.title)?;
        writeln!(
            out,
            "    Link: {}",
            lesson.lesson_link.as_deref().unwrap_or("<none>")
        )?;
    }

    writeln!(out, "\nAdding to vector store...")?;
    store
        .add_course_metadata(&course)
        .context("Failed to add course metadata")?;
    store
        .add_course_content(&chunks)
        .context("Failed to add course content")?;

    writeln!(out, "\nTesting search...")?;
    let mut tool = CourseSearchTool::new(&store);
    let result = tool.search(&SearchRequest::new(query));
    writeln!(out, "Search result:")?;
    writeln!(out, "{result}")?;

    writeln!(out, "\nLast sources:")?;
    for source in tool.last_sources() {
        let rendered = source.to_string();
        writeln!(out, "  '{rendered}'")?;
        if let Some((display, url)) = rendered.split_once(DELIMITER) {
            writeln!(out, "    Display: '{display}'")?;
            writeln!(out, "    URL: '{url}'")?;
        }
    }

    Ok(())
}
