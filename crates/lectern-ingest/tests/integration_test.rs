//! Integration tests for the ingest → index pipeline and the search tools
//! that read what it stores.

use std::fs;
use std::path::{Path, PathBuf};

use lectern_core::schema::Database;
use lectern_ingest::{
    add_course_document, build_pipeline, Config, CourseDocument, DocumentProcessor,
};
use lectern_search::{CourseSearchTool, HashingEmbedder, SearchRequest, VectorStore, DELIMITER};
use tempfile::TempDir;
use treadle::WorkItem;

const TRANSCRIPT: &str = "Course Title: Building Towards Computer Use with Anthropic
Course Link: https://www.deeplearning.ai/short-courses/building-toward-computer-use-with-anthropic/
Course Instructor: Colt Steele

Lesson 0: Introduction
Lesson Link: https://learn.deeplearning.ai/courses/computer-use/lesson/a6k0z/introduction
Welcome to this introduction. By the end you will have built an agent that can use a computer.

Lesson 1: Working With The API
Lesson Link: https://learn.deeplearning.ai/courses/computer-use/lesson/gco4z/working-with-the-api
Let's make our first request. The messages API takes a model name and a list of messages.

Lesson 2: Tool Use
Tools let the model ask our code to do things. We run the tool and send the result back.
";

fn write_transcript(dir: &Path) -> PathBuf {
    let path = dir.join("course1_script.txt");
    fs::write(&path, TRANSCRIPT).unwrap();
    path
}

fn store() -> VectorStore {
    VectorStore::in_memory(Box::new(HashingEmbedder::default()), 5).unwrap()
}

/// Process a transcript, index it and search it, as the link check does.
#[test]
fn test_process_index_and_search() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_transcript(temp_dir.path());

    let processor = DocumentProcessor::default();
    let (course, chunks) = processor.process_course_document(&path).unwrap();
    assert_eq!(course.title, "Building Towards Computer Use with Anthropic");
    assert_eq!(course.lessons.len(), 3);
    assert_eq!(chunks.len(), 3);

    let store = store();
    store.add_course_metadata(&course).unwrap();
    store.add_course_content(&chunks).unwrap();

    let mut tool = CourseSearchTool::new(&store);
    let result = tool.search(&SearchRequest::new("introduction"));
    assert!(result.starts_with("[Building Towards Computer Use with Anthropic - Lesson 0]"));
    assert!(!tool.last_sources().is_empty());

    for source in tool.last_sources() {
        let rendered = source.to_string();
        if rendered.contains(DELIMITER) {
            let parts: Vec<&str> = rendered.split(DELIMITER).collect();
            assert_eq!(parts.len(), 2);
            assert!(parts.iter().all(|p| !p.is_empty()));
        }
    }

    assert_eq!(
        tool.last_sources()[0].link(),
        Some("https://learn.deeplearning.ai/courses/computer-use/lesson/a6k0z/introduction")
    );
}

/// Lesson 2 has no link, so its source is the label alone.
#[test]
fn test_lesson_without_link_has_bare_source() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_transcript(temp_dir.path());

    let store = store();
    add_course_document(&store, &DocumentProcessor::default(), &path).unwrap();

    let mut tool = CourseSearchTool::new(&store);
    tool.search(&SearchRequest::new("tool").in_lesson(2));
    let sources = tool.last_sources();
    assert_eq!(sources.len(), 1);
    assert!(sources[0].link().is_none());
    assert_eq!(
        sources[0].to_string(),
        "Building Towards Computer Use with Anthropic - Lesson 2"
    );
}

/// Adding the same document twice must not fail or duplicate content.
#[test]
fn test_repeated_addition_is_safe() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_transcript(temp_dir.path());
    let processor = DocumentProcessor::default();
    let store = store();

    for _ in 0..2 {
        let (course, chunks) = processor.process_course_document(&path).unwrap();
        store.add_course_metadata(&course).unwrap();
        store.add_course_content(&chunks).unwrap();
    }

    assert_eq!(store.course_count().unwrap(), 1);
    assert_eq!(store.chunk_count().unwrap(), 3);
}

/// Test that the pipeline can be built and wired correctly
#[tokio::test]
async fn test_pipeline_construction() {
    let temp_dir = TempDir::new().unwrap();
    let docs_dir = temp_dir.path().to_path_buf();
    let db_path = temp_dir.path().join("test.db");

    let result = build_pipeline(docs_dir, db_path, &Config::default(), false, false);

    assert!(result.is_ok(), "Pipeline should build successfully");
}

/// Run both stages against a folder and check what lands in the database.
#[tokio::test]
async fn test_pipeline_ingests_folder() {
    let temp_dir = TempDir::new().unwrap();
    let docs_dir = temp_dir.path().join("docs");
    fs::create_dir(&docs_dir).unwrap();
    write_transcript(&docs_dir);
    let db_path = temp_dir.path().join("lectern.db");

    let workflow =
        build_pipeline(docs_dir.clone(), db_path.clone(), &Config::default(), false, false)
            .unwrap();
    let mut state = treadle::SqliteStateStore::open(&temp_dir.path().join("pipeline.db"))
        .await
        .unwrap();
    let job = CourseDocument::for_path(docs_dir);
    workflow.advance(&job, &mut state).await.unwrap();

    let db = Database::open(&db_path).expect("Failed to open database");
    assert_eq!(db.course_count().unwrap(), 1);
    assert_eq!(db.chunk_count().unwrap(), 3);
    assert!(db.list_stale_chunks("hash-384").unwrap().is_empty());
}

/// Test database initialization and schema creation
#[test]
fn test_database_schema_creation() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");

    let db = Database::open(&db_path).expect("Failed to open database");

    assert_eq!(db.course_count().unwrap(), 0, "New database should have no courses");
    assert_eq!(db.chunk_count().unwrap(), 0);
}

#[test]
fn test_course_document_work_item() {
    let doc = CourseDocument::new("test-123", PathBuf::from("/docs/course1_script.txt"));
    assert_eq!(doc.id(), "test-123");
    assert_eq!(doc.path, PathBuf::from("/docs/course1_script.txt"));
}
