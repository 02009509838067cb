use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use lectern_core::model::Course;
use lectern_search::{embedder_for, VectorStore};
use treadle::{Stage, StageContext, StageOutcome};
use walkdir::WalkDir;

use crate::config::Config;
use crate::document::DocumentProcessor;
use crate::error::{IngestError, IngestResult};

/// Counts reported by an ingest run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub courses_added: usize,
    pub chunks_added: usize,
    /// Transcripts whose course title was already catalogued.
    pub skipped: usize,
    /// Transcripts that could not be read or parsed.
    pub failed: usize,
}

impl fmt::Display for IngestSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} courses, {} chunks added ({} skipped, {} failed)",
            self.courses_added, self.chunks_added, self.skipped, self.failed
        )
    }
}

/// Process one transcript and store its course and chunks.
///
/// Any content previously stored under the same course title is replaced,
/// so repeating the call with the same file leaves the store unchanged.
///
/// Returns the course and the number of chunks stored.
pub fn add_course_document(
    store: &VectorStore,
    processor: &DocumentProcessor,
    path: &Path,
) -> IngestResult<(Course, usize)> {
    let (course, chunks) = processor.process_course_document(path)?;

    if store.course(&course.title)?.is_some() {
        store.remove_course(&course.title)?;
    }
    store.add_course_metadata(&course)?;
    store.add_course_content(&chunks)?;

    log::info!(
        "Added course '{}': {} lessons, {} chunks",
        course.title,
        course.lessons.len(),
        chunks.len()
    );
    Ok((course, chunks.len()))
}

/// Ingest every transcript under `dir`.
///
/// Courses whose title is already catalogued are skipped. With
/// `clear_existing` the store is emptied first. Unreadable or malformed
/// transcripts are logged and counted as failed.
pub fn add_course_folder(
    store: &VectorStore,
    processor: &DocumentProcessor,
    dir: &Path,
    clear_existing: bool,
) -> IngestResult<IngestSummary> {
    if clear_existing {
        store.clear_all_data()?;
    }
    let files = find_transcripts(dir)?;
    ingest_files(store, processor, &files, false, true)
}

/// Whether `path` looks like a course transcript.
fn is_transcript(path: &Path) -> bool {
    if let Some(ext) = path.extension() {
        matches!(ext.to_string_lossy().to_lowercase().as_ref(), "txt" | "md")
    } else {
        false
    }
}

/// Transcript files under `dir`, in file name order.
fn find_transcripts(dir: &Path) -> IngestResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|source| IngestError::Walk {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if entry.file_type().is_file() && is_transcript(path) {
            files.push(path.to_path_buf());
        }
    }
    Ok(files)
}

fn ingest_files(
    store: &VectorStore,
    processor: &DocumentProcessor,
    files: &[PathBuf],
    replace: bool,
    skip_failures: bool,
) -> IngestResult<IngestSummary> {
    let mut existing: HashSet<String> = store.existing_course_titles()?.into_iter().collect();
    let mut summary = IngestSummary::default();

    for path in files {
        log::debug!("Processing: {}", path.display());

        let (course, chunks) = match processor.process_course_document(path) {
            Ok(parsed) => parsed,
            Err(e) if skip_failures && e.is_document_error() => {
                log::warn!("Skipping {}: {}", path.display(), e);
                summary.failed += 1;
                continue;
            }
            Err(e) => return Err(e),
        };

        if existing.contains(&course.title) {
            if !replace {
                log::info!("Course already exists, skipping: {}", course.title);
                summary.skipped += 1;
                continue;
            }
            store.remove_course(&course.title)?;
        }

        store.add_course_metadata(&course)?;
        store.add_course_content(&chunks)?;
        log::info!("Added course '{}' ({} chunks)", course.title, chunks.len());

        summary.courses_added += 1;
        summary.chunks_added += chunks.len();
        existing.insert(course.title);
    }

    Ok(summary)
}

/// The Ingest stage: read transcripts from a file or folder into the store.
#[derive(Debug)]
pub struct IngestStage {
    source: PathBuf,
    db_path: PathBuf,
    config: Config,
    replace: bool,
    clear_existing: bool,
}

impl IngestStage {
    #[must_use]
    pub fn new(source: PathBuf, db_path: PathBuf, config: Config) -> Self {
        Self {
            source,
            db_path,
            config,
            replace: false,
            clear_existing: false,
        }
    }

    /// Re-ingest courses that are already catalogued instead of skipping them.
    #[must_use]
    pub fn with_replace(mut self, replace: bool) -> Self {
        self.replace = replace;
        self
    }

    /// Empty the store before ingesting.
    #[must_use]
    pub fn with_clear_existing(mut self, clear_existing: bool) -> Self {
        self.clear_existing = clear_existing;
        self
    }

    fn run(&self) -> IngestResult<IngestSummary> {
        let embedder = embedder_for(&self.config.embedding_model)?;
        let store = VectorStore::open(&self.db_path, embedder, self.config.max_results)?;
        let processor =
            DocumentProcessor::new(self.config.chunk_size, self.config.chunk_overlap);

        if self.clear_existing {
            store.clear_all_data()?;
        }

        if self.source.is_file() {
            ingest_files(
                &store,
                &processor,
                std::slice::from_ref(&self.source),
                self.replace,
                false,
            )
        } else {
            let files = find_transcripts(&self.source)?;
            log::info!(
                "Found {} transcripts in {}",
                files.len(),
                self.source.display()
            );
            ingest_files(&store, &processor, &files, self.replace, true)
        }
    }
}

#[async_trait::async_trait]
impl Stage for IngestStage {
    fn name(&self) -> &str {
        "ingest"
    }

    async fn execute(
        &self,
        _item: &dyn treadle::WorkItem,
        _context: &mut StageContext,
    ) -> treadle::Result<StageOutcome> {
        log::info!("Starting ingest of {}", self.source.display());

        match self.run() {
            Ok(summary) => {
                log::info!("Ingest complete: {}", summary);
                Ok(StageOutcome::Complete)
            }
            Err(e) => Err(treadle::TreadleError::StageExecution(format!(
                "Ingest failed: {e}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lectern_search::HashingEmbedder;
    use std::fs;
    use tempfile::TempDir;

    fn transcript(title: &str, lesson_text: &str) -> String {
        format!(
            "Course Title: {title}\nCourse Link: https://learn.example/{title}\n\n\
             Lesson 0: Introduction\nLesson Link: https://learn.example/{title}/0\n{lesson_text}\n"
        )
    }

    fn store() -> VectorStore {
        VectorStore::in_memory(Box::new(HashingEmbedder::default()), 5).unwrap()
    }

    #[test]
    fn test_is_transcript() {
        assert!(is_transcript(Path::new("/docs/course1_script.txt")));
        assert!(is_transcript(Path::new("/docs/notes.MD")));
        assert!(!is_transcript(Path::new("/docs/slides.pdf")));
        assert!(!is_transcript(Path::new("/docs/README")));
    }

    #[test]
    fn test_add_course_document_is_repeatable() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("course.txt");
        fs::write(&path, transcript("Alpha", "Welcome to the introduction.")).unwrap();

        let store = store();
        let processor = DocumentProcessor::default();
        let (course, chunks) = add_course_document(&store, &processor, &path).unwrap();
        assert_eq!(course.title, "Alpha");
        assert_eq!(chunks, 1);

        add_course_document(&store, &processor, &path).unwrap();
        assert_eq!(store.course_count().unwrap(), 1);
        assert_eq!(store.chunk_count().unwrap(), 1);
    }

    #[test]
    fn test_add_course_folder_skips_existing_and_bad_files() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        fs::write(dir.join("a.txt"), transcript("Alpha", "First text.")).unwrap();
        fs::write(dir.join("b.md"), transcript("Beta", "Second text.")).unwrap();
        fs::write(dir.join("empty.txt"), "").unwrap();
        fs::write(dir.join("slides.pdf"), "not a transcript").unwrap();

        let store = store();
        let processor = DocumentProcessor::default();

        let summary = add_course_folder(&store, &processor, dir, false).unwrap();
        assert_eq!(summary.courses_added, 2);
        assert_eq!(summary.chunks_added, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 0);

        let summary = add_course_folder(&store, &processor, dir, false).unwrap();
        assert_eq!(summary.courses_added, 0);
        assert_eq!(summary.skipped, 2);
        assert_eq!(store.course_count().unwrap(), 2);

        let summary = add_course_folder(&store, &processor, dir, true).unwrap();
        assert_eq!(summary.courses_added, 2);
        assert_eq!(store.chunk_count().unwrap(), 2);
    }

    #[test]
    fn test_folder_with_same_title_twice_keeps_first() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("1.txt"), transcript("Alpha", "Old.")).unwrap();
        fs::write(temp_dir.path().join("2.txt"), transcript("Alpha", "New.")).unwrap();

        let store = store();
        let summary =
            add_course_folder(&store, &DocumentProcessor::default(), temp_dir.path(), false)
                .unwrap();
        assert_eq!(summary.courses_added, 1);
        assert_eq!(summary.skipped, 1);
    }

    #[tokio::test]
    async fn test_ingest_stage_replaces_when_asked() {
        let temp_dir = TempDir::new().unwrap();
        let docs = temp_dir.path().join("docs");
        fs::create_dir(&docs).unwrap();
        let db_path = temp_dir.path().join("lectern.db");
        let file = docs.join("course.txt");

        fs::write(&file, transcript("Alpha", "One. Two.")).unwrap();
        let stage = IngestStage::new(docs.clone(), db_path.clone(), Config::default());
        assert_eq!(stage.run().unwrap().courses_added, 1);

        fs::write(&file, transcript("Alpha", "Rewritten lesson text.")).unwrap();
        assert_eq!(stage.run().unwrap().skipped, 1);

        let stage = stage.with_replace(true);
        assert_eq!(stage.run().unwrap().courses_added, 1);

        let db = lectern_core::schema::Database::open(&db_path).unwrap();
        let chunks = db
            .list_chunks(&lectern_core::schema::ChunkFilter::default())
            .unwrap();
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].chunk.content.ends_with("Rewritten lesson text."));
    }

    #[tokio::test]
    async fn test_ingest_stage_single_file_propagates_parse_errors() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("empty.txt");
        fs::write(&file, "").unwrap();

        let stage = IngestStage::new(file, temp_dir.path().join("lectern.db"), Config::default());
        let err = stage.run().unwrap_err();
        assert!(matches!(err, IngestError::Parse { .. }));
    }

    #[tokio::test]
    async fn test_ingest_stage_rejects_unknown_model() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config {
            embedding_model: "all-MiniLM-L6-v2".to_string(),
            ..Config::default()
        };
        let stage = IngestStage::new(
            temp_dir.path().to_path_buf(),
            temp_dir.path().join("lectern.db"),
            config,
        );
        assert!(matches!(stage.run(), Err(IngestError::Store(_))));
    }
}
