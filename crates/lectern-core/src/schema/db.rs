use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

use crate::error::{Error, Result};
use crate::model::{ChunkId, Course, CourseChunk, CourseId, Lesson};

use super::migrations::MIGRATIONS;

/// A database connection with the storage operations behind the vector store.
#[derive(Debug)]
pub struct Database {
    conn: Connection,
}

/// Optional restrictions applied when listing chunks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkFilter {
    pub course_title: Option<String>,
    pub lesson_number: Option<u32>,
}

impl ChunkFilter {
    #[must_use]
    pub fn course(mut self, title: impl Into<String>) -> Self {
        self.course_title = Some(title.into());
        self
    }

    #[must_use]
    pub fn lesson(mut self, lesson_number: u32) -> Self {
        self.lesson_number = Some(lesson_number);
        self
    }
}

/// A chunk row together with its stored embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredChunk {
    pub chunk: CourseChunk,
    pub embedding: Option<Vec<f32>>,
    pub embedding_model: Option<String>,
}

/// The title embedding of one catalog entry.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredCourseEmbedding {
    pub title: String,
    pub embedding: Option<Vec<f32>>,
    pub embedding_model: Option<String>,
}

impl Database {
    /// Open (or create) a database at the given path and apply migrations.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Open an in-memory database (for tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        // Foreign key enforcement is per connection in SQLite.
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let db = Self { conn };
        db.apply_migrations()?;
        Ok(db)
    }

    /// The underlying connection, for statements the typed methods do not cover.
    #[must_use]
    pub const fn conn(&self) -> &Connection {
        &self.conn
    }

    fn apply_migrations(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
            [],
        )?;

        let mut stmt = self
            .conn
            .prepare("SELECT version FROM schema_migrations ORDER BY version")?;
        let applied: Vec<u32> = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        for migration in MIGRATIONS {
            if !applied.contains(&migration.version) {
                log::info!(
                    "Applying migration {} ({})",
                    migration.version,
                    migration.name
                );
                self.conn.execute_batch(migration.sql)?;
                self.conn.execute(
                    "INSERT INTO schema_migrations (version, name) VALUES (?1, ?2)",
                    params![migration.version, migration.name],
                )?;
            }
        }

        Ok(())
    }
}

// Course catalog
impl Database {
    /// Insert or update a course and replace its lessons.
    ///
    /// The stored title embedding and the original `created_at` survive an
    /// update; lessons are rewritten to match `course.lessons` exactly.
    pub fn upsert_course(&self, course: &Course) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO courses (id, title, course_link, instructor, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                course_link = excluded.course_link,
                instructor = excluded.instructor,
                updated_at = excluded.updated_at",
            params![
                course.id.to_string(),
                course.title,
                course.course_link,
                course.instructor,
                course.created_at.to_rfc3339(),
                course.updated_at.to_rfc3339(),
            ],
        )?;
        tx.execute(
            "DELETE FROM lessons WHERE course_id = ?1",
            params![course.id.to_string()],
        )?;
        for lesson in &course.lessons {
            tx.execute(
                "INSERT INTO lessons (course_id, lesson_number, title, lesson_link)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    course.id.to_string(),
                    lesson.lesson_number,
                    lesson.title,
                    lesson.lesson_link,
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Get a course (with lessons) by its exact title.
    pub fn get_course_by_title(&self, title: &str) -> Result<Option<Course>> {
        let course = self
            .conn
            .query_row(
                "SELECT id, title, course_link, instructor, created_at, updated_at
                 FROM courses WHERE title = ?1",
                [title],
                row_to_course,
            )
            .optional()?;

        match course {
            Some(mut course) => {
                course.lessons = self.lessons_for(&course.id)?;
                Ok(Some(course))
            }
            None => Ok(None),
        }
    }

    /// List every course (with lessons), ordered by title.
    pub fn list_courses(&self) -> Result<Vec<Course>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, course_link, instructor, created_at, updated_at
             FROM courses ORDER BY title",
        )?;
        let mut courses = stmt
            .query_map([], row_to_course)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        for course in &mut courses {
            course.lessons = self.lessons_for(&course.id)?;
        }
        Ok(courses)
    }

    /// Titles of every course in the catalog, ordered by title.
    pub fn course_titles(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT title FROM courses ORDER BY title")?;
        let titles = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(titles)
    }

    pub fn course_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM courses", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Link of a course, if the course exists and has one.
    pub fn course_link(&self, course_title: &str) -> Result<Option<String>> {
        let link: Option<Option<String>> = self
            .conn
            .query_row(
                "SELECT course_link FROM courses WHERE title = ?1",
                [course_title],
                |row| row.get(0),
            )
            .optional()?;
        Ok(link.flatten())
    }

    /// Link of a lesson, if the course and lesson exist and the lesson has one.
    pub fn lesson_link(&self, course_title: &str, lesson_number: u32) -> Result<Option<String>> {
        let link: Option<Option<String>> = self
            .conn
            .query_row(
                "SELECT l.lesson_link
                 FROM lessons l JOIN courses c ON c.id = l.course_id
                 WHERE c.title = ?1 AND l.lesson_number = ?2",
                params![course_title, lesson_number],
                |row| row.get(0),
            )
            .optional()?;
        Ok(link.flatten())
    }

    /// Store the embedding of a course title.
    pub fn set_course_embedding(&self, title: &str, embedding: &[f32], model: &str) -> Result<()> {
        let updated = self.conn.execute(
            "UPDATE courses SET title_embedding = ?2, embedding_model = ?3 WHERE title = ?1",
            params![title, encode_embedding(embedding), model],
        )?;
        if updated == 0 {
            return Err(Error::NotFound {
                entity: "course",
                key: title.to_string(),
            });
        }
        Ok(())
    }

    /// Title embeddings of every course, ordered by title.
    pub fn list_course_embeddings(&self) -> Result<Vec<StoredCourseEmbedding>> {
        let mut stmt = self.conn.prepare(
            "SELECT title, title_embedding, embedding_model FROM courses ORDER BY title",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<Vec<u8>>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(title, blob, embedding_model)| {
                let embedding = blob
                    .map(|bytes| decode_embedding("courses", &title, &bytes))
                    .transpose()?;
                Ok(StoredCourseEmbedding {
                    title,
                    embedding,
                    embedding_model,
                })
            })
            .collect()
    }

    /// Titles of courses whose title embedding is missing or was produced
    /// by a different model.
    pub fn list_stale_course_titles(&self, model: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT title FROM courses
             WHERE title_embedding IS NULL OR embedding_model IS NOT ?1
             ORDER BY title",
        )?;
        let titles = stmt
            .query_map([model], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(titles)
    }

    /// Remove a course, its lessons and its chunks.
    pub fn delete_course(&self, course_title: &str) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM chunks WHERE course_title = ?1", [course_title])?;
        tx.execute("DELETE FROM courses WHERE title = ?1", [course_title])?;
        tx.commit()?;
        Ok(())
    }

    fn lessons_for(&self, course_id: &CourseId) -> Result<Vec<Lesson>> {
        let mut stmt = self.conn.prepare(
            "SELECT lesson_number, title, lesson_link FROM lessons
             WHERE course_id = ?1 ORDER BY lesson_number",
        )?;
        let lessons = stmt
            .query_map([course_id.to_string()], |row| {
                Ok(Lesson {
                    lesson_number: row.get(0)?,
                    title: row.get(1)?,
                    lesson_link: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(lessons)
    }
}

// Chunk content
impl Database {
    /// Insert or update chunks together with their embeddings.
    ///
    /// `embeddings[i]` belongs to `chunks[i]`. Rows are keyed by chunk id, so
    /// repeating the call with the same chunks leaves one row per chunk.
    pub fn upsert_chunks(
        &self,
        chunks: &[CourseChunk],
        embeddings: &[Vec<f32>],
        model: &str,
    ) -> Result<()> {
        if chunks.len() != embeddings.len() {
            return Err(Error::InvalidData(format!(
                "chunk count ({}) doesn't match embedding count ({})",
                chunks.len(),
                embeddings.len()
            )));
        }

        let now = Utc::now().to_rfc3339();
        let tx = self.conn.unchecked_transaction()?;
        for (chunk, embedding) in chunks.iter().zip(embeddings) {
            tx.execute(
                "INSERT INTO chunks (
                    id, course_title, lesson_number, chunk_index, content,
                    embedding, embedding_model, created_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(id) DO UPDATE SET
                    lesson_number = excluded.lesson_number,
                    content = excluded.content,
                    embedding = excluded.embedding,
                    embedding_model = excluded.embedding_model",
                params![
                    chunk.id.to_string(),
                    chunk.course_title,
                    chunk.lesson_number,
                    chunk.chunk_index,
                    chunk.content,
                    encode_embedding(embedding),
                    model,
                    now,
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// List chunks matching the filter, in course then chunk order.
    pub fn list_chunks(&self, filter: &ChunkFilter) -> Result<Vec<StoredChunk>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, course_title, lesson_number, chunk_index, content,
                    embedding, embedding_model
             FROM chunks
             WHERE (?1 IS NULL OR course_title = ?1)
               AND (?2 IS NULL OR lesson_number = ?2)
             ORDER BY course_title, chunk_index",
        )?;
        let rows = stmt
            .query_map(
                params![filter.course_title, filter.lesson_number],
                |row| {
                    Ok((
                        row_to_chunk(row)?,
                        row.get::<_, Option<Vec<u8>>>(5)?,
                        row.get::<_, Option<String>>(6)?,
                    ))
                },
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(chunk, blob, embedding_model)| {
                let embedding = blob
                    .map(|bytes| decode_embedding("chunks", &chunk.id.to_string(), &bytes))
                    .transpose()?;
                Ok(StoredChunk {
                    chunk,
                    embedding,
                    embedding_model,
                })
            })
            .collect()
    }

    /// Chunks whose embedding is missing or was produced by a different model.
    pub fn list_stale_chunks(&self, model: &str) -> Result<Vec<CourseChunk>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, course_title, lesson_number, chunk_index, content
             FROM chunks
             WHERE embedding IS NULL OR embedding_model IS NOT ?1
             ORDER BY course_title, chunk_index",
        )?;
        let chunks = stmt
            .query_map([model], row_to_chunk)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(chunks)
    }

    /// Replace the embedding of one chunk.
    pub fn set_chunk_embedding(&self, id: &ChunkId, embedding: &[f32], model: &str) -> Result<()> {
        let updated = self.conn.execute(
            "UPDATE chunks SET embedding = ?2, embedding_model = ?3 WHERE id = ?1",
            params![id.to_string(), encode_embedding(embedding), model],
        )?;
        if updated == 0 {
            return Err(Error::NotFound {
                entity: "chunk",
                key: id.to_string(),
            });
        }
        Ok(())
    }

    pub fn chunk_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Delete every course, lesson and chunk. Migrations are kept.
    pub fn clear_all(&self) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM chunks", [])?;
        tx.execute("DELETE FROM lessons", [])?;
        tx.execute("DELETE FROM courses", [])?;
        tx.commit()?;
        Ok(())
    }
}

fn row_to_course(row: &rusqlite::Row<'_>) -> rusqlite::Result<Course> {
    let id: String = row.get(0)?;
    let created_at: String = row.get(4)?;
    let updated_at: String = row.get(5)?;

    Ok(Course {
        id: id
            .parse()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?,
        title: row.get(1)?,
        course_link: row.get(2)?,
        instructor: row.get(3)?,
        lessons: Vec::new(),
        created_at: parse_timestamp(4, &created_at)?,
        updated_at: parse_timestamp(5, &updated_at)?,
    })
}

fn row_to_chunk(row: &rusqlite::Row<'_>) -> rusqlite::Result<CourseChunk> {
    let id: String = row.get(0)?;

    Ok(CourseChunk {
        id: id
            .parse()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?,
        course_title: row.get(1)?,
        lesson_number: row.get(2)?,
        chunk_index: row.get(3)?,
        content: row.get(4)?,
    })
}

fn parse_timestamp(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(Into::into)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Serialize an embedding as little-endian f32 bytes.
fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn decode_embedding(table: &'static str, key: &str, bytes: &[u8]) -> Result<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(Error::Corrupt {
            table,
            key: key.to_string(),
            reason: format!("embedding blob of {} bytes", bytes.len()),
        });
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_course() -> Course {
        Course::new("Building Towards Computer Use with Anthropic")
            .with_link("https://www.deeplearning.ai/short-courses/computer-use/")
            .with_instructor("Colt Steele")
            .with_lesson(Lesson::new(0, "Introduction").with_link("https://learn.example/lesson-0"))
            .with_lesson(Lesson::new(1, "Overview"))
    }

    #[test]
    fn test_database_open_in_memory() {
        let db = Database::open_in_memory().unwrap();
        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_reopen_does_not_reapply_migrations() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("lectern.db");
        drop(Database::open(&path).unwrap());
        let db = Database::open(&path).unwrap();
        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_course_round_trip_with_lessons() {
        let db = Database::open_in_memory().unwrap();
        let course = sample_course();
        db.upsert_course(&course).unwrap();

        let loaded = db.get_course_by_title(&course.title).unwrap().unwrap();
        assert_eq!(loaded.id, course.id);
        assert_eq!(loaded.instructor.as_deref(), Some("Colt Steele"));
        assert_eq!(loaded.lessons, course.lessons);
        assert!(db.get_course_by_title("Missing").unwrap().is_none());
    }

    #[test]
    fn test_upsert_course_is_idempotent_and_replaces_lessons() {
        let db = Database::open_in_memory().unwrap();
        let course = sample_course();
        db.upsert_course(&course).unwrap();
        db.upsert_course(&course).unwrap();
        assert_eq!(db.course_count().unwrap(), 1);

        let trimmed = Course::new(course.title.clone()).with_lesson(Lesson::new(3, "Only"));
        db.upsert_course(&trimmed).unwrap();
        let loaded = db.get_course_by_title(&course.title).unwrap().unwrap();
        assert_eq!(loaded.lessons, vec![Lesson::new(3, "Only")]);
    }

    #[test]
    fn test_links() {
        let db = Database::open_in_memory().unwrap();
        let course = sample_course();
        db.upsert_course(&course).unwrap();

        assert_eq!(
            db.course_link(&course.title).unwrap().as_deref(),
            Some("https://www.deeplearning.ai/short-courses/computer-use/")
        );
        assert_eq!(
            db.lesson_link(&course.title, 0).unwrap().as_deref(),
            Some("https://learn.example/lesson-0")
        );
        assert!(db.lesson_link(&course.title, 1).unwrap().is_none());
        assert!(db.lesson_link(&course.title, 9).unwrap().is_none());
        assert!(db.course_link("Missing").unwrap().is_none());
    }

    #[test]
    fn test_chunk_upsert_and_filter() {
        let db = Database::open_in_memory().unwrap();
        let chunks = vec![
            CourseChunk::new("A", Some(0), 0, "alpha"),
            CourseChunk::new("A", Some(1), 1, "beta"),
            CourseChunk::new("B", Some(1), 0, "gamma"),
        ];
        let embeddings = vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.5, 0.5]];
        db.upsert_chunks(&chunks, &embeddings, "hash-2").unwrap();
        db.upsert_chunks(&chunks, &embeddings, "hash-2").unwrap();
        assert_eq!(db.chunk_count().unwrap(), 3);

        let all = db.list_chunks(&ChunkFilter::default()).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[1].embedding.as_deref(), Some(&[0.0f32, 1.0][..]));

        let course_a = db.list_chunks(&ChunkFilter::default().course("A")).unwrap();
        assert_eq!(course_a.len(), 2);

        let lesson_1 = db.list_chunks(&ChunkFilter::default().lesson(1)).unwrap();
        assert_eq!(lesson_1.len(), 2);

        let a1 = db
            .list_chunks(&ChunkFilter::default().course("A").lesson(1))
            .unwrap();
        assert_eq!(a1.len(), 1);
        assert_eq!(a1[0].chunk.content, "beta");
    }

    #[test]
    fn test_upsert_chunks_rejects_length_mismatch() {
        let db = Database::open_in_memory().unwrap();
        let chunks = vec![CourseChunk::new("A", None, 0, "alpha")];
        let result = db.upsert_chunks(&chunks, &[], "hash-2");
        assert!(matches!(result, Err(Error::InvalidData(_))));
    }

    #[test]
    fn test_stale_chunks_follow_model() {
        let db = Database::open_in_memory().unwrap();
        let chunks = vec![CourseChunk::new("A", None, 0, "alpha")];
        db.upsert_chunks(&chunks, &[vec![1.0]], "hash-1").unwrap();

        assert!(db.list_stale_chunks("hash-1").unwrap().is_empty());
        let stale = db.list_stale_chunks("hash-8").unwrap();
        assert_eq!(stale, chunks);

        db.set_chunk_embedding(&chunks[0].id, &[0.0; 8], "hash-8")
            .unwrap();
        assert!(db.list_stale_chunks("hash-8").unwrap().is_empty());
    }

    #[test]
    fn test_course_embeddings() {
        let db = Database::open_in_memory().unwrap();
        let course = sample_course();
        db.upsert_course(&course).unwrap();
        assert_eq!(
            db.list_stale_course_titles("hash-2").unwrap(),
            vec![course.title.clone()]
        );

        db.set_course_embedding(&course.title, &[0.6, 0.8], "hash-2")
            .unwrap();
        let stored = db.list_course_embeddings().unwrap();
        assert_eq!(stored[0].embedding.as_deref(), Some(&[0.6f32, 0.8][..]));
        assert!(db.list_stale_course_titles("hash-2").unwrap().is_empty());

        // Updating metadata keeps the title embedding.
        db.upsert_course(&course).unwrap();
        assert!(db.list_stale_course_titles("hash-2").unwrap().is_empty());

        assert!(matches!(
            db.set_course_embedding("Missing", &[1.0], "hash-1"),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_delete_course_and_clear_all() {
        let db = Database::open_in_memory().unwrap();
        let course = sample_course();
        db.upsert_course(&course).unwrap();
        let chunks = vec![CourseChunk::new(course.title.clone(), Some(0), 0, "text")];
        db.upsert_chunks(&chunks, &[vec![1.0]], "hash-1").unwrap();

        db.delete_course(&course.title).unwrap();
        assert_eq!(db.course_count().unwrap(), 0);
        assert_eq!(db.chunk_count().unwrap(), 0);

        db.upsert_course(&course).unwrap();
        db.upsert_chunks(&chunks, &[vec![1.0]], "hash-1").unwrap();
        db.clear_all().unwrap();
        assert!(db.course_titles().unwrap().is_empty());
        assert_eq!(db.chunk_count().unwrap(), 0);
    }

    #[test]
    fn test_decode_embedding_rejects_partial_floats() {
        assert!(matches!(
            decode_embedding("chunks", "x", &[0, 1, 2]),
            Err(Error::Corrupt { .. })
        ));
        let bytes = encode_embedding(&[1.0, -2.5]);
        assert_eq!(decode_embedding("chunks", "x", &bytes).unwrap(), vec![1.0, -2.5]);
    }
}
