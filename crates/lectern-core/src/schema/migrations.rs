/// A schema migration.
#[derive(Debug)]
pub struct Migration {
    pub version: u32,
    pub name: &'static str,
    pub sql: &'static str,
}

const MIGRATION_001: &str = r#"
-- Courses (catalog of ingested transcripts; title is the natural key)
CREATE TABLE IF NOT EXISTS courses (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL UNIQUE,
    course_link TEXT,
    instructor TEXT,
    title_embedding BLOB,
    embedding_model TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Lessons (ordered by lesson number within a course)
CREATE TABLE IF NOT EXISTS lessons (
    course_id TEXT NOT NULL REFERENCES courses(id) ON DELETE CASCADE,
    lesson_number INTEGER NOT NULL,
    title TEXT NOT NULL,
    lesson_link TEXT,
    PRIMARY KEY (course_id, lesson_number)
);

-- Content chunks. Keyed by course title rather than course id so content
-- can be added before (or without) its catalog entry.
CREATE TABLE IF NOT EXISTS chunks (
    id TEXT PRIMARY KEY,
    course_title TEXT NOT NULL,
    lesson_number INTEGER,
    chunk_index INTEGER NOT NULL,
    content TEXT NOT NULL,
    embedding BLOB,
    embedding_model TEXT,
    created_at TEXT NOT NULL,
    UNIQUE (course_title, chunk_index)
);

CREATE INDEX IF NOT EXISTS idx_chunks_course_title ON chunks(course_title);
CREATE INDEX IF NOT EXISTS idx_chunks_course_lesson ON chunks(course_title, lesson_number);
CREATE INDEX IF NOT EXISTS idx_chunks_embedding_model ON chunks(embedding_model);
"#;

pub const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: MIGRATION_001,
}];
