//! The vector store: course catalog plus embedded content chunks.

use std::path::Path;

use lectern_core::model::{Course, CourseChunk};
use lectern_core::schema::{ChunkFilter, Database};

use crate::embedding::{cosine_similarity, Embedder};
use crate::error::{SearchError, SearchResult};

/// One ranked search result.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub chunk: CourseChunk,

    /// Cosine distance to the query (0.0 is identical).
    pub distance: f32,
}

/// Semantic storage and retrieval over course content.
///
/// Every write embeds its text before returning, so added content is
/// searchable by the next call on the same store.
#[derive(Debug)]
pub struct VectorStore {
    db: Database,
    embedder: Box<dyn Embedder>,
    max_results: usize,
}

impl VectorStore {
    /// Open (or create) a store backed by the database at `path`.
    pub fn open(
        path: impl AsRef<Path>,
        embedder: Box<dyn Embedder>,
        max_results: usize,
    ) -> SearchResult<Self> {
        let db = Database::open(path)?;
        Ok(Self::with_database(db, embedder, max_results))
    }

    /// A store backed by an in-memory database.
    pub fn in_memory(embedder: Box<dyn Embedder>, max_results: usize) -> SearchResult<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self::with_database(db, embedder, max_results))
    }

    #[must_use]
    pub fn with_database(db: Database, embedder: Box<dyn Embedder>, max_results: usize) -> Self {
        Self {
            db,
            embedder,
            max_results,
        }
    }

    #[must_use]
    pub const fn database(&self) -> &Database {
        &self.db
    }

    #[must_use]
    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    #[must_use]
    pub const fn max_results(&self) -> usize {
        self.max_results
    }

    /// Add or refresh a course in the catalog, including its lessons.
    pub fn add_course_metadata(&self, course: &Course) -> SearchResult<()> {
        self.db.upsert_course(course)?;
        let embedding = self.embedder.embed(&course.title);
        self.db
            .set_course_embedding(&course.title, &embedding, self.embedder.model_name())?;
        log::debug!(
            "Catalogued course '{}' with {} lessons",
            course.title,
            course.lessons.len()
        );
        Ok(())
    }

    /// Embed and store content chunks.
    pub fn add_course_content(&self, chunks: &[CourseChunk]) -> SearchResult<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        let embeddings = self.embedder.embed_batch(&texts);
        self.db
            .upsert_chunks(chunks, &embeddings, self.embedder.model_name())?;
        log::debug!("Stored {} chunks", chunks.len());
        Ok(())
    }

    /// Rank stored chunks against `query`.
    ///
    /// `course_name` may be a partial or approximate title; it is resolved
    /// with [`Self::resolve_course_name`] and an unresolvable name fails with
    /// [`SearchError::CourseNotFound`]. `limit` defaults to the store's
    /// `max_results`.
    pub fn search(
        &self,
        query: &str,
        course_name: Option<&str>,
        lesson_number: Option<u32>,
        limit: Option<usize>,
    ) -> SearchResult<Vec<SearchHit>> {
        let mut filter = ChunkFilter::default();
        if let Some(name) = course_name {
            let title = self
                .resolve_course_name(name)?
                .ok_or_else(|| SearchError::CourseNotFound(name.to_string()))?;
            filter = filter.course(title);
        }
        if let Some(number) = lesson_number {
            filter = filter.lesson(number);
        }

        let limit = limit.unwrap_or(self.max_results);
        if limit == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(query);
        let mut hits: Vec<SearchHit> = self
            .db
            .list_chunks(&filter)?
            .into_iter()
            .filter_map(|stored| {
                let Some(embedding) = stored.embedding else {
                    log::debug!("Skipping unembedded chunk {}", stored.chunk.id);
                    return None;
                };
                Some(SearchHit {
                    distance: 1.0 - cosine_similarity(&query_embedding, &embedding),
                    chunk: stored.chunk,
                })
            })
            .collect();

        // Stable sort: equal distances keep course/chunk order.
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(limit);
        Ok(hits)
    }

    /// Map a user-supplied course name to a catalog title.
    ///
    /// Tries, in order: case-insensitive exact match, case-insensitive
    /// substring match, then the nearest title embedding with positive
    /// similarity.
    pub fn resolve_course_name(&self, name: &str) -> SearchResult<Option<String>> {
        let wanted = name.trim().to_lowercase();
        if wanted.is_empty() {
            return Ok(None);
        }

        let titles = self.db.course_titles()?;
        if let Some(title) = titles.iter().find(|t| t.to_lowercase() == wanted) {
            return Ok(Some(title.clone()));
        }
        if let Some(title) = titles.iter().find(|t| t.to_lowercase().contains(&wanted)) {
            return Ok(Some(title.clone()));
        }

        let query = self.embedder.embed(name);
        let best = self
            .db
            .list_course_embeddings()?
            .into_iter()
            .filter_map(|stored| {
                let score = cosine_similarity(&query, stored.embedding.as_deref()?);
                (score > 0.0).then_some((score, stored.title))
            })
            .max_by(|a, b| a.0.total_cmp(&b.0));

        Ok(best.map(|(_, title)| title))
    }

    pub fn course_link(&self, course_title: &str) -> SearchResult<Option<String>> {
        Ok(self.db.course_link(course_title)?)
    }

    pub fn lesson_link(
        &self,
        course_title: &str,
        lesson_number: u32,
    ) -> SearchResult<Option<String>> {
        Ok(self.db.lesson_link(course_title, lesson_number)?)
    }

    pub fn course(&self, course_title: &str) -> SearchResult<Option<Course>> {
        Ok(self.db.get_course_by_title(course_title)?)
    }

    pub fn existing_course_titles(&self) -> SearchResult<Vec<String>> {
        Ok(self.db.course_titles()?)
    }

    pub fn course_count(&self) -> SearchResult<usize> {
        Ok(self.db.course_count()?)
    }

    pub fn chunk_count(&self) -> SearchResult<usize> {
        Ok(self.db.chunk_count()?)
    }

    /// Every catalogued course with its lessons.
    pub fn all_courses_metadata(&self) -> SearchResult<Vec<Course>> {
        Ok(self.db.list_courses()?)
    }

    /// Remove one course and all of its content.
    pub fn remove_course(&self, course_title: &str) -> SearchResult<()> {
        Ok(self.db.delete_course(course_title)?)
    }

    pub fn clear_all_data(&self) -> SearchResult<()> {
        self.db.clear_all()?;
        log::info!("Cleared all courses and content");
        Ok(())
    }

    /// Re-embed every chunk and course title that was stored by a different
    /// model (or never embedded). Returns how many embeddings were written.
    pub fn reindex_stale(&self) -> SearchResult<usize> {
        let model = self.embedder.model_name();
        let mut count = 0;

        for title in self.db.list_stale_course_titles(model)? {
            let embedding = self.embedder.embed(&title);
            self.db.set_course_embedding(&title, &embedding, model)?;
            count += 1;
        }

        for chunk in self.db.list_stale_chunks(model)? {
            let embedding = self.embedder.embed(&chunk.content);
            self.db.set_chunk_embedding(&chunk.id, &embedding, model)?;
            count += 1;
        }

        if count > 0 {
            log::info!("Re-embedded {} entries with {}", count, model);
        }
        Ok(count)
    }
}
