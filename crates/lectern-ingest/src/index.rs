use std::path::PathBuf;

use lectern_search::{embedder_for, VectorStore};
use treadle::{Stage, StageContext, StageOutcome};

use crate::error::IngestResult;

/// The Index stage: bring every stored embedding up to the configured model.
///
/// Content added by the ingest stage is already embedded; this stage picks
/// up entries written by an earlier model or left without an embedding.
#[derive(Debug)]
pub struct IndexStage {
    db_path: PathBuf,
    embedding_model: String,
    max_results: usize,
}

impl IndexStage {
    #[must_use]
    pub fn new(db_path: PathBuf, embedding_model: impl Into<String>, max_results: usize) -> Self {
        Self {
            db_path,
            embedding_model: embedding_model.into(),
            max_results,
        }
    }

    fn run(&self) -> IngestResult<usize> {
        let embedder = embedder_for(&self.embedding_model)?;
        let store = VectorStore::open(&self.db_path, embedder, self.max_results)?;
        Ok(store.reindex_stale()?)
    }
}

#[async_trait::async_trait]
impl Stage for IndexStage {
    fn name(&self) -> &str {
        "index"
    }

    async fn execute(
        &self,
        _item: &dyn treadle::WorkItem,
        _context: &mut StageContext,
    ) -> treadle::Result<StageOutcome> {
        match self.run() {
            Ok(count) => {
                log::info!("Index complete: {} embeddings refreshed", count);
                Ok(StageOutcome::Complete)
            }
            Err(e) => Err(treadle::TreadleError::StageExecution(format!(
                "Index failed: {e}"
            ))),
        }
    }
}
