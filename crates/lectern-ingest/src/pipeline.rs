use std::path::PathBuf;
use treadle::Workflow;

use crate::{Config, IndexStage, IngestStage};

/// Build the ingest + index pipeline.
///
/// `replace` re-ingests courses that are already catalogued and
/// `clear_existing` empties the store before ingesting.
///
/// # Errors
/// Returns an error if the configuration is invalid or the workflow cannot
/// be built.
pub fn build_pipeline(
    docs_path: PathBuf,
    db_path: PathBuf,
    config: &Config,
    replace: bool,
    clear_existing: bool,
) -> treadle::Result<Workflow> {
    config.validate().map_err(|e| {
        treadle::TreadleError::InvalidWorkflow(format!("Invalid configuration: {e}"))
    })?;

    let ingest_stage = IngestStage::new(docs_path, db_path.clone(), config.clone())
        .with_replace(replace)
        .with_clear_existing(clear_existing);
    let index_stage = IndexStage::new(db_path, config.embedding_model.clone(), config.max_results);

    Workflow::builder()
        .stage("ingest", ingest_stage)
        .stage("index", index_stage)
        .dependency("index", "ingest")
        .build()
}
