use anyhow::{Context, Result};
use lectern_ingest::Config;
use lectern_search::{embedder_for, VectorStore};

pub mod check_links;
pub mod config;
pub mod courses;
pub mod ingest;
pub mod outline;
pub mod search;

pub use check_links::run_link_check;
pub use courses::show_courses;
pub use ingest::run_ingest;
pub use outline::show_outline;
pub use search::run_search;

/// Open the configured vector store.
fn open_store(config: &Config, max_results: usize) -> Result<VectorStore> {
    let embedder = embedder_for(&config.embedding_model)?;
    VectorStore::open(&config.database_path, embedder, max_results).with_context(|| {
        format!(
            "Failed to open database {}",
            config.database_path.display()
        )
    })
}
