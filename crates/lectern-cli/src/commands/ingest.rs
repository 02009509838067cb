use anyhow::{Context, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};
use lectern_ingest::{build_pipeline, Config, CourseDocument};

/// State store for pipeline progress, kept next to the catalog database.
fn state_path(db_path: &Path) -> PathBuf {
    db_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join("pipeline.db")
}

pub async fn run_ingest(path: PathBuf, config: &Config, clear: bool, replace: bool) -> Result<()> {
    log::info!("Starting ingest of {}", path.display());

    if !path.exists() {
        anyhow::bail!("No such file or folder: {}", path.display());
    }

    println!("\n📚 Lectern Ingest\n");
    println!("  Source: {}", path.display());
    println!("  Database: {}", config.database_path.display());
    println!();

    let workflow = build_pipeline(
        path.clone(),
        config.database_path.clone(),
        config,
        replace,
        clear,
    )?;

    let mut store = treadle::SqliteStateStore::open(&state_path(&config.database_path))
        .await
        .context("Failed to open pipeline state")?;

    // Each run is its own work item so completed stages from earlier runs
    // do not short-circuit this one.
    let job = CourseDocument::new(
        format!("ingest:{}:{}", path.display(), Utc::now().timestamp_millis()),
        path,
    );

    let mut events = workflow.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                treadle::WorkflowEvent::StageStarted { stage, .. } => {
                    println!("  ⏳ [{stage}] Starting...");
                }
                treadle::WorkflowEvent::StageCompleted { stage, .. } => {
                    println!("  ✓ [{stage}] Complete");
                }
                treadle::WorkflowEvent::StageFailed { stage, error, .. } => {
                    eprintln!("  ✗ [{stage}] FAILED: {error}");
                }
                _ => {}
            }
        }
    });

    workflow.advance(&job, &mut store).await?;

    let catalog = super::open_store(config, config.max_results)?;
    println!("\n✓ Ingest complete");
    println!(
        "  {} courses, {} chunks indexed",
        catalog.course_count()?,
        catalog.chunk_count()?
    );
    Ok(())
}
