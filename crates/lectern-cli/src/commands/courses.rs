use anyhow::Result;
use lectern_ingest::Config;

/// Print course analytics: counts, titles and lesson totals.
pub fn show_courses(config: &Config) -> Result<()> {
    let store = super::open_store(config, config.max_results)?;
    let courses = store.all_courses_metadata()?;

    println!("\n📊 Lectern Courses\n");
    println!("  Database: {}", config.database_path.display());
    println!("  Embedding model: {}", config.embedding_model);
    println!("  Courses: {}", courses.len());
    println!("  Chunks: {}", store.chunk_count()?);

    if courses.is_empty() {
        println!("\n  Run `lectern ingest <path>` to add course transcripts");
        return Ok(());
    }

    println!();
    for course in &courses {
        println!("  • {} ({} lessons)", course.title, course.lessons.len());
        if let Some(instructor) = &course.instructor {
            println!("      Instructor: {instructor}");
        }
    }

    Ok(())
}
