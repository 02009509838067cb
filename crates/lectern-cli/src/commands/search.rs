use anyhow::Result;
use lectern_ingest::Config;
use lectern_search::{CourseSearchTool, SearchRequest};

pub fn run_search(
    query: &str,
    course: Option<String>,
    lesson: Option<u32>,
    limit: Option<usize>,
    config: &Config,
) -> Result<()> {
    let limit = limit.unwrap_or(config.max_results);
    if limit == 0 {
        anyhow::bail!("--limit must be greater than zero");
    }

    let store = super::open_store(config, limit)?;
    let mut tool = CourseSearchTool::new(&store);

    let mut request = SearchRequest::new(query);
    if let Some(course) = course {
        request = request.in_course(course);
    }
    if let Some(lesson) = lesson {
        request = request.in_lesson(lesson);
    }

    println!("{}", tool.search(&request));

    let sources = tool.last_sources();
    if !sources.is_empty() {
        println!("\nSources:");
        for source in sources {
            match source.link() {
                Some(link) => println!("  {} <{}>", source.label(), link),
                None => println!("  {}", source.label()),
            }
        }
    }

    Ok(())
}
