use anyhow::Result;
use lectern_ingest::Config;
use lectern_search::{CourseOutlineTool, ToolManager};
use serde_json::json;

pub fn show_outline(course: &str, config: &Config) -> Result<()> {
    let store = super::open_store(config, config.max_results)?;

    let mut tools = ToolManager::new();
    tools.register(Box::new(CourseOutlineTool::new(&store)));
    println!(
        "{}",
        tools.execute_tool("get_course_outline", &json!({ "course_name": course }))
    );
    Ok(())
}
