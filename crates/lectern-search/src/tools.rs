//! Search tools exposed to a tool-calling model, and the manager that
//! dispatches to them.

use serde::Deserialize;
use serde_json::{json, Value};
use std::fmt;

use crate::error::SearchError;
use crate::source::Source;
use crate::store::{SearchHit, VectorStore};

/// A callable tool with an Anthropic-style JSON schema.
pub trait Tool: fmt::Debug {
    /// Tool name, as it appears in [`Tool::definition`].
    fn name(&self) -> &'static str;

    /// Definition in the `{name, description, input_schema}` shape.
    fn definition(&self) -> Value;

    /// Run the tool. Failures are reported in the returned text.
    fn execute(&mut self, input: &Value) -> String;

    /// Sources consulted by the most recent [`Tool::execute`].
    fn last_sources(&self) -> &[Source] {
        &[]
    }

    fn reset_sources(&mut self) {}
}

/// Input of [`CourseSearchTool`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub course_name: Option<String>,
    #[serde(default)]
    pub lesson_number: Option<u32>,
}

impl SearchRequest {
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            course_name: None,
            lesson_number: None,
        }
    }

    #[must_use]
    pub fn in_course(mut self, course_name: impl Into<String>) -> Self {
        self.course_name = Some(course_name.into());
        self
    }

    #[must_use]
    pub fn in_lesson(mut self, lesson_number: u32) -> Self {
        self.lesson_number = Some(lesson_number);
        self
    }
}

/// Semantic search over course content with course and lesson filters.
///
/// After every search, [`CourseSearchTool::last_sources`] holds exactly the
/// sources behind the returned text, in result order. Searches that fail
/// or find nothing leave it empty.
#[derive(Debug)]
pub struct CourseSearchTool<'a> {
    store: &'a VectorStore,
    last_sources: Vec<Source>,
}

impl<'a> CourseSearchTool<'a> {
    #[must_use]
    pub fn new(store: &'a VectorStore) -> Self {
        Self {
            store,
            last_sources: Vec::new(),
        }
    }

    /// Search and format the results for display.
    pub fn search(&mut self, request: &SearchRequest) -> String {
        self.last_sources.clear();

        let hits = match self.store.search(
            &request.query,
            request.course_name.as_deref(),
            request.lesson_number,
            None,
        ) {
            Ok(hits) => hits,
            Err(e @ SearchError::CourseNotFound(_)) => return e.to_string(),
            Err(e) => {
                log::warn!("Search for '{}' failed: {}", request.query, e);
                return format!("Search error: {e}");
            }
        };

        if hits.is_empty() {
            let course_info = request
                .course_name
                .as_ref()
                .map(|course| format!(" in course '{course}'"))
                .unwrap_or_default();
            let lesson_info = request
                .lesson_number
                .map(|lesson| format!(" in lesson {lesson}"))
                .unwrap_or_default();
            return format!("No relevant content found{course_info}{lesson_info}.");
        }

        self.format_results(&hits)
    }

    fn format_results(&mut self, hits: &[SearchHit]) -> String {
        let mut blocks = Vec::with_capacity(hits.len());

        for hit in hits {
            let course_title = &hit.chunk.course_title;
            let (label, link) = match hit.chunk.lesson_number {
                Some(number) => (
                    format!("{course_title} - Lesson {number}"),
                    self.link_or_none(self.store.lesson_link(course_title, number)),
                ),
                None => (
                    course_title.clone(),
                    self.link_or_none(self.store.course_link(course_title)),
                ),
            };

            blocks.push(format!("[{label}]\n{}", hit.chunk.content));

            let source = Source::new(label);
            self.last_sources.push(match link {
                Some(link) => source.with_link(link),
                None => source,
            });
        }

        blocks.join("\n\n")
    }

    fn link_or_none(&self, link: Result<Option<String>, SearchError>) -> Option<String> {
        link.unwrap_or_else(|e| {
            log::warn!("Link lookup failed: {}", e);
            None
        })
    }

    #[must_use]
    pub fn last_sources(&self) -> &[Source] {
        &self.last_sources
    }
}

impl Tool for CourseSearchTool<'_> {
    fn name(&self) -> &'static str {
        "search_course_content"
    }

    fn definition(&self) -> Value {
        json!({
            "name": self.name(),
            "description": "Search course materials with smart course name matching and lesson filtering",
            "input_schema": {
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "What to search for in the course content"
                    },
                    "course_name": {
                        "type": "string",
                        "description": "Course title (partial matches work, e.g. 'MCP', 'Introduction')"
                    },
                    "lesson_number": {
                        "type": "integer",
                        "description": "Specific lesson number to filter by (e.g. 1, 2, 3)"
                    }
                },
                "required": ["query"]
            }
        })
    }

    fn execute(&mut self, input: &Value) -> String {
        match SearchRequest::deserialize(input) {
            Ok(request) => self.search(&request),
            Err(e) => {
                self.last_sources.clear();
                format!("Invalid input for {}: {e}", self.name())
            }
        }
    }

    fn last_sources(&self) -> &[Source] {
        &self.last_sources
    }

    fn reset_sources(&mut self) {
        self.last_sources.clear();
    }
}

#[derive(Debug, Deserialize)]
struct OutlineRequest {
    course_name: String,
}

/// Course title, link and lesson list for a (possibly partial) course name.
#[derive(Debug)]
pub struct CourseOutlineTool<'a> {
    store: &'a VectorStore,
}

impl<'a> CourseOutlineTool<'a> {
    #[must_use]
    pub fn new(store: &'a VectorStore) -> Self {
        Self { store }
    }

    pub fn outline(&self, course_name: &str) -> String {
        let course = match self.store.resolve_course_name(course_name) {
            Ok(Some(title)) => self.store.course(&title),
            Ok(None) => return SearchError::CourseNotFound(course_name.to_string()).to_string(),
            Err(e) => return format!("Search error: {e}"),
        };

        let course = match course {
            Ok(Some(course)) => course,
            Ok(None) => return SearchError::CourseNotFound(course_name.to_string()).to_string(),
            Err(e) => return format!("Search error: {e}"),
        };

        let mut lines = vec![format!("Course Title: {}", course.title)];
        if let Some(link) = &course.course_link {
            lines.push(format!("Course Link: {link}"));
        }
        if let Some(instructor) = &course.instructor {
            lines.push(format!("Course Instructor: {instructor}"));
        }
        lines.push(format!("Lessons ({}):", course.lessons.len()));
        for lesson in &course.lessons {
            lines.push(format!("  Lesson {}: {}", lesson.lesson_number, lesson.title));
        }
        lines.join("\n")
    }
}

impl Tool for CourseOutlineTool<'_> {
    fn name(&self) -> &'static str {
        "get_course_outline"
    }

    fn definition(&self) -> Value {
        json!({
            "name": self.name(),
            "description": "Get the title, link and complete lesson list of a course",
            "input_schema": {
                "type": "object",
                "properties": {
                    "course_name": {
                        "type": "string",
                        "description": "Course title (partial matches work)"
                    }
                },
                "required": ["course_name"]
            }
        })
    }

    fn execute(&mut self, input: &Value) -> String {
        match OutlineRequest::deserialize(input) {
            Ok(request) => self.outline(&request.course_name),
            Err(e) => format!("Invalid input for {}: {e}", self.name()),
        }
    }
}

/// Registry of tools, addressed by name.
#[derive(Debug, Default)]
pub struct ToolManager<'a> {
    tools: Vec<Box<dyn Tool + 'a>>,
}

impl<'a> ToolManager<'a> {
    #[must_use]
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Register a tool, replacing any tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool + 'a>) {
        let name = tool.name();
        self.tools.retain(|t| t.name() != name);
        self.tools.push(tool);
    }

    /// Definitions of every registered tool, in registration order.
    pub fn definitions(&self) -> Vec<Value> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    pub fn execute_tool(&mut self, name: &str, input: &Value) -> String {
        match self.tools.iter_mut().find(|t| t.name() == name) {
            Some(tool) => tool.execute(input),
            None => format!("Tool '{name}' not found"),
        }
    }

    /// Sources of the first tool that has any.
    pub fn last_sources(&self) -> &[Source] {
        self.tools
            .iter()
            .map(|t| t.last_sources())
            .find(|sources| !sources.is_empty())
            .unwrap_or(&[])
    }

    pub fn reset_sources(&mut self) {
        for tool in &mut self.tools {
            tool.reset_sources();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashingEmbedder;
    use lectern_core::model::{Course, CourseChunk, Lesson};

    const TITLE: &str = "Prompt Compression and Query Optimization";

    fn populated_store() -> VectorStore {
        let store = VectorStore::in_memory(Box::new(HashingEmbedder::default()), 5).unwrap();
        let course = Course::new(TITLE)
            .with_link("https://learn.example/prompt-compression")
            .with_instructor("Richmond Alake")
            .with_lesson(Lesson::new(0, "Introduction").with_link("https://learn.example/pc/0"))
            .with_lesson(Lesson::new(1, "Vanilla Vector Search"));
        store.add_course_metadata(&course).unwrap();
        store
            .add_course_content(&[
                CourseChunk::new(
                    TITLE,
                    Some(0),
                    0,
                    format!("Course {TITLE} Lesson 0 content: Welcome to this introduction."),
                ),
                CourseChunk::new(
                    TITLE,
                    Some(1),
                    1,
                    format!("Course {TITLE} Lesson 1 content: Vanilla vector search basics."),
                ),
            ])
            .unwrap();
        store
    }

    #[test]
    fn test_search_formats_results_and_records_sources() {
        let store = populated_store();
        let mut tool = CourseSearchTool::new(&store);

        let result = tool.search(&SearchRequest::new("introduction"));
        assert!(result.starts_with(&format!("[{TITLE} - Lesson 0]\nCourse {TITLE} Lesson 0")));
        assert!(result.contains(&format!("\n\n[{TITLE} - Lesson 1]\n")));

        let sources: Vec<String> = tool.last_sources().iter().map(ToString::to_string).collect();
        assert_eq!(
            sources,
            vec![
                format!("{TITLE} - Lesson 0|https://learn.example/pc/0"),
                format!("{TITLE} - Lesson 1"),
            ]
        );
    }

    #[test]
    fn test_sources_are_replaced_on_every_call() {
        let store = populated_store();
        let mut tool = CourseSearchTool::new(&store);

        tool.search(&SearchRequest::new("introduction"));
        assert_eq!(tool.last_sources().len(), 2);

        tool.search(&SearchRequest::new("vector").in_lesson(1));
        assert_eq!(tool.last_sources().len(), 1);
        assert_eq!(tool.last_sources()[0].label(), format!("{TITLE} - Lesson 1"));

        let result = tool.search(&SearchRequest::new("vector").in_lesson(7));
        assert_eq!(result, "No relevant content found in lesson 7.");
        assert!(tool.last_sources().is_empty());
    }

    #[test]
    fn test_unknown_course_message() {
        let store = populated_store();
        let mut tool = CourseSearchTool::new(&store);
        let result = tool.search(&SearchRequest::new("anything").in_course("Quantum Chemistry"));
        assert_eq!(result, "No course found matching 'Quantum Chemistry'");
        assert!(tool.last_sources().is_empty());
    }

    #[test]
    fn test_store_failure_is_reported_and_clears_sources() {
        let store = populated_store();
        let mut tool = CourseSearchTool::new(&store);
        tool.search(&SearchRequest::new("introduction"));
        assert!(!tool.last_sources().is_empty());

        store
            .database()
            .conn()
            .execute("UPDATE chunks SET embedding = X'010203'", [])
            .unwrap();

        let result = tool.search(&SearchRequest::new("introduction"));
        assert!(result.starts_with("Search error: "), "{result}");
        assert!(result.contains("embedding blob of 3 bytes"), "{result}");
        assert!(tool.last_sources().is_empty());
    }

    #[test]
    fn test_empty_store_message_includes_filters() {
        let store = VectorStore::in_memory(Box::new(HashingEmbedder::default()), 5).unwrap();
        store.add_course_metadata(&Course::new(TITLE)).unwrap();
        let mut tool = CourseSearchTool::new(&store);

        assert_eq!(
            tool.search(&SearchRequest::new("x")),
            "No relevant content found."
        );
        assert_eq!(
            tool.search(&SearchRequest::new("x").in_course("prompt").in_lesson(2)),
            "No relevant content found in course 'prompt' in lesson 2."
        );
    }

    #[test]
    fn test_course_level_chunks_use_course_link() {
        let store = VectorStore::in_memory(Box::new(HashingEmbedder::default()), 5).unwrap();
        store
            .add_course_metadata(&Course::new("Plain Notes").with_link("https://notes.example"))
            .unwrap();
        store
            .add_course_content(&[CourseChunk::new("Plain Notes", None, 0, "Loose notes.")])
            .unwrap();
        let mut tool = CourseSearchTool::new(&store);

        let result = tool.search(&SearchRequest::new("notes"));
        assert_eq!(result, "[Plain Notes]\nLoose notes.");
        assert_eq!(
            tool.last_sources()[0].to_string(),
            "Plain Notes|https://notes.example"
        );
    }

    #[test]
    fn test_execute_parses_json_input() {
        let store = populated_store();
        let mut tool = CourseSearchTool::new(&store);

        let result = tool.execute(&json!({"query": "vector", "course_name": "prompt", "lesson_number": 1}));
        assert!(result.starts_with(&format!("[{TITLE} - Lesson 1]")));

        let result = tool.execute(&json!({"course_name": "prompt"}));
        assert!(result.starts_with("Invalid input for search_course_content"));
        assert!(tool.last_sources().is_empty());
    }

    #[test]
    fn test_definition_shape() {
        let store = populated_store();
        let tool = CourseSearchTool::new(&store);
        let definition = tool.definition();
        assert_eq!(definition["name"], "search_course_content");
        assert_eq!(definition["input_schema"]["required"], json!(["query"]));
    }

    #[test]
    fn test_outline() {
        let store = populated_store();
        let tool = CourseOutlineTool::new(&store);
        assert_eq!(
            tool.outline("prompt compression"),
            format!(
                "Course Title: {TITLE}\n\
                 Course Link: https://learn.example/prompt-compression\n\
                 Course Instructor: Richmond Alake\n\
                 Lessons (2):\n  \
                 Lesson 0: Introduction\n  \
                 Lesson 1: Vanilla Vector Search"
            )
        );
        assert_eq!(
            tool.outline("Quantum Chemistry"),
            "No course found matching 'Quantum Chemistry'"
        );
    }

    #[test]
    fn test_tool_manager_dispatch_and_sources() {
        let store = populated_store();
        let mut manager = ToolManager::new();
        manager.register(Box::new(CourseSearchTool::new(&store)));
        manager.register(Box::new(CourseOutlineTool::new(&store)));
        manager.register(Box::new(CourseSearchTool::new(&store)));

        let names: Vec<Value> = manager.definitions().into_iter().map(|d| d["name"].clone()).collect();
        assert_eq!(names, vec![json!("get_course_outline"), json!("search_course_content")]);

        assert!(manager.last_sources().is_empty());
        manager.execute_tool("search_course_content", &json!({"query": "introduction"}));
        assert_eq!(manager.last_sources().len(), 2);

        manager.reset_sources();
        assert!(manager.last_sources().is_empty());

        assert_eq!(
            manager.execute_tool("summarize", &json!({})),
            "Tool 'summarize' not found"
        );
    }
}
