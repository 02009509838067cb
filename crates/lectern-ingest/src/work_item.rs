use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use treadle::WorkItem;

/// A transcript file or folder being processed through the pipeline.
///
/// This is the treadle `WorkItem` that flows through the ingest → index
/// stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseDocument {
    /// Unique ID for this work item; treadle keys stage state on it.
    id: String,
    /// Path to a transcript or a folder of transcripts.
    pub path: PathBuf,
}

impl CourseDocument {
    #[must_use]
    pub fn new(id: impl Into<String>, path: PathBuf) -> Self {
        Self {
            id: id.into(),
            path,
        }
    }

    /// A work item whose id is the path itself, so re-running the pipeline
    /// on the same input resumes the same item.
    #[must_use]
    pub fn for_path(path: PathBuf) -> Self {
        Self::new(format!("ingest:{}", path.display()), path)
    }
}

impl WorkItem for CourseDocument {
    fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for CourseDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}
