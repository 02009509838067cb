//! Document ingestion for lectern.
//!
//! Parses course transcripts into a course record and content chunks, and
//! runs the ingest and index stages as treadle `Stage` implementations.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod chunker;
pub mod config;
pub mod document;
pub mod error;
pub mod index;
pub mod ingest;
pub mod pipeline;
pub mod work_item;

pub use chunker::Chunker;
pub use config::Config;
pub use document::DocumentProcessor;
pub use error::{IngestError, IngestResult};
pub use index::IndexStage;
pub use ingest::{add_course_document, add_course_folder, IngestStage, IngestSummary};
pub use pipeline::build_pipeline;
pub use work_item::CourseDocument;
