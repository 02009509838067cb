//! Core domain model for lectern.
//!
//! This crate defines the course model (Course, Lesson, CourseChunk),
//! the SQLite schema that backs the vector store, and the shared error
//! type.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod error;
pub mod model;
pub mod schema;

pub use error::{Error, Result};
