//! Search provenance.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Delimiter between the display label and the link in a rendered source.
pub const DELIMITER: char = '|';

/// Where a piece of search output came from.
///
/// Renders as `label` or `label|link`. The label never contains the
/// delimiter and the link is percent-encoded where it would, so a rendered
/// source always splits into at most two parts, both non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    label: String,
    link: Option<String>,
}

impl Source {
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into().replace(DELIMITER, "/"),
            link: None,
        }
    }

    /// Attach a link. Blank links are ignored.
    #[must_use]
    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        let link = link.into();
        let link = link.trim();
        if !link.is_empty() {
            self.link = Some(link.replace(DELIMITER, "%7C"));
        }
        self
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn link(&self) -> Option<&str> {
        self.link.as_deref()
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.link {
            Some(link) => write!(f, "{}{DELIMITER}{}", self.label, link),
            None => write!(f, "{}", self.label),
        }
    }
}
