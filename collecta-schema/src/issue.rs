//! Content validation issues.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What kind of problem an issue describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssueKind {
    /// The value has the wrong structure or primitive type.
    Schema,
    /// The value is well-typed but semantically invalid.
    Validation,
}

/// A key inside a content tree: an object property or a list index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathKey {
    Index(usize),
    Name(String),
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathKey::Index(i) => write!(f, "{i}"),
            PathKey::Name(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathSegment {
    pub key: PathKey,
}

impl PathSegment {
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            key: PathKey::Name(name.into()),
        }
    }

    pub fn index(index: usize) -> Self {
        Self {
            key: PathKey::Index(index),
        }
    }
}

/// A single problem found in a value, located by its path from the root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub kind: IssueKind,
    pub message: String,
    pub path: Vec<PathSegment>,
}

impl Issue {
    pub fn schema(message: impl Into<String>, path: Vec<PathSegment>) -> Self {
        Self {
            kind: IssueKind::Schema,
            message: message.into(),
            path,
        }
    }

    pub fn validation(message: impl Into<String>, path: Vec<PathSegment>) -> Self {
        Self {
            kind: IssueKind::Validation,
            message: message.into(),
            path,
        }
    }

    /// Returns the path as a dotted string, e.g. `documents.0.content.title`.
    pub fn path_string(&self) -> String {
        self.path
            .iter()
            .map(|segment| segment.key.to_string())
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "(root): {}", self.message)
        } else {
            write!(f, "{}: {}", self.path_string(), self.message)
        }
    }
}
