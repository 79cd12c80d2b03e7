//! Validation issue model.
//!
//! A single validation pass produces an ordered [`ValidationIssues`]
//! collection. Order follows the order in which the schema evaluated its
//! fields, so clients see every problem at once and in a stable sequence.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// PathSegment
// ---------------------------------------------------------------------------

/// One step in the path from the validated root to the offending value.
///
/// Serializes untagged: field names become JSON strings, array indices
/// become JSON numbers (`["tags", 2]`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    /// Object field name.
    Key(String),
    /// Array index.
    Index(usize),
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        Self::Key(key.to_owned())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        Self::Key(key)
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => f.write_str(key),
            Self::Index(index) => write!(f, "{index}"),
        }
    }
}

// ---------------------------------------------------------------------------
// IssueCode
// ---------------------------------------------------------------------------

/// Machine-readable classification of a validation issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    /// Value is missing or has the wrong JSON type.
    InvalidType,
    /// Number or string is below its lower bound.
    TooSmall,
    /// Number or string is above its upper bound.
    TooBig,
    /// String is not one of the allowed literals.
    InvalidEnumValue,
    /// Value cannot be coerced into an instant.
    InvalidDate,
    /// String does not have the required format.
    InvalidString,
    /// Schema-specific refinement failed.
    Custom,
}

// ---------------------------------------------------------------------------
// ValidationIssue
// ---------------------------------------------------------------------------

/// A single constraint violation found while validating untrusted input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Path from the validated root to the offending value. Empty for the root.
    pub path: Vec<PathSegment>,
    /// Human-readable description of the violation.
    pub message: String,
    /// Machine-readable classification.
    pub code: IssueCode,
}

impl ValidationIssue {
    /// Creates an issue at the given path.
    #[must_use]
    pub fn new(path: Vec<PathSegment>, code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            path,
            message: message.into(),
            code,
        }
    }

    /// Returns the path rendered as `a.b.0`, or `<root>` for the empty path.
    #[must_use]
    pub fn dotted_path(&self) -> String {
        if self.path.is_empty() {
            return "<root>".to_string();
        }
        self.path
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(".")
    }
}

// ---------------------------------------------------------------------------
// ValidationIssues
// ---------------------------------------------------------------------------

/// Ordered collection of every issue found in one validation pass.
///
/// Serializes as a plain JSON array. Implements [`std::error::Error`] so a
/// validation failure can travel through `anyhow` and still be recognized
/// at the error boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(transparent)]
#[error("Validation Error")]
pub struct ValidationIssues(Vec<ValidationIssue>);

impl ValidationIssues {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Creates a collection holding exactly one issue.
    #[must_use]
    pub fn single(issue: ValidationIssue) -> Self {
        Self(vec![issue])
    }

    /// Appends an issue, preserving evaluation order.
    pub fn push(&mut self, issue: ValidationIssue) {
        self.0.push(issue);
    }

    /// Returns `true` when no issue has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of recorded issues.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates the issues in evaluation order.
    pub fn iter(&self) -> std::slice::Iter<'_, ValidationIssue> {
        self.0.iter()
    }

    /// Returns the first issue whose path starts with `field`.
    #[must_use]
    pub fn for_field(&self, field: &str) -> Option<&ValidationIssue> {
        self.0
            .iter()
            .find(|issue| matches!(issue.path.first(), Some(PathSegment::Key(k)) if k == field))
    }

    /// Consumes the collection, returning the issues.
    #[must_use]
    pub fn into_inner(self) -> Vec<ValidationIssue> {
        self.0
    }
}

impl From<Vec<ValidationIssue>> for ValidationIssues {
    fn from(issues: Vec<ValidationIssue>) -> Self {
        Self(issues)
    }
}

impl<'a> IntoIterator for &'a ValidationIssues {
    type Item = &'a ValidationIssue;
    type IntoIter = std::slice::Iter<'a, ValidationIssue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl IntoIterator for ValidationIssues {
    type Item = ValidationIssue;
    type IntoIter = std::vec::IntoIter<ValidationIssue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
