//! Error model.
//!
//! Two families, deliberately kept apart:
//! - [`SchemaError`] — structural problems in a declaration. Fatal, raised
//!   once at `build()` time, never at cast time.
//! - [`CastError`] — the aggregated report of everything wrong with one
//!   input blob. One [`Issue`] per unresolved or rejected key, each carrying
//!   its full dotted path; sibling failures never mask each other.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Fatal declaration-time error. A schema that produced one of these never
/// becomes a `RecordType`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("duplicate field `{name}` in record `{record}`")]
    DuplicateField { record: String, name: String },

    #[error("unknown type name `{name}` for field `{field}` in record `{record}`")]
    UnknownType {
        record: String,
        field: String,
        name: String,
    },

    #[error("one-of for field `{field}` in record `{record}` has no alternatives")]
    EmptyOneOf { record: String, field: String },

    #[error("path `{path}` does not name a field of record `{record}`")]
    UnknownPath { record: String, path: String },

    #[error("calculated field `{name}` shadows a declared field in record `{record}`")]
    CalculatedShadowsField { record: String, name: String },
}

/// What went wrong for one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// Input key resolved to no schema path, even after split attempts.
    UnknownField,
    /// The field's coercer rejected the raw value.
    Coercion,
    /// The field's validator rejected an already-coerced value.
    Validation,
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueKind::UnknownField => write!(f, "unknown field"),
            IssueKind::Coercion => write!(f, "coercion failed"),
            IssueKind::Validation => write!(f, "validation failed"),
        }
    }
}

/// One path-qualified failure inside a cast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    /// Full dotted path from the root record, e.g. `address.street.house`.
    pub path: String,
    pub kind: IssueKind,
    /// Human-readable reason, typically the type's own message.
    pub reason: String,
}

impl Issue {
    pub fn new(path: impl Into<String>, kind: IssueKind, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.path, self.kind, self.reason)
    }
}

/// Aggregated cast failure: every invalid or unknown key from one `cast`
/// call, in input-encounter order. The caller either gets a complete valid
/// instance or this complete list — never a partial instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CastError {
    pub issues: Vec<Issue>,
}

impl CastError {
    pub fn new(issues: Vec<Issue>) -> Self {
        Self { issues }
    }

    /// All failing paths, one per issue.
    pub fn paths(&self) -> Vec<&str> {
        self.issues.iter().map(|i| i.path.as_str()).collect()
    }

    pub fn contains_path(&self, path: &str) -> bool {
        self.issues.iter().any(|i| i.path == path)
    }
}

impl fmt::Display for CastError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "cast failed with {} issue(s):", self.issues.len())?;
        for issue in &self.issues {
            writeln!(f, "  {issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for CastError {}
