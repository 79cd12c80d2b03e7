//! The schema capability and the object-reading toolkit schemas are built with.
//!
//! A [`Schema`] is an opaque validator: it turns an untyped JSON value into a
//! typed output or an ordered list of every issue found. Gates and the error
//! pipeline only ever see this trait, so any validation engine that satisfies
//! it is substitutable.
//!
//! [`ObjectReader`] implements the field policies the article schemas need:
//!
//! | mode        | absent             | null            | invalid            |
//! |-------------|--------------------|-----------------|--------------------|
//! | `required`  | issue "Required"   | rule decides    | issue              |
//! | `optional`  | `None`             | rule decides    | issue              |
//! | `nullish`   | `None`             | `Some(None)`    | issue              |
//! | `catch`     | fallback           | rule or fallback| fallback, no issue |

use serde::Serialize;
use serde_json::{Map, Value};

use crate::issue::{IssueCode, PathSegment, ValidationIssue, ValidationIssues};
use crate::rules::{type_name, Violation};

/// Validates untrusted JSON into a typed value.
///
/// Implementations must be deterministic for a given input (apart from an
/// injected clock) and must collect every issue rather than stopping at the
/// first. `Output` serializes back into JSON that validates to itself.
pub trait Schema: Send + Sync + 'static {
    /// The parsed, coerced value handed to downstream code.
    type Output: Clone + Serialize + Send + Sync + 'static;

    /// Validates `raw`, returning the parsed value or every issue found.
    ///
    /// # Errors
    ///
    /// Returns the ordered [`ValidationIssues`] when any field is invalid.
    fn validate(&self, raw: &Value) -> Result<Self::Output, ValidationIssues>;
}

/// Reads fields of one JSON object, recording issues in evaluation order.
pub struct ObjectReader<'a> {
    fields: &'a Map<String, Value>,
    issues: ValidationIssues,
}

impl<'a> ObjectReader<'a> {
    /// Starts reading `raw`, which must be a JSON object.
    ///
    /// # Errors
    ///
    /// Returns a single root-level `invalid_type` issue for any non-object.
    pub fn new(raw: &'a Value) -> Result<Self, ValidationIssues> {
        match raw {
            Value::Object(fields) => Ok(Self {
                fields,
                issues: ValidationIssues::new(),
            }),
            other => Err(ValidationIssues::single(ValidationIssue::new(
                Vec::new(),
                IssueCode::InvalidType,
                format!("Expected object, received {}", type_name(other)),
            ))),
        }
    }

    /// Reads a field that must be present and valid.
    pub fn required<T>(
        &mut self,
        field: &str,
        rule: impl FnOnce(&Value) -> Result<T, Violation>,
    ) -> Option<T> {
        let Some(value) = self.fields.get(field) else {
            self.record(field, Violation::new(IssueCode::InvalidType, "Required"));
            return None;
        };
        self.apply(field, value, rule)
    }

    /// Reads a field that may be absent; when present it must be valid.
    pub fn optional<T>(
        &mut self,
        field: &str,
        rule: impl FnOnce(&Value) -> Result<T, Violation>,
    ) -> Option<T> {
        let value = self.fields.get(field)?;
        self.apply(field, value, rule)
    }

    /// Reads a field that may be absent or explicitly `null`.
    ///
    /// Returns `None` when absent, `Some(None)` for `null`, and
    /// `Some(Some(v))` for a valid value. Invalid values record an issue and
    /// read as absent.
    #[allow(clippy::option_option)]
    pub fn nullish<T>(
        &mut self,
        field: &str,
        rule: impl FnOnce(&Value) -> Result<T, Violation>,
    ) -> Option<Option<T>> {
        match self.fields.get(field)? {
            Value::Null => Some(None),
            value => self.apply(field, value, rule).map(Some),
        }
    }

    /// Reads a field, silently substituting `fallback` when the field is
    /// absent or fails `rule`. Never records an issue.
    pub fn catch<T>(
        &mut self,
        field: &str,
        fallback: impl FnOnce() -> T,
        rule: impl FnOnce(&Value) -> Result<T, Violation>,
    ) -> T {
        match self.fields.get(field).map(rule) {
            Some(Ok(value)) => value,
            Some(Err(violation)) => {
                tracing::debug!(
                    field,
                    reason = %violation.message,
                    "substituting fallback for invalid field"
                );
                fallback()
            }
            None => fallback(),
        }
    }

    /// Returns `true` when no issue has been recorded so far.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Finishes the pass: all recorded issues, or the built output.
    ///
    /// `build` may rely on every `required` read having produced a value,
    /// since it only runs when no issue was recorded.
    ///
    /// # Errors
    ///
    /// Returns the collected issues when any field failed.
    pub fn finish<T>(self, build: impl FnOnce() -> Option<T>) -> Result<T, ValidationIssues> {
        if !self.issues.is_empty() {
            return Err(self.issues);
        }
        build().ok_or_else(|| {
            ValidationIssues::single(ValidationIssue::new(
                Vec::new(),
                IssueCode::Custom,
                "Incomplete object",
            ))
        })
    }

    fn apply<T>(
        &mut self,
        field: &str,
        value: &Value,
        rule: impl FnOnce(&Value) -> Result<T, Violation>,
    ) -> Option<T> {
        match rule(value) {
            Ok(parsed) => Some(parsed),
            Err(violation) => {
                self.record(field, violation);
                None
            }
        }
    }

    fn record(&mut self, field: &str, violation: Violation) {
        self.issues.push(ValidationIssue::new(
            vec![PathSegment::from(field)],
            violation.code,
            violation.message,
        ));
    }
}
