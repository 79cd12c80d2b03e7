//! Failure types carried through the request lifecycle.
//!
//! [`ApiError`] is the closed set of things a gate or handler can fail with.
//! [`HttpError`] is the normalized shape every failure is turned into before
//! it is rendered.

use std::fmt;

use articles_core::ValidationIssues;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::{json, Value};

/// Message substituted for undisclosed server faults and empty fault messages.
pub const DEFAULT_INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Returns `code` as a status when it lies in `100..=599`.
#[must_use]
pub fn valid_status(code: u16) -> Option<StatusCode> {
    if (100..=599).contains(&code) {
        StatusCode::from_u16(code).ok()
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// HttpError
// ---------------------------------------------------------------------------

/// A failure that is ready to become an HTTP response.
///
/// `is_operational` marks an expected, caller-caused condition that is safe
/// to describe to the client. It, and not the status code, governs what the
/// renderer discloses.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct HttpError {
    pub message: String,
    pub status: StatusCode,
    pub details: Option<Value>,
    pub is_operational: bool,
    pub stack: Option<String>,
}

impl HttpError {
    /// Creates an operational error. This is how business logic signals a
    /// known failure mode (conflict, forbidden, ...) with a chosen status.
    #[must_use]
    pub fn new(message: impl Into<String>, status: StatusCode) -> Self {
        Self {
            message: message.into(),
            status,
            details: None,
            is_operational: true,
            stack: None,
        }
    }

    /// Like [`HttpError::new`], but from a raw code. Codes outside
    /// `100..=599` become 500.
    #[must_use]
    pub fn from_code(message: impl Into<String>, code: u16) -> Self {
        Self::new(
            message,
            valid_status(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        )
    }

    /// Attaches structured details.
    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Marks the error as an unexpected fault.
    #[must_use]
    pub fn non_operational(mut self) -> Self {
        self.is_operational = false;
        self
    }

    /// Attaches diagnostic context, disclosed only outside production.
    #[must_use]
    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// 400 "Validation Error" carrying every issue as details.
    #[must_use]
    pub fn validation(issues: &ValidationIssues) -> Self {
        Self::new("Validation Error", StatusCode::BAD_REQUEST)
            .with_details(serde_json::to_value(issues).unwrap_or_default())
    }

    /// 404 for a request that matched no route.
    #[must_use]
    pub fn not_found(method: &Method, path: &str) -> Self {
        Self::new("Resource not found", StatusCode::NOT_FOUND)
            .with_details(json!({ "method": method.as_str(), "path": path }))
    }

    /// 404 for a well-formed identifier with no stored resource.
    #[must_use]
    pub fn resource_not_found(kind: &str, id: u64) -> Self {
        Self::new(format!("{kind} not found"), StatusCode::NOT_FOUND)
            .with_details(json!({ "id": id }))
    }

    /// 405 for a known path requested with an unsupported method.
    #[must_use]
    pub fn method_not_allowed(method: &Method, path: &str) -> Self {
        Self::new("Method not allowed", StatusCode::METHOD_NOT_ALLOWED)
            .with_details(json!({ "method": method.as_str(), "path": path }))
    }

    /// 413 for a body whose declared length exceeds `limit` bytes.
    #[must_use]
    pub fn payload_too_large(limit: usize) -> Self {
        Self::new("Payload too large", StatusCode::PAYLOAD_TOO_LARGE)
            .with_details(json!({ "limitBytes": limit }))
    }
}

/// Produces a bare status response carrying the error as an extension.
/// `RenderErrorsLayer` replaces it with the rendered JSON body.
impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let mut response = self.status.into_response();
        response.extensions_mut().insert(self);
        response
    }
}

// ---------------------------------------------------------------------------
// Fault
// ---------------------------------------------------------------------------

/// An unexpected failure: infrastructure errors, programming defects, and
/// anything else nobody declared as operational.
pub struct Fault {
    pub(crate) error: anyhow::Error,
    pub(crate) status: Option<u16>,
}

impl Fault {
    #[must_use]
    pub fn new(error: impl Into<anyhow::Error>) -> Self {
        Self {
            error: error.into(),
            status: None,
        }
    }

    /// Status the fault exposes itself (e.g. 400 for an unparsable body).
    /// Ignored unless it lies in `100..=599`.
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn error(&self) -> &anyhow::Error {
        &self.error
    }
}

impl fmt::Debug for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fault")
            .field("error", &format_args!("{:#}", self.error))
            .field("status", &self.status)
            .finish()
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

// ---------------------------------------------------------------------------
// ApiError
// ---------------------------------------------------------------------------

/// Every way a request can fail before a successful response is written.
///
/// Handlers return `Result<_, ApiError>` and may use `?` on
/// `anyhow::Result`, [`HttpError`] and [`ValidationIssues`].
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Caller-supplied data failed a schema.
    #[error("Validation Error")]
    Validation(ValidationIssues),
    /// Explicit error raised by business logic, or an already-normalized one.
    #[error(transparent)]
    Http(HttpError),
    /// Anything else.
    #[error("{0}")]
    Fault(Fault),
}

impl ApiError {
    /// Wraps an arbitrary error as an unexpected fault, skipping the chain
    /// inspection `From<anyhow::Error>` performs.
    #[must_use]
    pub fn fault(error: impl Into<anyhow::Error>) -> Self {
        Self::Fault(Fault::new(error))
    }
}

impl From<ValidationIssues> for ApiError {
    fn from(issues: ValidationIssues) -> Self {
        Self::Validation(issues)
    }
}

impl From<HttpError> for ApiError {
    fn from(error: HttpError) -> Self {
        Self::Http(error)
    }
}

impl From<Fault> for ApiError {
    fn from(fault: Fault) -> Self {
        Self::Fault(fault)
    }
}

/// Recognizes failures that were wrapped on their way up: an [`HttpError`]
/// or [`ValidationIssues`] anywhere in the chain keeps its classification.
/// Any other error is an unexpected fault.
impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        if let Some(http) = error
            .chain()
            .find_map(|cause| cause.downcast_ref::<HttpError>())
        {
            return Self::Http(http.clone());
        }
        if let Some(issues) = error
            .chain()
            .find_map(|cause| cause.downcast_ref::<ValidationIssues>())
        {
            return Self::Validation(issues.clone());
        }
        Self::Fault(Fault::new(error))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        super::normalize(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Context;
    use articles_core::{IssueCode, ValidationIssue};

    use super::*;

    fn issues() -> ValidationIssues {
        ValidationIssues::single(ValidationIssue::new(
            vec!["id".into()],
            IssueCode::InvalidType,
            "Expected number, received nan",
        ))
    }

    #[test]
    fn from_code_defaults_invalid_codes_to_500() {
        assert_eq!(HttpError::from_code("x", 42).status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(HttpError::from_code("x", 600).status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(HttpError::from_code("x", 409).status, StatusCode::CONFLICT);
    }

    #[test]
    fn new_errors_are_operational() {
        let err = HttpError::new("forbidden", StatusCode::FORBIDDEN);
        assert!(err.is_operational);
        assert!(!err.clone().non_operational().is_operational);
    }

    #[test]
    fn validation_error_carries_issues_as_details() {
        let err = HttpError::validation(&issues());
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Validation Error");
        assert_eq!(err.details.unwrap()[0]["path"], json!(["id"]));
    }

    #[test]
    fn not_found_details_name_method_and_path() {
        let err = HttpError::not_found(&Method::GET, "/nope?x=1");
        assert_eq!(err.details, Some(json!({ "method": "GET", "path": "/nope?x=1" })));
    }

    #[test]
    fn anyhow_chain_keeps_http_error() {
        let wrapped = anyhow::Error::new(HttpError::new("conflict", StatusCode::CONFLICT))
            .context("while saving");
        let ApiError::Http(err) = ApiError::from(wrapped) else {
            panic!("expected Http variant");
        };
        assert_eq!(err.status, StatusCode::CONFLICT);
    }

    #[test]
    fn anyhow_chain_keeps_validation_issues() {
        let result: anyhow::Result<()> = Err(issues()).context("parsing input");
        assert!(matches!(
            ApiError::from(result.unwrap_err()),
            ApiError::Validation(_)
        ));
    }

    #[test]
    fn other_anyhow_errors_become_faults() {
        let err = ApiError::from(anyhow::anyhow!("connection refused"));
        assert!(matches!(err, ApiError::Fault(_)));
        assert_eq!(err.to_string(), "connection refused");
    }

    #[test]
    fn into_response_attaches_error_extension() {
        let response = HttpError::new("gone", StatusCode::GONE).into_response();
        assert_eq!(response.status(), StatusCode::GONE);
        let attached = response.extensions().get::<HttpError>().unwrap();
        assert_eq!(attached.message, "gone");
    }
}
