//! Converts any failure into a single [`HttpError`].

use std::any::Any;

use axum::http::StatusCode;
use serde_json::json;

use super::model::{valid_status, ApiError, Fault, HttpError, DEFAULT_INTERNAL_ERROR_MESSAGE};

/// Normalizes a failure.
///
/// - [`ApiError::Http`] passes through unchanged.
/// - [`ApiError::Validation`] becomes a 400 "Validation Error" with the
///   issues as details, operational.
/// - [`ApiError::Fault`] keeps its message (or the default when empty) and
///   its own status when that status is valid, otherwise 500. Faults are
///   never operational; the error chain becomes the stack.
#[must_use]
pub fn normalize(failure: ApiError) -> HttpError {
    match failure {
        ApiError::Http(error) => error,
        ApiError::Validation(issues) => HttpError::validation(&issues),
        ApiError::Fault(fault) => normalize_fault(fault),
    }
}

fn normalize_fault(fault: Fault) -> HttpError {
    let message = fault.error.to_string();
    let message = if message.trim().is_empty() {
        DEFAULT_INTERNAL_ERROR_MESSAGE.to_string()
    } else {
        message
    };
    let status = fault
        .status
        .and_then(valid_status)
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    HttpError {
        message,
        status,
        details: None,
        is_operational: false,
        stack: Some(format!("{:?}", fault.error)),
    }
}

/// Normalizes a panic payload caught while handling a request.
///
/// String payloads become the message of a non-operational 500. Any other
/// payload cannot be described, so the default message is used and the
/// payload is noted under `details.raw`.
#[must_use]
pub fn normalize_panic(payload: Box<dyn Any + Send + 'static>) -> HttpError {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned());

    match message {
        Some(message) => normalize(ApiError::fault(anyhow::anyhow!(message))),
        None => HttpError::new(
            DEFAULT_INTERNAL_ERROR_MESSAGE,
            StatusCode::INTERNAL_SERVER_ERROR,
        )
        .with_details(json!({ "raw": "<non-string panic payload>" }))
        .non_operational(),
    }
}
