//! Environment-aware rendering of normalized errors.

use std::sync::Arc;

use articles_core::{ClockSource, SystemClock};
use axum::http::{Method, Request, StatusCode};
use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, warn};

use super::model::{HttpError, DEFAULT_INTERNAL_ERROR_MESSAGE};
use crate::config::Environment;

/// What the renderer needs to know about the failed request.
#[derive(Debug, Clone)]
pub struct RequestInfo {
    pub method: Method,
    /// Original path including the query string.
    pub path: String,
    pub request_id: Option<String>,
}

impl RequestInfo {
    /// Captures method, original URI and `x-request-id` before the request
    /// is handed on.
    pub fn from_request<B>(request: &Request<B>) -> Self {
        let uri = request
            .extensions()
            .get::<axum::extract::OriginalUri>()
            .map_or_else(|| request.uri(), |original| &original.0);
        let path = uri
            .path_and_query()
            .map_or_else(|| uri.path().to_string(), ToString::to_string);
        let request_id = request
            .headers()
            .get("x-request-id")
            .and_then(|value| value.to_str().ok())
            .map(ToString::to_string);

        Self {
            method: request.method().clone(),
            path,
            request_id,
        }
    }
}

/// JSON body of every error response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedErrorBody {
    pub message: String,
    pub status_code: u16,
    pub path: String,
    /// RFC 3339, millisecond precision, UTC.
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

/// Decides what a client may see of an error and logs it.
///
/// In production:
/// - the message of a non-operational 5xx is replaced by the default;
/// - details are shown only for operational errors;
/// - the stack is never shown.
///
/// Outside production everything is shown.
pub struct ErrorRenderer {
    environment: Environment,
    clock: Arc<dyn ClockSource>,
}

impl ErrorRenderer {
    #[must_use]
    pub fn new(environment: Environment) -> Self {
        Self {
            environment,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replaces the clock used for response timestamps.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn ClockSource>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn environment(&self) -> Environment {
        self.environment
    }

    /// Renders `error` for `request` and logs it. Server errors log at
    /// `error`, everything else at `warn`.
    #[must_use]
    pub fn render(&self, error: &HttpError, request: &RequestInfo) -> (StatusCode, RenderedErrorBody) {
        self.log(error, request);

        let production = self.environment.is_production();
        let server_error = error.status.as_u16() >= 500;
        let expose_message = !server_error || !production || error.is_operational;
        let expose_details = !production || error.is_operational;

        let body = RenderedErrorBody {
            message: if expose_message {
                error.message.clone()
            } else {
                DEFAULT_INTERNAL_ERROR_MESSAGE.to_string()
            },
            status_code: error.status.as_u16(),
            path: request.path.clone(),
            timestamp: self
                .clock
                .now()
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            details: if expose_details {
                error.details.clone()
            } else {
                None
            },
            stack: if production { None } else { error.stack.clone() },
        };

        (error.status, body)
    }

    fn log(&self, error: &HttpError, request: &RequestInfo) {
        let details = error.details.as_ref().map(ToString::to_string);

        if error.status.as_u16() >= 500 {
            error!(
                status = error.status.as_u16(),
                method = %request.method,
                path = %request.path,
                request_id = request.request_id.as_deref(),
                operational = error.is_operational,
                details = details.as_deref(),
                stack = error.stack.as_deref(),
                "Unhandled error in request: {}",
                error.message
            );
        } else {
            warn!(
                status = error.status.as_u16(),
                method = %request.method,
                path = %request.path,
                request_id = request.request_id.as_deref(),
                details = details.as_deref(),
                "Handled client error: {}",
                error.message
            );
        }
    }
}
