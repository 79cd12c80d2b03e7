//! Handlers for requests that match no route.

use axum::extract::OriginalUri;
use axum::http::{Method, Uri};

use crate::error::{ApiError, HttpError};

fn original_path(uri: &Uri) -> String {
    uri.path_and_query()
        .map_or_else(|| uri.path().to_string(), ToString::to_string)
}

/// Fallback for unknown paths: 404 "Resource not found" naming the method
/// and the original path.
pub async fn not_found_handler(method: Method, OriginalUri(uri): OriginalUri) -> ApiError {
    HttpError::not_found(&method, &original_path(&uri)).into()
}

/// Fallback for known paths requested with an unsupported method.
pub async fn method_not_allowed_handler(method: Method, OriginalUri(uri): OriginalUri) -> ApiError {
    HttpError::method_not_allowed(&method, &original_path(&uri)).into()
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn not_found_keeps_the_query_string() {
        let uri: Uri = "/api/nope?x=1".parse().unwrap();
        let response = not_found_handler(Method::PUT, OriginalUri(uri))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let error = response.extensions().get::<HttpError>().unwrap();
        assert_eq!(error.message, "Resource not found");
        assert!(error.is_operational);
        assert_eq!(
            error.details,
            Some(json!({ "method": "PUT", "path": "/api/nope?x=1" }))
        );
    }

    #[tokio::test]
    async fn method_not_allowed_is_operational_405() {
        let uri: Uri = "/api/articles".parse().unwrap();
        let response = method_not_allowed_handler(Method::PUT, OriginalUri(uri))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert!(response.extensions().get::<HttpError>().unwrap().is_operational);
    }
}
