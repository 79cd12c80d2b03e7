//! Health and greeting endpoint handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use tracing::error;

use super::AppState;

/// Reports whether the article store answers.
///
/// Returns 200 with the store's clock, or 500 with a fixed message. The
/// failure body bypasses the error renderer; probes match on `status`.
pub async fn health_handler(State(state): State<AppState>) -> Response {
    match state.store.now().await {
        Ok(db_time) => Json(json!({ "status": "ok", "dbTime": db_time })).into_response(),
        Err(err) => {
            error!(error = %format!("{err:#}"), "Store health check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "status": "error", "message": "Database connection failed" })),
            )
                .into_response()
        }
    }
}

/// Fixed greeting, useful as a smoke test.
pub async fn hello_handler() -> Json<Value> {
    Json(json!({ "message": "Hello from the articles backend" }))
}
