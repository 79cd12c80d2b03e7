//! HTTP middleware stack for the articles server.
//!
//! Builds the Tower middleware pipeline applied to all HTTP requests.
//! Middleware ordering follows the outer-to-inner convention: the first
//! layer listed is the outermost (processes the request first on the way
//! in, and the response last on the way out).

use std::any::Any;
use std::sync::Arc;

use anyhow::anyhow;
use axum::error_handling::HandleErrorLayer;
use axum::http::header::HeaderName;
use axum::http::Method;
use axum::response::{IntoResponse, Response};
use axum::{BoxError, Router};
use tower::timeout::error::Elapsed;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, Any as AnyHeader, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use super::config::NetworkConfig;
use crate::error::{normalize_panic, ApiError, ErrorRenderer, Fault, RenderErrorsLayer};

/// Applies the HTTP-level Tower middleware stack to every route of `router`,
/// including its fallbacks.
///
/// **Middleware ordering (outermost to innermost):**
/// 1. `SetRequestId` -- assigns a UUID v4 `X-Request-Id` to every incoming request
/// 2. `Tracing` -- logs request/response with structured trace spans
/// 3. `Compression` -- gzip response compression
/// 4. `CORS` -- Cross-Origin Resource Sharing based on configured origins
/// 5. `PropagateRequestId` -- copies `X-Request-Id` from the request to the response
/// 6. `RenderErrors` -- renders every failure below it as the JSON error body
/// 7. `HandleError` -- turns timeout and other middleware errors into faults
/// 8. `Timeout` -- bounds the time spent in gates and handlers
/// 9. `CatchPanic` -- converts a panicking handler into a 500 fault
///
/// Route gates sit inside all of these, directly around their handler.
pub fn apply_http_layers<S>(router: Router<S>, config: &NetworkConfig, renderer: Arc<ErrorRenderer>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let x_request_id = HeaderName::from_static("x-request-id");

    let layers = ServiceBuilder::new()
        .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(build_cors_layer(&config.cors_origins))
        .layer(PropagateRequestIdLayer::new(x_request_id))
        .layer(RenderErrorsLayer::new(renderer))
        .layer(HandleErrorLayer::new(handle_middleware_error))
        .timeout(config.request_timeout)
        .layer(CatchPanicLayer::custom(panic_response));

    router.layer(layers)
}

/// Builds the CORS layer from the configured list of allowed origins.
///
/// A wildcard `"*"` in the origins list allows any origin. Otherwise,
/// each origin string is parsed and added to an explicit allowlist.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let parsed: Vec<_> = origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers(AnyHeader)
}

async fn handle_middleware_error(err: BoxError) -> ApiError {
    if err.is::<Elapsed>() {
        Fault::new(anyhow!("Request timed out")).with_status(408).into()
    } else {
        ApiError::fault(anyhow!("Unhandled middleware error: {err}"))
    }
}

fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    normalize_panic(payload).into_response()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::get;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::config::Environment;

    async fn explode() -> &'static str {
        panic!("handler exploded")
    }

    fn app(config: &NetworkConfig) -> Router {
        let router = Router::new()
            .route("/ok", get(|| async { "ok" }))
            .route("/panic", get(explode))
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    "late"
                }),
            );
        let renderer = Arc::new(ErrorRenderer::new(config.environment));
        apply_http_layers(router, config, renderer)
    }

    async fn json_of(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn responses_carry_a_request_id() {
        let response = app(&NetworkConfig::default())
            .oneshot(get_request("/ok"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn panics_become_rendered_500s() {
        let config = NetworkConfig {
            environment: Environment::Production,
            ..NetworkConfig::default()
        };
        let response = app(&config).oneshot(get_request("/panic")).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_of(response).await;
        assert_eq!(body["message"], "Internal server error");
        assert_eq!(body["path"], "/panic");
    }

    #[tokio::test]
    async fn panic_message_is_shown_in_development() {
        let response = app(&NetworkConfig::default())
            .oneshot(get_request("/panic"))
            .await
            .unwrap();
        let body = json_of(response).await;
        assert_eq!(body["message"], "handler exploded");
    }

    #[tokio::test(start_paused = true)]
    async fn slow_handlers_time_out_with_408() {
        let config = NetworkConfig {
            request_timeout: Duration::from_millis(100),
            ..NetworkConfig::default()
        };
        let response = app(&config).oneshot(get_request("/slow")).await.unwrap();
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
        let body = json_of(response).await;
        assert_eq!(body["message"], "Request timed out");
        assert_eq!(body["statusCode"], 408);
    }

    #[test]
    fn build_cors_layer_wildcard() {
        let origins = vec!["*".to_string()];
        let _cors = build_cors_layer(&origins);
    }

    #[test]
    fn build_cors_layer_specific_origins() {
        let origins = vec![
            "http://localhost:3000".to_string(),
            "https://example.com".to_string(),
        ];
        let _cors = build_cors_layer(&origins);
    }
}
