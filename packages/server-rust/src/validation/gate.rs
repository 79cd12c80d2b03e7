//! Input gates: per-route tower layers that validate one request part.
//!
//! A gate reads its part of the request as an untyped JSON value, runs it
//! through a [`Schema`], and either
//! - stores the parsed value as a [`Valid`] extension (and, for bodies,
//!   replaces the body with the serialized parsed value), then calls the
//!   handler; or
//! - answers with the validation failure without calling the handler.
//!
//! Gates compose: `handler.layer(body_gate).layer(params_gate)` runs the
//! params gate first, since the outermost layer sees the request first.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use anyhow::anyhow;
use articles_core::{IssueCode, Schema, ValidationIssue, ValidationIssues};
use axum::body::Body;
use axum::extract::rejection::RawPathParamsRejection;
use axum::extract::{FromRequestParts, MatchedPath, Query, RawPathParams};
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue, Request};
use axum::response::{IntoResponse, Response};
use serde_json::{Map, Value};
use tower::{Layer, Service};
use url::form_urlencoded;

use super::extract::Valid;
use crate::error::{ApiError, Fault, HttpError};

/// Default upper bound for request bodies, in bytes.
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// The request part a gate validates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestPart {
    /// The JSON body. An empty body reads as `{}`.
    Body,
    /// The query string. Repeated keys read as arrays.
    Query,
    /// The path parameters of the matched route.
    Params,
}

impl RequestPart {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Body => "body",
            Self::Query => "query",
            Self::Params => "params",
        }
    }
}

// ---------------------------------------------------------------------------
// GateLayer
// ---------------------------------------------------------------------------

/// Layer validating one request part against a schema.
pub struct GateLayer<S> {
    schema: Arc<S>,
    part: RequestPart,
    body_limit: usize,
}

impl<S> Clone for GateLayer<S> {
    fn clone(&self) -> Self {
        Self {
            schema: Arc::clone(&self.schema),
            part: self.part,
            body_limit: self.body_limit,
        }
    }
}

impl<S: Schema> GateLayer<S> {
    #[must_use]
    pub fn new(schema: S, part: RequestPart) -> Self {
        Self {
            schema: Arc::new(schema),
            part,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    #[must_use]
    pub fn body(schema: S) -> Self {
        Self::new(schema, RequestPart::Body)
    }

    #[must_use]
    pub fn query(schema: S) -> Self {
        Self::new(schema, RequestPart::Query)
    }

    #[must_use]
    pub fn params(schema: S) -> Self {
        Self::new(schema, RequestPart::Params)
    }

    /// Sets the maximum accepted body size. Only body gates read it.
    #[must_use]
    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }
}

impl<S, I> Layer<I> for GateLayer<S> {
    type Service = Gate<S, I>;

    fn layer(&self, inner: I) -> Self::Service {
        Gate {
            inner,
            schema: Arc::clone(&self.schema),
            part: self.part,
            body_limit: self.body_limit,
        }
    }
}

// ---------------------------------------------------------------------------
// Gate service
// ---------------------------------------------------------------------------

/// Service produced by [`GateLayer`].
pub struct Gate<S, I> {
    inner: I,
    schema: Arc<S>,
    part: RequestPart,
    body_limit: usize,
}

impl<S, I: Clone> Clone for Gate<S, I> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            schema: Arc::clone(&self.schema),
            part: self.part,
            body_limit: self.body_limit,
        }
    }
}

impl<S, I> Service<Request<Body>> for Gate<S, I>
where
    S: Schema,
    I: Service<Request<Body>, Error = Infallible> + Clone + Send + 'static,
    I::Response: IntoResponse,
    I::Future: Send + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Response, Infallible>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        // Take the service that was driven to readiness; leave a clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let schema = Arc::clone(&self.schema);
        let part = self.part;
        let body_limit = self.body_limit;

        Box::pin(async move {
            match admit(schema.as_ref(), part, body_limit, request).await {
                Ok(admitted) => match inner.call(admitted).await {
                    Ok(response) => Ok(response.into_response()),
                    Err(never) => match never {},
                },
                Err(rejection) => Ok(rejection.into_response()),
            }
        })
    }
}

/// Validates one part of `request` and returns the request to forward.
///
/// # Errors
///
/// - [`ApiError::Validation`] when the schema rejects the part, or when a
///   path parameter does not decode as UTF-8.
/// - An operational 413 when a declared body length exceeds the limit.
/// - A 400 fault for a body that is not JSON or a query string that cannot
///   be decoded.
pub async fn admit<S: Schema>(
    schema: &S,
    part: RequestPart,
    body_limit: usize,
    request: Request<Body>,
) -> Result<Request<Body>, ApiError> {
    let (mut parts, body) = request.into_parts();

    let (raw, body) = match part {
        RequestPart::Query => (read_query(&parts)?, body),
        RequestPart::Params => (read_params(&mut parts).await?, body),
        RequestPart::Body => (read_json_body(&parts.headers, body, body_limit).await?, Body::empty()),
    };

    let parsed = schema.validate(&raw).map_err(|issues| {
        tracing::debug!(part = part.as_str(), issues = issues.len(), "request rejected by gate");
        ApiError::Validation(issues)
    })?;

    let body = if part == RequestPart::Body {
        let bytes = serde_json::to_vec(&parsed)
            .map_err(|err| ApiError::fault(anyhow!("failed to re-encode validated body: {err}")))?;
        parts.headers.remove(CONTENT_LENGTH);
        parts
            .headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Body::from(bytes)
    } else {
        body
    };

    parts.extensions.insert(Valid(parsed));
    Ok(Request::from_parts(parts, body))
}

fn read_query(parts: &Parts) -> Result<Value, ApiError> {
    let Query(pairs) = Query::<Vec<(String, String)>>::try_from_uri(&parts.uri).map_err(|rejection| {
        Fault::new(anyhow!(rejection.body_text())).with_status(rejection.status().as_u16())
    })?;
    Ok(pairs_to_object(pairs))
}

/// Folds decoded query pairs into an object; a key seen twice becomes an
/// array of its values in order of appearance.
fn pairs_to_object(pairs: Vec<(String, String)>) -> Value {
    let mut object = Map::new();
    for (key, value) in pairs {
        match object.get_mut(&key) {
            None => {
                object.insert(key, Value::String(value));
            }
            Some(Value::Array(values)) => values.push(Value::String(value)),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, Value::String(value)]);
            }
        }
    }
    Value::Object(object)
}

async fn read_params(parts: &mut Parts) -> Result<Value, ApiError> {
    let params = match RawPathParams::from_request_parts(parts, &()).await {
        Ok(params) => params,
        Err(RawPathParamsRejection::InvalidUtf8InPathParam(_)) => {
            return Err(undecodable_params(parts).into());
        }
        Err(rejection) => {
            return Err(Fault::new(anyhow!(rejection.body_text()))
                .with_status(rejection.status().as_u16())
                .into());
        }
    };
    Ok(Value::Object(
        params
            .iter()
            .map(|(key, value)| (key.to_string(), Value::String(value.to_string())))
            .collect(),
    ))
}

/// Names the path parameters whose percent-decoded bytes are not UTF-8.
///
/// Parameters are located by pairing the matched route template with the
/// raw path segment by segment.
fn undecodable_params(parts: &Parts) -> ValidationIssues {
    let template = parts
        .extensions
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_default();

    let params: Vec<(&str, &str)> = template
        .split('/')
        .zip(parts.uri.path().split('/'))
        .filter_map(|(pattern, raw)| {
            let name = pattern.strip_prefix('{')?.strip_suffix('}')?;
            Some((name.trim_start_matches('*'), raw))
        })
        .collect();

    let mut issues = ValidationIssues::new();
    let mut flag = |name: &str| {
        issues.push(ValidationIssue::new(
            vec![name.into()],
            IssueCode::InvalidString,
            "Invalid UTF-8 in path parameter",
        ));
    };
    let undecodable: Vec<&str> = params
        .iter()
        .filter(|(_, raw)| decodes_lossily(raw))
        .map(|(name, _)| *name)
        .collect();
    if undecodable.is_empty() {
        params.iter().for_each(|(name, _)| flag(name));
    } else {
        undecodable.into_iter().for_each(flag);
    }
    issues
}

/// True when percent-decoding `raw` needed replacement characters.
fn decodes_lossily(raw: &str) -> bool {
    !raw.contains(char::REPLACEMENT_CHARACTER)
        && form_urlencoded::parse(raw.as_bytes()).any(|(key, value)| {
            key.contains(char::REPLACEMENT_CHARACTER) || value.contains(char::REPLACEMENT_CHARACTER)
        })
}

async fn read_json_body(headers: &HeaderMap, body: Body, limit: usize) -> Result<Value, ApiError> {
    let declared = headers
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<usize>().ok());
    if declared.is_some_and(|length| length > limit) {
        return Err(HttpError::payload_too_large(limit).into());
    }

    let bytes = axum::body::to_bytes(body, limit).await.map_err(|err| {
        Fault::new(anyhow!("Failed to read request body: {err}")).with_status(400)
    })?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_slice(&bytes).map_err(|err| {
        Fault::new(anyhow!("Malformed JSON body: {err}"))
            .with_status(400)
            .into()
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use articles_core::{
        ArticleIdParams, ArticleIdParamsSchema, CreateArticleSchema, ListArticlesQuery,
        ListArticlesQuerySchema, NewArticle, SortDirection,
    };
    use axum::handler::Handler;
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::Router;
    use serde_json::json;
    use tower::ServiceExt;

    use super::*;

    #[test]
    fn repeated_query_keys_become_arrays() {
        let pairs = vec![
            ("tag".to_string(), "a".to_string()),
            ("page".to_string(), "2".to_string()),
            ("tag".to_string(), "b".to_string()),
            ("tag".to_string(), "c".to_string()),
        ];
        assert_eq!(
            pairs_to_object(pairs),
            json!({ "tag": ["a", "b", "c"], "page": "2" })
        );
    }

    #[tokio::test]
    async fn query_gate_stores_parsed_value() {
        let request = Request::builder()
            .uri("/articles?page=3&sortDirection=asc&pageSize=banana")
            .body(Body::empty())
            .unwrap();
        let admitted = admit(&ListArticlesQuerySchema, RequestPart::Query, DEFAULT_BODY_LIMIT, request)
            .await
            .unwrap();
        let Valid(query) = admitted
            .extensions()
            .get::<Valid<ListArticlesQuery>>()
            .cloned()
            .unwrap();
        assert_eq!(query.page, 3);
        assert_eq!(query.page_size, 10);
        assert_eq!(query.sort_direction, SortDirection::Asc);
    }

    #[tokio::test]
    async fn body_gate_replaces_body_with_parsed_value() {
        let request = Request::builder()
            .method("POST")
            .uri("/")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"title":"T","content":"C","extra":true}"#))
            .unwrap();
        let admitted = admit(&CreateArticleSchema, RequestPart::Body, DEFAULT_BODY_LIMIT, request)
            .await
            .unwrap();
        assert!(admitted.extensions().get::<Valid<NewArticle>>().is_some());

        let bytes = axum::body::to_bytes(admitted.into_body(), usize::MAX)
            .await
            .unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value, json!({ "title": "T", "content": "C", "photoUrl": null }));
    }

    #[tokio::test]
    async fn empty_body_reads_as_empty_object() {
        let request = Request::builder().method("POST").uri("/").body(Body::empty()).unwrap();
        let Err(ApiError::Validation(issues)) =
            admit(&CreateArticleSchema, RequestPart::Body, DEFAULT_BODY_LIMIT, request).await
        else {
            panic!("expected validation failure");
        };
        assert!(issues.for_field("title").is_some());
        assert!(issues.for_field("content").is_some());
    }

    #[tokio::test]
    async fn malformed_json_is_a_400_fault() {
        let request = Request::builder()
            .method("POST")
            .uri("/")
            .body(Body::from("{not json"))
            .unwrap();
        let Err(ApiError::Fault(fault)) =
            admit(&CreateArticleSchema, RequestPart::Body, DEFAULT_BODY_LIMIT, request).await
        else {
            panic!("expected fault");
        };
        assert_eq!(fault.status, Some(400));
    }

    #[tokio::test]
    async fn oversized_declared_body_is_rejected_before_reading() {
        let request = Request::builder()
            .method("POST")
            .uri("/")
            .header(CONTENT_LENGTH, "2048")
            .body(Body::from(vec![b' '; 2048]))
            .unwrap();
        let Err(ApiError::Http(error)) = admit(&CreateArticleSchema, RequestPart::Body, 1024, request).await
        else {
            panic!("expected 413");
        };
        assert_eq!(error.status, StatusCode::PAYLOAD_TOO_LARGE);
        assert!(error.is_operational);
    }

    #[tokio::test]
    async fn rejected_requests_never_reach_the_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let handler = move |Valid(params): Valid<ArticleIdParams>| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                params.id.to_string()
            }
        };
        let app: Router = Router::new().route(
            "/articles/{id}",
            get(handler.layer(GateLayer::params(ArticleIdParamsSchema))),
        );

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/articles/abc").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let response = app
            .oneshot(Request::builder().uri("/articles/42").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    struct AnyParams;

    impl Schema for AnyParams {
        type Output = Value;

        fn validate(&self, raw: &Value) -> Result<Value, ValidationIssues> {
            Ok(raw.clone())
        }
    }

    #[tokio::test]
    async fn undecodable_param_is_a_validation_issue_for_that_param() {
        let handler = |Valid(params): Valid<Value>| async move { params.to_string() };
        let app: Router = Router::new().route(
            "/users/{user}/posts/{post}",
            get(handler.layer(GateLayer::params(AnyParams))),
        );

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/users/ada%20l/posts/%C3%28")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error = response.extensions().get::<HttpError>().unwrap();
        assert_eq!(error.message, "Validation Error");
        assert!(error.is_operational);
        let details = error.details.clone().unwrap();
        assert_eq!(details.as_array().unwrap().len(), 1);
        assert_eq!(details[0]["path"], json!(["post"]));
        assert_eq!(details[0]["code"], "invalid_string");
    }

    #[tokio::test]
    async fn chained_gates_run_outermost_first() {
        let handler = |Valid(params): Valid<ArticleIdParams>, Valid(body): Valid<NewArticle>| async move {
            format!("{}:{}", params.id, body.title)
        };
        let app: Router = Router::new().route(
            "/articles/{id}",
            post(
                handler
                    .layer(GateLayer::body(CreateArticleSchema))
                    .layer(GateLayer::params(ArticleIdParamsSchema)),
            ),
        );

        // Both the id and the body are invalid; the params gate answers.
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/articles/0")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        let error = response.extensions().get::<HttpError>().unwrap();
        let details = error.details.clone().unwrap();
        assert_eq!(details[0]["path"], json!(["id"]));

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/articles/7")
                    .body(Body::from(r#"{"title":"Hi","content":"there"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"7:Hi");
    }
}
