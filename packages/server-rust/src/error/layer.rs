//! Tower layer that turns error responses into rendered JSON bodies.
//!
//! Anything that fails inside the stack produces a response carrying an
//! [`HttpError`] extension (see its `IntoResponse` impl). This layer sits
//! outside the gates, handlers and panic catcher, picks that extension up and
//! replaces the response with the body built by [`ErrorRenderer`].

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::Request;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tower::{Layer, Service};

use super::model::HttpError;
use super::render::{ErrorRenderer, RequestInfo};

/// Wraps services with [`RenderErrors`].
#[derive(Clone)]
pub struct RenderErrorsLayer {
    renderer: Arc<ErrorRenderer>,
}

impl RenderErrorsLayer {
    #[must_use]
    pub fn new(renderer: Arc<ErrorRenderer>) -> Self {
        Self { renderer }
    }
}

impl<S> Layer<S> for RenderErrorsLayer {
    type Service = RenderErrors<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RenderErrors {
            inner,
            renderer: Arc::clone(&self.renderer),
        }
    }
}

/// Service produced by [`RenderErrorsLayer`].
#[derive(Clone)]
pub struct RenderErrors<S> {
    inner: S,
    renderer: Arc<ErrorRenderer>,
}

impl<S, B> Service<Request<B>> for RenderErrors<S>
where
    S: Service<Request<B>, Response = Response> + Send,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<B>) -> Self::Future {
        let info = RequestInfo::from_request(&request);
        let renderer = Arc::clone(&self.renderer);
        let fut = self.inner.call(request);

        Box::pin(async move {
            let mut response = fut.await?;
            let Some(error) = response.extensions_mut().remove::<HttpError>() else {
                return Ok(response);
            };

            let (status, body) = renderer.render(&error, &info);
            let mut rendered = (status, Json(body)).into_response();

            // Keep headers set further in, such as `allow` on a 405.
            for (name, value) in response.headers() {
                if name != CONTENT_TYPE && name != CONTENT_LENGTH {
                    rendered.headers_mut().append(name.clone(), value.clone());
                }
            }
            Ok(rendered)
        })
    }
}
