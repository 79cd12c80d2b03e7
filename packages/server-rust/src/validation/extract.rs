use anyhow::anyhow;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::ApiError;

/// A value that passed an input gate.
///
/// Gates insert it into the request extensions; handlers receive it as an
/// extractor. Extracting a `Valid<T>` on a route that has no gate producing a
/// `T` is a wiring defect and fails as a 500.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Valid<T>(pub T);

impl<T, S> FromRequestParts<S> for Valid<T>
where
    T: Clone + Send + Sync + 'static,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Self>().cloned().ok_or_else(|| {
            ApiError::fault(anyhow!(
                "no validated `{}` on the request; the route is missing its gate",
                std::any::type_name::<T>()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use articles_core::ArticleIdParams;
    use axum::http::Request;

    use super::*;

    #[tokio::test]
    async fn extracts_the_gated_value() {
        let (mut parts, ()) = Request::builder().body(()).unwrap().into_parts();
        parts.extensions.insert(Valid(ArticleIdParams { id: 9 }));
        let Valid(params) = Valid::<ArticleIdParams>::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(params.id, 9);
    }

    #[tokio::test]
    async fn missing_gate_is_a_fault() {
        let (mut parts, ()) = Request::builder().body(()).unwrap().into_parts();
        let result = Valid::<ArticleIdParams>::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(ApiError::Fault(_))));
    }
}
