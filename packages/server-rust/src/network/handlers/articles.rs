//! Article CRUD handlers.
//!
//! Every input arrives through a [`Valid`] extractor, so handlers only deal
//! with parsed values. Each route's gates are attached in `NetworkModule`.

use articles_core::{
    Article, ArticleIdParams, ArticlePatch, ArticlesByDatesQuery, GenerateArticleRequest,
    GeneratedArticle, ListArticlesQuery, NewArticle, Page,
};
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use tracing::info;

use super::AppState;
use crate::error::{ApiError, HttpError};
use crate::validation::Valid;

const RESOURCE: &str = "Article";

/// `GET /api/articles`
pub async fn list_articles(
    State(state): State<AppState>,
    Valid(query): Valid<ListArticlesQuery>,
) -> Result<Json<Page<Article>>, ApiError> {
    Ok(Json(state.store.list(&query).await?))
}

/// `GET /api/articles/search`
pub async fn search_articles(
    State(state): State<AppState>,
    Valid(query): Valid<ArticlesByDatesQuery>,
) -> Result<Json<Page<Article>>, ApiError> {
    Ok(Json(state.store.list_between(&query).await?))
}

/// `GET /api/articles/{id}`
pub async fn get_article(
    State(state): State<AppState>,
    Valid(params): Valid<ArticleIdParams>,
) -> Result<Json<Article>, ApiError> {
    let article = state
        .store
        .get(params.id)
        .await?
        .ok_or_else(|| HttpError::resource_not_found(RESOURCE, params.id))?;
    Ok(Json(article))
}

/// `POST /api/articles`
pub async fn create_article(
    State(state): State<AppState>,
    Valid(article): Valid<NewArticle>,
) -> Result<(StatusCode, Json<Article>), ApiError> {
    let article = state.store.create(article).await?;
    info!(id = article.id, "article created");
    Ok((StatusCode::CREATED, Json(article)))
}

/// `PATCH /api/articles/{id}`
pub async fn update_article(
    State(state): State<AppState>,
    Valid(params): Valid<ArticleIdParams>,
    Valid(patch): Valid<ArticlePatch>,
) -> Result<Json<Article>, ApiError> {
    let article = state
        .store
        .update(params.id, patch)
        .await?
        .ok_or_else(|| HttpError::resource_not_found(RESOURCE, params.id))?;
    Ok(Json(article))
}

/// `DELETE /api/articles/{id}`
pub async fn delete_article(
    State(state): State<AppState>,
    Valid(params): Valid<ArticleIdParams>,
) -> Result<StatusCode, ApiError> {
    if state.store.delete(params.id).await? {
        info!(id = params.id, "article deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(HttpError::resource_not_found(RESOURCE, params.id).into())
    }
}

/// `POST /api/articles/generate`
pub async fn generate_article(
    State(state): State<AppState>,
    Valid(request): Valid<GenerateArticleRequest>,
) -> Result<Json<GeneratedArticle>, ApiError> {
    Ok(Json(state.generator.generate(request).await?))
}
