use articles_core::{
    Article, ArticlePatch, ArticlesByDatesQuery, GenerateArticleRequest, GeneratedArticle,
    ListArticlesQuery, NewArticle, Page,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Pluggable persistence backend for articles.
/// Implementations: in-memory (default, tests) and `PostgreSQL`.
///
/// Inputs arrive already validated by the route gates; stores do not
/// re-check them. Infrastructure failures are returned as `anyhow` errors and
/// surface as non-operational 500s.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// One page of articles ordered by creation time, plus the total count.
    async fn list(&self, query: &ListArticlesQuery) -> anyhow::Result<Page<Article>>;

    /// Like [`ArticleStore::list`], restricted to articles created within
    /// `from..=to`.
    async fn list_between(&self, query: &ArticlesByDatesQuery) -> anyhow::Result<Page<Article>>;

    /// Load a single article by id.
    async fn get(&self, id: u64) -> anyhow::Result<Option<Article>>;

    /// Persist a new article and return it with its assigned id and timestamps.
    async fn create(&self, article: NewArticle) -> anyhow::Result<Article>;

    /// Apply a partial update. Returns `None` when no article has `id`.
    async fn update(&self, id: u64, patch: ArticlePatch) -> anyhow::Result<Option<Article>>;

    /// Delete by id. Returns `false` when no article had `id`.
    async fn delete(&self, id: u64) -> anyhow::Result<bool>;

    /// Current time as seen by the backend. Used by the health probe.
    async fn now(&self) -> anyhow::Result<DateTime<Utc>>;
}

/// Produces article drafts from a topic and tone.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Generate a draft. Drafts are returned to the caller, never stored.
    async fn generate(&self, request: GenerateArticleRequest) -> anyhow::Result<GeneratedArticle>;
}
