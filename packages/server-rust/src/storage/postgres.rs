//! `PostgreSQL` article store (feature `postgres`).

use articles_core::{
    Article, ArticlePatch, ArticlesByDatesQuery, ListArticlesQuery, NewArticle, Page,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::traits::ArticleStore;

const MAX_CONNECTIONS: u32 = 10;

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS articles (
    id          BIGSERIAL PRIMARY KEY,
    title       TEXT NOT NULL,
    content     TEXT NOT NULL,
    photo_url   TEXT,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
)";

const COLUMNS: &str = "id, title, content, photo_url, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct ArticleRow {
    id: i64,
    title: String,
    content: String,
    photo_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ArticleRow> for Article {
    type Error = anyhow::Error;

    fn try_from(row: ArticleRow) -> anyhow::Result<Self> {
        Ok(Self {
            id: u64::try_from(row.id)?,
            title: row.title,
            content: row.content,
            photo_url: row.photo_url,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Stores articles in a single `articles` table.
pub struct PostgresArticleStore {
    pool: PgPool,
}

impl PostgresArticleStore {
    /// Connects to `database_url` and creates the table when missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or the DDL statement fails.
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect(database_url)
            .await?;
        let store = Self { pool };
        store.initialize().await?;
        Ok(store)
    }

    async fn initialize(&self) -> anyhow::Result<()> {
        sqlx::query(CREATE_TABLE).execute(&self.pool).await?;
        Ok(())
    }

    async fn page(
        &self,
        list: &ListArticlesQuery,
        range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> anyhow::Result<Page<Article>> {
        let filter = if range.is_some() {
            "WHERE created_at BETWEEN $1 AND $2"
        } else {
            ""
        };
        let direction = list.sort_direction.as_sql();
        let (limit_param, offset_param) = if range.is_some() { (3, 4) } else { (1, 2) };

        let select = format!(
            "SELECT {COLUMNS} FROM articles {filter} \
             ORDER BY created_at {direction}, id {direction} \
             LIMIT ${limit_param} OFFSET ${offset_param}"
        );
        let count = format!("SELECT COUNT(*) FROM articles {filter}");

        let limit = i64::try_from(list.page_size).unwrap_or(i64::MAX);
        let offset = i64::try_from(Page::<Article>::offset(list.page, list.page_size))
            .unwrap_or(i64::MAX);

        let mut rows = sqlx::query_as::<_, ArticleRow>(&select);
        let mut total = sqlx::query_scalar::<_, i64>(&count);
        if let Some((from, to)) = range {
            rows = rows.bind(from).bind(to);
            total = total.bind(from).bind(to);
        }

        let rows = rows.bind(limit).bind(offset).fetch_all(&self.pool).await?;
        let total = total.fetch_one(&self.pool).await?;

        Ok(Page {
            items: rows
                .into_iter()
                .map(Article::try_from)
                .collect::<anyhow::Result<_>>()?,
            page: list.page,
            page_size: list.page_size,
            total: u64::try_from(total)?,
        })
    }
}

#[async_trait]
impl ArticleStore for PostgresArticleStore {
    async fn list(&self, query: &ListArticlesQuery) -> anyhow::Result<Page<Article>> {
        self.page(query, None).await
    }

    async fn list_between(&self, query: &ArticlesByDatesQuery) -> anyhow::Result<Page<Article>> {
        self.page(&query.list, Some((query.from, query.to))).await
    }

    async fn get(&self, id: u64) -> anyhow::Result<Option<Article>> {
        let Ok(id) = i64::try_from(id) else {
            return Ok(None);
        };
        let sql = format!("SELECT {COLUMNS} FROM articles WHERE id = $1");
        sqlx::query_as::<_, ArticleRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Article::try_from)
            .transpose()
    }

    async fn create(&self, article: NewArticle) -> anyhow::Result<Article> {
        let sql = format!(
            "INSERT INTO articles (title, content, photo_url) VALUES ($1, $2, $3) RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, ArticleRow>(&sql)
            .bind(article.title)
            .bind(article.content)
            .bind(article.photo_url)
            .fetch_one(&self.pool)
            .await?;
        Article::try_from(row)
    }

    async fn update(&self, id: u64, patch: ArticlePatch) -> anyhow::Result<Option<Article>> {
        let Ok(id) = i64::try_from(id) else {
            return Ok(None);
        };
        let sql = format!(
            "UPDATE articles SET \
                title = COALESCE($2, title), \
                content = COALESCE($3, content), \
                photo_url = CASE WHEN $4 THEN $5 ELSE photo_url END, \
                updated_at = NOW() \
             WHERE id = $1 RETURNING {COLUMNS}"
        );
        let set_photo = patch.photo_url.is_some();
        sqlx::query_as::<_, ArticleRow>(&sql)
            .bind(id)
            .bind(patch.title)
            .bind(patch.content)
            .bind(set_photo)
            .bind(patch.photo_url.flatten())
            .fetch_optional(&self.pool)
            .await?
            .map(Article::try_from)
            .transpose()
    }

    async fn delete(&self, id: u64) -> anyhow::Result<bool> {
        let Ok(id) = i64::try_from(id) else {
            return Ok(false);
        };
        let result = sqlx::query("DELETE FROM articles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn now(&self) -> anyhow::Result<DateTime<Utc>> {
        Ok(sqlx::query_scalar::<_, DateTime<Utc>>("SELECT NOW()")
            .fetch_one(&self.pool)
            .await?)
    }
}
