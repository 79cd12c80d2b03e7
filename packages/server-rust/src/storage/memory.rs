//! In-memory article store.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use articles_core::{
    Article, ArticlePatch, ArticlesByDatesQuery, ClockSource, ListArticlesQuery, NewArticle, Page,
    SortDirection, SystemClock,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::traits::ArticleStore;

/// Keeps articles in a `BTreeMap` keyed by id. Ids start at 1 and are never
/// reused within the lifetime of the store.
pub struct MemoryArticleStore {
    articles: RwLock<BTreeMap<u64, Article>>,
    next_id: AtomicU64,
    clock: Arc<dyn ClockSource>,
}

impl MemoryArticleStore {
    #[must_use]
    pub fn new(clock: Arc<dyn ClockSource>) -> Self {
        Self {
            articles: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            clock,
        }
    }

    /// Number of stored articles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.articles.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.articles.read().is_empty()
    }

    fn page(&self, list: &ListArticlesQuery, keep: impl Fn(&Article) -> bool) -> Page<Article> {
        let articles = self.articles.read();
        let mut matching: Vec<&Article> = articles.values().filter(|a| keep(a)).collect();
        matching.sort_by_key(|a| (a.created_at, a.id));
        if list.sort_direction == SortDirection::Desc {
            matching.reverse();
        }

        let total = matching.len() as u64;
        let offset = usize::try_from(Page::<Article>::offset(list.page, list.page_size))
            .unwrap_or(usize::MAX);
        let limit = usize::try_from(list.page_size).unwrap_or(usize::MAX);

        Page {
            items: matching.into_iter().skip(offset).take(limit).cloned().collect(),
            page: list.page,
            page_size: list.page_size,
            total,
        }
    }
}

impl Default for MemoryArticleStore {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

#[async_trait]
impl ArticleStore for MemoryArticleStore {
    async fn list(&self, query: &ListArticlesQuery) -> anyhow::Result<Page<Article>> {
        Ok(self.page(query, |_| true))
    }

    async fn list_between(&self, query: &ArticlesByDatesQuery) -> anyhow::Result<Page<Article>> {
        Ok(self.page(&query.list, |a| {
            a.created_at >= query.from && a.created_at <= query.to
        }))
    }

    async fn get(&self, id: u64) -> anyhow::Result<Option<Article>> {
        Ok(self.articles.read().get(&id).cloned())
    }

    async fn create(&self, article: NewArticle) -> anyhow::Result<Article> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let now = self.clock.now();
        let article = Article {
            id,
            title: article.title,
            content: article.content,
            photo_url: article.photo_url,
            created_at: now,
            updated_at: now,
        };
        self.articles.write().insert(id, article.clone());
        Ok(article)
    }

    async fn update(&self, id: u64, patch: ArticlePatch) -> anyhow::Result<Option<Article>> {
        let mut articles = self.articles.write();
        let Some(article) = articles.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(title) = patch.title {
            article.title = title;
        }
        if let Some(content) = patch.content {
            article.content = content;
        }
        if let Some(photo_url) = patch.photo_url {
            article.photo_url = photo_url;
        }
        article.updated_at = self.clock.now();
        Ok(Some(article.clone()))
    }

    async fn delete(&self, id: u64) -> anyhow::Result<bool> {
        Ok(self.articles.write().remove(&id).is_some())
    }

    async fn now(&self) -> anyhow::Result<DateTime<Utc>> {
        Ok(self.clock.now())
    }
}
