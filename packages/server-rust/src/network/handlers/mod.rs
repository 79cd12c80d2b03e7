//! HTTP handler definitions for the articles server.
//!
//! This module defines `AppState` (the shared state carried through axum
//! extractors) and re-exports all handler functions for convenient access
//! when building the router.

pub mod articles;
pub mod fallback;
pub mod health;

pub use articles::{
    create_article, delete_article, generate_article, get_article, list_articles,
    search_articles, update_article,
};
pub use fallback::{method_not_allowed_handler, not_found_handler};
pub use health::{health_handler, hello_handler};

use std::sync::Arc;

use articles_core::{ClockSource, SystemClock};

use crate::generator::StaticContentGenerator;
use crate::storage::MemoryArticleStore;
use crate::traits::{ArticleStore, ContentGenerator};

/// Shared application state passed to all axum handlers via `State` extraction.
///
/// Holds `Arc` references to shared resources so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Article persistence backend.
    pub store: Arc<dyn ArticleStore>,
    /// Draft generator behind `POST /api/articles/generate`.
    pub generator: Arc<dyn ContentGenerator>,
    /// Time source shared by the search schema and the generator.
    pub clock: Arc<dyn ClockSource>,
}

impl AppState {
    #[must_use]
    pub fn new(
        store: Arc<dyn ArticleStore>,
        generator: Arc<dyn ContentGenerator>,
        clock: Arc<dyn ClockSource>,
    ) -> Self {
        Self {
            store,
            generator,
            clock,
        }
    }

    /// In-memory store and static generator, both reading `clock`.
    #[must_use]
    pub fn in_memory(clock: Arc<dyn ClockSource>) -> Self {
        Self::new(
            Arc::new(MemoryArticleStore::new(Arc::clone(&clock))),
            Arc::new(StaticContentGenerator::new(Arc::clone(&clock))),
            clock,
        )
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::in_memory(Arc::new(SystemClock))
    }
}
