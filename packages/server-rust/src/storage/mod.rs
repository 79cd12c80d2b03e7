//! Article storage backends.
//!
//! [`open`] picks the backend: `PostgreSQL` when a database URL is configured
//! and the `postgres` feature is enabled, the in-memory store otherwise.

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

use std::sync::Arc;

use articles_core::ClockSource;
use tracing::info;

pub use memory::MemoryArticleStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresArticleStore;

use crate::traits::ArticleStore;

/// Opens the configured article store.
///
/// # Errors
///
/// Returns an error if a configured database cannot be reached.
pub async fn open(
    database_url: Option<&str>,
    clock: Arc<dyn ClockSource>,
) -> anyhow::Result<Arc<dyn ArticleStore>> {
    match database_url {
        #[cfg(feature = "postgres")]
        Some(url) => {
            info!("Using PostgreSQL article store");
            Ok(Arc::new(PostgresArticleStore::connect(url).await?))
        }
        #[cfg(not(feature = "postgres"))]
        Some(_) => {
            tracing::warn!("DATABASE_URL is set but the `postgres` feature is disabled; using in-memory store");
            Ok(Arc::new(MemoryArticleStore::new(clock)))
        }
        None => {
            info!("Using in-memory article store");
            Ok(Arc::new(MemoryArticleStore::new(clock)))
        }
    }
}
