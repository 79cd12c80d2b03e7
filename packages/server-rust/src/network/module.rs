//! Network module with deferred startup lifecycle.
//!
//! Implements the deferred startup pattern: `new()` takes configuration and
//! shared state, `start()` binds the TCP listener, and `serve()` starts
//! accepting connections. Tests use `build_router()` without binding at all.

use std::future::Future;
use std::sync::Arc;

use anyhow::anyhow;
use articles_core::{
    ArticleIdParamsSchema, ArticlesByDatesQuerySchema, CreateArticleSchema, GenerateArticleSchema,
    ListArticlesQuerySchema, UpdateArticleSchema,
};
use axum::handler::Handler;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use super::config::NetworkConfig;
use super::handlers::{
    create_article, delete_article, generate_article, get_article, health_handler, hello_handler,
    list_articles, method_not_allowed_handler, not_found_handler, search_articles,
    update_article, AppState,
};
use super::middleware::apply_http_layers;
use crate::error::ErrorRenderer;
use crate::validation::GateLayer;

/// Manages the HTTP server lifecycle.
///
/// Follows the deferred startup pattern:
/// 1. `new()` -- stores configuration and shared state
/// 2. `start()` -- binds TCP listener to the configured address
/// 3. `serve()` -- begins accepting connections until shutdown is signalled
pub struct NetworkModule {
    config: NetworkConfig,
    state: AppState,
    listener: Option<TcpListener>,
}

impl NetworkModule {
    /// Creates a new network module without binding any port.
    #[must_use]
    pub fn new(config: NetworkConfig, state: AppState) -> Self {
        Self {
            config,
            state,
            listener: None,
        }
    }

    /// Returns the shared application state.
    #[must_use]
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Assembles the axum router with all routes and middleware.
    ///
    /// Routes:
    /// - `GET /api/health` -- store connectivity probe
    /// - `GET /api/hello` -- greeting
    /// - `GET /api/articles` -- paginated list (query gate)
    /// - `POST /api/articles` -- create (body gate)
    /// - `GET /api/articles/search` -- list by creation date range (query gate)
    /// - `POST /api/articles/generate` -- draft generation (body gate)
    /// - `GET /api/articles/{id}` -- fetch one (params gate)
    /// - `PATCH /api/articles/{id}` -- partial update (params gate, then body gate)
    /// - `DELETE /api/articles/{id}` -- delete (params gate)
    ///
    /// Unknown paths answer 404 and known paths with the wrong method 405,
    /// both through the error renderer.
    pub fn build_router(&self) -> Router {
        build_app(&self.config, self.state.clone())
    }

    /// Binds the TCP listener to the configured host and port.
    ///
    /// Returns the actual bound port, which may differ from the configured
    /// port when port 0 is used (OS-assigned ephemeral port).
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound (e.g., port in use).
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();

        info!("TCP listener bound to {}:{}", self.config.host, port);

        self.listener = Some(listener);
        Ok(port)
    }

    /// Serves connections until the shutdown signal fires, then lets
    /// in-flight requests finish.
    ///
    /// A request whose client disconnects is cancelled: its handler future is
    /// dropped at the next await point.
    ///
    /// # Errors
    ///
    /// Returns an error if `start()` was not called first, or if the server
    /// encounters a fatal I/O error.
    pub async fn serve(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let router = build_app(&self.config, self.state);
        let listener = self
            .listener
            .ok_or_else(|| anyhow!("start() must be called before serve()"))?;

        info!(
            environment = self.config.environment.as_str(),
            "Serving HTTP connections"
        );

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Server stopped");
        Ok(())
    }
}

/// Builds the complete application: routes with their gates, fallbacks and
/// the HTTP middleware stack.
#[must_use]
pub fn build_app(config: &NetworkConfig, state: AppState) -> Router {
    let renderer = Arc::new(
        ErrorRenderer::new(config.environment).with_clock(Arc::clone(&state.clock)),
    );

    let router = article_routes(config, &state)
        .route("/api/health", get(health_handler))
        .route("/api/hello", get(hello_handler))
        .fallback(not_found_handler)
        .method_not_allowed_fallback(method_not_allowed_handler);

    apply_http_layers(router, config, renderer).with_state(state)
}

fn article_routes(config: &NetworkConfig, state: &AppState) -> Router<AppState> {
    let limit = config.body_limit;
    let id = || GateLayer::params(ArticleIdParamsSchema);
    let dates = ArticlesByDatesQuerySchema::new(Arc::clone(&state.clock));

    Router::new()
        .route(
            "/api/articles",
            get(list_articles.layer(GateLayer::query(ListArticlesQuerySchema))).post(
                create_article.layer(GateLayer::body(CreateArticleSchema).with_body_limit(limit)),
            ),
        )
        .route(
            "/api/articles/search",
            get(search_articles.layer(GateLayer::query(dates))),
        )
        .route(
            "/api/articles/generate",
            post(
                generate_article
                    .layer(GateLayer::body(GenerateArticleSchema).with_body_limit(limit)),
            ),
        )
        .route(
            "/api/articles/{id}",
            get(get_article.layer(id()))
                .patch(
                    update_article
                        .layer(GateLayer::body(UpdateArticleSchema).with_body_limit(limit))
                        .layer(id()),
                )
                .delete(delete_article.layer(id())),
        )
}
