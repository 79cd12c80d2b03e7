//! Networking: configuration, middleware, handlers and the server lifecycle.

pub mod config;
pub mod handlers;
pub mod middleware;
pub mod module;

pub use config::NetworkConfig;
pub use handlers::AppState;
pub use middleware::apply_http_layers;
pub use module::{build_app, NetworkModule};
