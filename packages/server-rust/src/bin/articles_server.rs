//! Articles API server binary.

use std::sync::Arc;

use articles_core::{ClockSource, SystemClock};
use articles_server::generator::StaticContentGenerator;
use articles_server::logging::init_tracing;
use articles_server::{storage, AppState, NetworkModule, ServerArgs};
use clap::Parser;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = ServerArgs::parse();
    init_tracing(args.log_format)?;

    let clock: Arc<dyn ClockSource> = Arc::new(SystemClock);
    let store = storage::open(args.database_url.as_deref(), Arc::clone(&clock)).await?;
    let generator = Arc::new(StaticContentGenerator::new(Arc::clone(&clock)));
    let state = AppState::new(store, generator, clock);

    let mut module = NetworkModule::new(args.network_config(), state);
    let port = module.start().await?;
    info!(port, environment = args.environment.as_str(), "Articles server listening");

    module.serve(shutdown_signal()).await
}

/// Resolves on Ctrl-C, or on SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}
