//! HTTP surface for llamacoder: chat and message CRUD, completion streaming
//! relayed as server-sent events, and the MCP server registry.

pub mod api;
pub mod config;
pub mod error;
pub mod state;

#[cfg(test)]
mod testing;

use axum::Router;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

pub use config::ServerConfig;
pub use error::AppError;
pub use state::AppState;

/// Builds the application router over `state`.
pub fn router(state: AppState) -> Router {
    api::routes().with_state(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    )
}

/// Binds `config.bind` and serves until ctrl-c.
pub async fn serve(config: &ServerConfig, state: AppState) -> std::io::Result<()> {
    let listener = TcpListener::bind(config.bind).await?;
    info!(addr = %listener.local_addr()?, data_dir = %config.data_dir.display(), "llamacoder server listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("llamacoder server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
