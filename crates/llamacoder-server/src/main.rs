use anyhow::Context as _;
use clap::Parser;
use llamacoder_core::observability::init_observability;
use llamacoder_server::{AppState, ServerConfig, serve};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_observability();

    let config = ServerConfig::parse();
    let state = AppState::from_config(&config).context("failed to build application state")?;
    serve(&config, state)
        .await
        .with_context(|| format!("server on {} failed", config.bind))
}
