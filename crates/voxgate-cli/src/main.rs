//! voxgate entry point - the composition root.

use clap::Parser;

use voxgate_cli::{Cli, load_env_filter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env, then initialize logging from it
    tracing_subscriber::fmt()
        .with_env_filter(load_env_filter(None))
        .init();

    let config = Cli::parse().into_server_config();
    voxgate_axum::validate_config(&config)?;

    tracing::info!(
        target: "voxgate.cli",
        host = %config.host,
        port = config.port,
        workers = config.settings.workers,
        engine_concurrency = config.settings.engine_concurrency,
        "Starting voxgate"
    );

    voxgate_axum::start_server(config).await
}
