//! Perfect Clean API server binary
//!
//! Serves the static site and the contact endpoint. Configuration comes from
//! defaults, an optional TOML file named by `CONFIG_PATH`, and the environment
//! (a `.env` file is loaded first when present).

use anyhow::Context;
use perfect_clean_api::{config::Config, observability::init_observability, server::start_server};
use std::path::PathBuf;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // a missing .env is fine
    let dotenv = dotenvy::dotenv().ok();

    let config_path = std::env::var("CONFIG_PATH").ok().map(PathBuf::from);
    let config = Config::load(config_path.as_deref()).context("failed to load configuration")?;

    init_observability(&config.logging.level, &config.logging.format);

    info!("Starting Perfect Clean API v{}", env!("CARGO_PKG_VERSION"));
    if let Some(path) = dotenv {
        info!("Loaded environment from {}", path.display());
    }
    match &config_path {
        Some(path) => info!("Configuration loaded and validated from {}", path.display()),
        None => info!("Configuration loaded from defaults and environment"),
    }

    start_server(config).await.context("server error")?;

    info!("Shutdown complete");
    Ok(())
}
