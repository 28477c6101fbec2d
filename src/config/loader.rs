//! Configuration loader with environment variable support
//!
//! Sources are layered lowest to highest priority: built-in defaults, an
//! optional TOML file, `PERFECT_CLEAN__SECTION__KEY` variables and finally
//! the short deployment variables (`PORT`, `LOG_LEVEL`, `APP_ENV`,
//! `N8N_WEBHOOK_URL`) that hosting platforms usually set.

use super::Config;
use crate::error::Result;
use config::{Environment, File};
use std::path::Path;

/// Prefix for structured environment overrides
pub const ENV_PREFIX: &str = "PERFECT_CLEAN";

/// Short environment variables recognised for compatibility with common hosts
#[derive(Debug, Clone, Default)]
pub struct DeployOverrides {
    pub port: Option<String>,
    pub log_level: Option<String>,
    pub environment: Option<String>,
    pub webhook_url: Option<String>,
}

impl DeployOverrides {
    /// Read the overrides from the process environment
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            port: var("PORT"),
            log_level: var("LOG_LEVEL"),
            environment: var("APP_ENV").map(|v| v.to_lowercase()),
            webhook_url: var("N8N_WEBHOOK_URL"),
        }
    }
}

/// Load configuration from defaults, an optional file and the environment
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    load_config_with(path, DeployOverrides::from_env())
}

/// Load configuration with explicit deployment overrides
pub fn load_config_with(path: Option<&Path>, overrides: DeployOverrides) -> Result<Config> {
    let mut builder = config::Config::builder()
        .add_source(config::Config::try_from(&Config::default_config())?);

    if let Some(path) = path {
        builder = builder.add_source(File::from(path));
    }

    let config = builder
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .set_override_option("server.port", overrides.port)?
        .set_override_option("logging.level", overrides.log_level)?
        .set_override_option("environment", overrides.environment)?
        .set_override_option("webhook.url", overrides.webhook_url)?
        .build()?;

    let cfg: Config = config.try_deserialize()?;
    Ok(cfg)
}
