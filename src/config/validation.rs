//! Configuration validation

use super::*;
use crate::error::{AppError, Result};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: &[&str] = &["json", "compact", "pretty"];

/// Validate complete configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_server_config(&config.server)?;
    validate_logging_config(&config.logging)?;
    validate_webhook_config(&config.webhook)?;
    validate_rate_limit_config(&config.rate_limit)?;
    Ok(())
}

/// Validate server configuration
fn validate_server_config(config: &ServerConfig) -> Result<()> {
    if config.port == 0 {
        return Err(AppError::Config(
            "Server port cannot be 0".to_string()
        ));
    }

    if config.host.is_empty() {
        return Err(AppError::Config(
            "Server host cannot be empty".to_string()
        ));
    }

    if config.public_dir.is_empty() {
        return Err(AppError::Config(
            "Public directory cannot be empty".to_string()
        ));
    }

    if config.max_body_size_mb > 100 {
        return Err(AppError::Config(
            "Max body size too large (max: 100 MB)".to_string()
        ));
    }

    if let Some(origin) = config
        .cors_origins
        .iter()
        .find(|o| !(o.starts_with("http://") || o.starts_with("https://")) || o.ends_with('/'))
    {
        return Err(AppError::Config(format!(
            "Invalid CORS origin '{}' (expected scheme://host[:port])",
            origin
        )));
    }

    Ok(())
}

/// Validate logging configuration
fn validate_logging_config(config: &LoggingConfig) -> Result<()> {
    if !LOG_LEVELS.contains(&config.level.to_lowercase().as_str()) {
        return Err(AppError::Config(format!(
            "Invalid log level '{}' (expected one of: {})",
            config.level,
            LOG_LEVELS.join(", ")
        )));
    }

    if !LOG_FORMATS.contains(&config.format.as_str()) {
        return Err(AppError::Config(format!(
            "Invalid log format '{}' (expected one of: {})",
            config.format,
            LOG_FORMATS.join(", ")
        )));
    }

    Ok(())
}

/// Validate webhook configuration
fn validate_webhook_config(config: &WebhookConfig) -> Result<()> {
    if let Some(url) = config.url() {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(AppError::Config(
                "Webhook URL must start with http:// or https://".to_string()
            ));
        }
    }

    if config.timeout_secs == 0 {
        return Err(AppError::Config(
            "Webhook timeout must be greater than 0".to_string()
        ));
    }

    if config.timeout_secs > 60 {
        return Err(AppError::Config(
            "Webhook timeout too large (max: 60 seconds)".to_string()
        ));
    }

    Ok(())
}

/// Validate rate limit configuration
fn validate_rate_limit_config(config: &RateLimitSettings) -> Result<()> {
    // the window also paces the cleanup task, so it is checked even when disabled
    if config.window_secs == 0 {
        return Err(AppError::Config(
            "Rate limit window must be greater than 0".to_string()
        ));
    }

    if !config.enabled {
        return Ok(());
    }

    if config.max_requests == 0 {
        return Err(AppError::Config(
            "Rate limit max requests must be greater than 0".to_string()
        ));
    }

    Ok(())
}
