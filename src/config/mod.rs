//! Configuration management for the contact API

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

pub mod loader;
pub mod validation;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub environment: Environment,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub webhook: WebhookConfig,
    pub rate_limit: RateLimitSettings,
    pub performance: PerformanceConfig,
}

/// Deployment environment
///
/// Only production hides error detail from clients and trims console noise.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
    Test,
}

impl Environment {
    pub fn is_production(self) -> bool {
        self == Environment::Production
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
            Environment::Test => "test",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server port
    #[serde(default = "default_server_port")]
    pub port: u16,

    /// Server host
    #[serde(default = "default_server_host")]
    pub host: String,

    /// Directory with the static site
    #[serde(default = "default_public_dir")]
    pub public_dir: String,

    /// Maximum request body size in MB (0 = unlimited)
    #[serde(default = "default_max_body_size")]
    pub max_body_size_mb: usize,

    /// Take the client address from `X-Forwarded-For` when behind a proxy
    #[serde(default)]
    pub trust_proxy: bool,

    /// Origins allowed to call the API in production; any origin is
    /// reflected in other environments
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (json, compact or pretty)
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Automation webhook configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Target URL; forwarding is disabled when unset
    #[serde(default)]
    pub url: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_webhook_timeout")]
    pub timeout_secs: u64,

    /// Forward in a background task instead of awaiting before responding
    #[serde(default)]
    pub detached: bool,
}

impl WebhookConfig {
    /// The configured URL, treating an empty value as unset
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Submission rate limiting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSettings {
    #[serde(default = "default_rate_limit_enabled")]
    pub enabled: bool,

    /// Accepted attempts per window
    #[serde(default = "default_max_requests")]
    pub max_requests: usize,

    /// Window length in seconds
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Log a warning once fewer attempts than this remain
    #[serde(default = "default_warn_below")]
    pub warn_below: usize,

}

/// Thresholds for performance events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceConfig {
    #[serde(default = "default_slow_request_ms")]
    pub slow_request_ms: u64,

    #[serde(default = "default_slow_contact_ms")]
    pub slow_contact_ms: u64,
}

// Default value functions
fn default_server_port() -> u16 { 3000 }
fn default_server_host() -> String { "0.0.0.0".to_string() }
fn default_public_dir() -> String { "public".to_string() }
fn default_max_body_size() -> usize { 10 } // 10 MB default
fn default_cors_origins() -> Vec<String> {
    vec![
        "https://perfectclean.com.br".to_string(),
        "https://www.perfectclean.com.br".to_string(),
    ]
}
fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }
fn default_webhook_timeout() -> u64 { 10 }
fn default_rate_limit_enabled() -> bool { true }
fn default_max_requests() -> usize { 5 }
fn default_window_secs() -> u64 { 15 * 60 }
fn default_warn_below() -> usize { 2 }
fn default_slow_request_ms() -> u64 { 1000 }
fn default_slow_contact_ms() -> u64 { 500 }

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

impl Config {
    /// Load configuration from an optional TOML file plus the environment
    pub fn load(path: Option<&Path>) -> crate::error::Result<Self> {
        let config = loader::load_config(path)?;
        validation::validate_config(&config)?;
        Ok(config)
    }

    /// Validate this configuration
    pub fn validate(&self) -> crate::error::Result<()> {
        validation::validate_config(self)
    }

    /// Create default configuration
    pub fn default_config() -> Self {
        Self {
            environment: Environment::default(),
            server: ServerConfig {
                port: default_server_port(),
                host: default_server_host(),
                public_dir: default_public_dir(),
                max_body_size_mb: default_max_body_size(),
                trust_proxy: false,
                cors_origins: default_cors_origins(),
            },
            logging: LoggingConfig {
                level: default_log_level(),
                format: default_log_format(),
            },
            webhook: WebhookConfig {
                url: None,
                timeout_secs: default_webhook_timeout(),
                detached: false,
            },
            rate_limit: RateLimitSettings {
                enabled: default_rate_limit_enabled(),
                max_requests: default_max_requests(),
                window_secs: default_window_secs(),
                warn_below: default_warn_below(),
            },
            performance: PerformanceConfig {
                slow_request_ms: default_slow_request_ms(),
                slow_contact_ms: default_slow_contact_ms(),
            },
        }
    }

    /// Socket address string to bind
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
