//! Perfect Clean API - contact form backend for the Perfect Clean website
//!
//! Receives submissions on `POST /api/contato`, strips markup from every
//! field, limits each client IP to a few submissions per window, validates
//! the contact data and relays accepted submissions to an automation
//! webhook. The static site is served from the public directory.
//!
//! ## Features
//!
//! - **Sanitization**: HTML tags and scripts removed, remaining special characters escaped
//! - **Rate Limiting**: Sliding window per client IP over an injectable store
//! - **Validation**: Brazilian names, mobile phone numbers and the service catalogue
//! - **Forwarding**: Single best-effort webhook POST with a hard timeout
//! - **Observability**: Structured request, contact, security, performance, info and error events
//! - **Web**: Security headers, CORS, and a cache policy for the static site
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use perfect_clean_api::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load(None)?;
//!     perfect_clean_api::server::start_server(config).await
//! }
//! ```

pub mod api;
pub mod config;
pub mod contact;
pub mod error;
pub mod middleware;
pub mod observability;
pub mod server;
pub mod shutdown;
pub mod webhook;

pub use config::Config;
pub use error::{AppError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::api::AppState;
    pub use crate::config::{Config, Environment};
    pub use crate::contact::{ContactPipeline, ContactSubmission, Outcome, Rejection, WebhookPayload};
    pub use crate::error::{AppError, Result};
    pub use crate::middleware::{ContactValidator, RateLimitConfig, RateLimiter, Sanitizer};
    pub use crate::observability::{EventSink, HealthChecker, LogEvent, MemorySink, TracingSink};
    pub use crate::webhook::{ForwardOutcome, Forwarder, WebhookClient};
}
