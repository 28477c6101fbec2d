//! Middleware for limiting request body size

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

/// Configuration for body size limiting
#[derive(Debug, Clone)]
pub struct BodyLimitConfig {
    /// Maximum body size in bytes (0 = unlimited)
    pub max_body_size: usize,
}

impl Default for BodyLimitConfig {
    fn default() -> Self {
        Self {
            max_body_size: 10 * 1024 * 1024, // 10 MB default
        }
    }
}

/// Body size limiting middleware
#[derive(Debug, Clone)]
pub struct BodyLimiter {
    config: BodyLimitConfig,
}

impl BodyLimiter {
    /// Create a new body limiter
    pub fn new(config: BodyLimitConfig) -> Self {
        Self { config }
    }

    /// Create a limiter from a size in megabytes
    pub fn from_megabytes(mb: usize) -> Self {
        Self::new(BodyLimitConfig {
            max_body_size: mb * 1024 * 1024,
        })
    }

    /// Get the maximum body size in bytes
    pub fn max_body_size(&self) -> usize {
        self.config.max_body_size
    }

    /// Whether a declared length goes over the limit
    pub fn exceeds(&self, len: usize) -> bool {
        self.config.max_body_size != 0 && len > self.config.max_body_size
    }
}

/// Reject requests whose declared `Content-Length` is over the limit.
///
/// Bodies without the header are bounded while being read by
/// `RequestBodyLimitLayer`.
pub async fn body_limit_middleware(
    axum::extract::State(limiter): axum::extract::State<Arc<BodyLimiter>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let declared = req
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());

    if let Some(len) = declared {
        if limiter.exceeds(len) {
            warn!("Request body too large: {} bytes (max: {})", len, limiter.max_body_size());
            return payload_too_large();
        }
    }

    next.run(req).await
}

/// JSON 413 response shared with body extraction
pub fn payload_too_large() -> Response {
    (
        StatusCode::PAYLOAD_TOO_LARGE,
        Json(json!({
            "success": false,
            "error": "Requisição muito grande",
        })),
    )
        .into_response()
}
