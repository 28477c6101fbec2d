//! Error types for the contact API

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for API operations
pub type Result<T> = std::result::Result<T, AppError>;

/// Generic message returned for unexpected failures
pub const INTERNAL_ERROR_MESSAGE: &str = "Erro interno do servidor. Tente novamente mais tarde.";

/// Main error type for the contact API
///
/// Validation and rate-limit rejections are not errors here: the pipeline
/// reports them as regular outcomes. Anything that reaches this type is an
/// unexpected failure and ends up as a 500 at the outer boundary.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Webhook error: {0}")]
    Webhook(#[from] WebhookError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Short machine-readable name used in error events
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Config(_) => "ConfigError",
            AppError::Webhook(_) => "WebhookError",
            AppError::Serialization(_) => "SerializationError",
            AppError::Io(_) => "IoError",
            AppError::Internal(_) => "InternalError",
        }
    }

    /// Render the client-facing 500 envelope.
    ///
    /// The error detail is only echoed back when `expose_detail` is set,
    /// which the handlers tie to a non-production environment.
    pub fn to_response(&self, expose_detail: bool) -> Response {
        let mut body = json!({
            "success": false,
            "message": INTERNAL_ERROR_MESSAGE,
        });
        if expose_detail {
            body["error"] = json!(self.to_string());
        }
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_response(false)
    }
}

/// Errors raised while forwarding a submission to the automation webhook
#[derive(Error, Debug)]
pub enum WebhookError {
    #[error("Request timed out after {0} ms")]
    Timeout(u128),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Webhook responded with status {0}")]
    Status(u16),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind() {
        assert_eq!(AppError::Internal("boom".into()).kind(), "InternalError");
        assert_eq!(AppError::Config("bad".into()).kind(), "ConfigError");
        assert_eq!(AppError::from(WebhookError::Status(502)).kind(), "WebhookError");
    }

    #[test]
    fn test_webhook_error_display() {
        assert_eq!(
            WebhookError::Status(503).to_string(),
            "Webhook responded with status 503"
        );
        assert_eq!(
            WebhookError::Timeout(10_000).to_string(),
            "Request timed out after 10000 ms"
        );
    }

    async fn body_of(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_response_hides_detail_by_default() {
        let response = AppError::Internal("secret".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_of(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], INTERNAL_ERROR_MESSAGE);
        assert!(body.get("error").is_none());
        assert!(body.get("details").is_none());
        assert!(!body.to_string().contains("secret"));
    }

    #[tokio::test]
    async fn test_response_exposes_detail_when_asked() {
        let response = AppError::Internal("secret".into()).to_response(true);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_of(response).await;
        assert_eq!(body["message"], INTERNAL_ERROR_MESSAGE);
        assert_eq!(body["error"], "Internal error: secret");
    }
}
