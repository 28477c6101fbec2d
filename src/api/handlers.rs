//! API request handlers

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Query, Request, State},
    http::{header, request::Parts, StatusCode, Uri},
    response::{IntoResponse, Response},
    Form, Json,
};
use futures::FutureExt;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::any::Any;
use std::collections::HashMap;
use std::convert::Infallible;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{error, warn};

use crate::config::Environment;
use crate::contact::{ContactPipeline, InboundSubmission, Outcome, Rejection};
use crate::error::AppError;
use crate::middleware::{body_limit::payload_too_large, client::request_context, RATE_LIMIT_MESSAGE};
use crate::observability::{EventSink, HealthChecker, HealthReport, LogEvent, RequestContext};

/// Message returned when a submission is accepted
pub const SUCCESS_MESSAGE: &str =
    "Solicitação enviada com sucesso! Entraremos em contato via WhatsApp em breve.";

/// Message returned with validation errors
pub const INVALID_DATA_MESSAGE: &str = "Dados inválidos";

/// Error returned by the 404 fallback
pub const NOT_FOUND_MESSAGE: &str = "Endpoint não encontrado";

/// Error returned when a panic is caught
pub const PANIC_MESSAGE: &str = "Erro interno do servidor";

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ContactPipeline>,
    pub health_checker: Arc<HealthChecker>,
    pub sink: Arc<dyn EventSink>,
    pub environment: Environment,
    pub trust_proxy: bool,
}

/// Successful submission response
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
    pub message: &'static str,
}

/// Response listing every validation error
#[derive(Debug, Serialize)]
pub struct ValidationErrorResponse {
    pub success: bool,
    pub message: &'static str,
    pub errors: Vec<String>,
}

/// Generic error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

/// Request details of the calling client
pub struct ClientContext(pub RequestContext);

#[async_trait]
impl FromRequestParts<AppState> for ClientContext {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(Self(request_context(
            &parts.method,
            &parts.uri,
            &parts.headers,
            &parts.extensions,
            state.trust_proxy,
        )))
    }
}

/// Submission body as a field map, from JSON or a urlencoded form.
///
/// A JSON value that is not an object and a request without a supported
/// content type both yield an empty map, which validation then rejects.
pub struct ContactBody(pub Map<String, Value>);

#[async_trait]
impl<S> FromRequest<S> for ContactBody
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(fields) = Form::<HashMap<String, String>>::from_request(req, state)
                .await
                .map_err(|rejection| body_rejection(rejection.status(), rejection.body_text()))?;
            let map = fields
                .into_iter()
                .map(|(k, v)| (k, Value::String(v)))
                .collect();
            return Ok(Self(map));
        }

        if !is_json(&content_type) {
            return Ok(Self(Map::new()));
        }

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| body_rejection(rejection.status(), rejection.body_text()))?;
        if bytes.is_empty() {
            return Ok(Self(Map::new()));
        }

        match Json::<Value>::from_bytes(&bytes) {
            Ok(Json(Value::Object(map))) => Ok(Self(map)),
            Ok(_) => Ok(Self(Map::new())),
            Err(rejection) => Err(body_rejection(rejection.status(), rejection.body_text())),
        }
    }
}

fn is_json(content_type: &str) -> bool {
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    essence == "application/json" || essence.ends_with("+json")
}

fn body_rejection(status: StatusCode, detail: String) -> Response {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        return payload_too_large();
    }
    warn!("Rejected malformed request body: {}", detail);
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::new("Corpo da requisição inválido")),
    )
        .into_response()
}

/// `POST /api/contato`
pub async fn submit_contact(
    State(state): State<AppState>,
    ClientContext(request): ClientContext,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
    ContactBody(body): ContactBody,
) -> Response {
    let inbound = InboundSubmission {
        body,
        query: query
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect(),
        request: request.clone(),
    };

    // a panic inside the pipeline is answered like any other internal error
    let processed = AssertUnwindSafe(state.pipeline.process(inbound))
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| Err(AppError::Internal(panic_detail(panic.as_ref()))));

    match processed {
        Ok(Outcome::Accepted { .. }) => (
            StatusCode::OK,
            Json(SuccessResponse {
                success: true,
                message: SUCCESS_MESSAGE,
            }),
        )
            .into_response(),
        Ok(Outcome::Rejected(Rejection::Invalid(result))) => (
            StatusCode::BAD_REQUEST,
            Json(ValidationErrorResponse {
                success: false,
                message: INVALID_DATA_MESSAGE,
                errors: result.errors,
            }),
        )
            .into_response(),
        Ok(Outcome::Rejected(Rejection::RateLimited)) => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(ErrorResponse::new(RATE_LIMIT_MESSAGE)),
        )
            .into_response(),
        Err(e) => {
            state.sink.record(LogEvent::error(
                e.kind(),
                e.to_string(),
                Some(request),
                json!({ "endpoint": uri.path() }),
            ));
            e.to_response(!state.environment.is_production())
        }
    }
}

/// `GET /api/health`
pub async fn health(
    State(state): State<AppState>,
    ClientContext(request): ClientContext,
) -> Json<HealthReport> {
    let report = state.health_checker.check_health();
    state.sink.record(LogEvent::info(
        "health_check",
        Some(request),
        json!({ "uptime": report.uptime }),
    ));
    Json(report)
}

/// Fallback for paths that match neither a route nor a static file
pub async fn not_found(
    State(state): State<AppState>,
    ClientContext(request): ClientContext,
    uri: Uri,
) -> Response {
    let path = uri.path().to_string();
    state.sink.record(LogEvent::security(
        "404_not_found",
        request.clone(),
        json!({
            "requestedPath": path,
            "method": request.method,
        }),
    ));

    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "success": false,
            "error": NOT_FOUND_MESSAGE,
            "path": path,
            "timestamp": timestamp(),
        })),
    )
        .into_response()
}

/// Render a caught panic as the global 500 envelope
pub fn panic_response(
    panic: Box<dyn Any + Send + 'static>,
    sink: &dyn EventSink,
    expose_detail: bool,
) -> Response {
    let detail = panic_detail(panic.as_ref());
    error!("Handler panicked: {}", detail);
    sink.record(LogEvent::error("Panic", detail.clone(), None, json!({})));

    let mut body = json!({
        "success": false,
        "error": PANIC_MESSAGE,
        "timestamp": timestamp(),
    });
    if expose_detail {
        body["details"] = Value::String(detail);
    }

    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}

fn panic_detail(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    }
}

fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::MemorySink;

    #[test]
    fn test_json_content_types() {
        assert!(is_json("application/json"));
        assert!(is_json("application/json; charset=utf-8"));
        assert!(is_json("application/vnd.api+json"));
        assert!(!is_json("text/plain"));
        assert!(!is_json(""));
    }

    async fn body_of(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_panic_response_hides_detail_in_production() {
        let sink = MemorySink::new();

        let response = panic_response(Box::new("boom"), &sink, false);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(sink.of_kind("error").len(), 1);

        let body = body_of(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], PANIC_MESSAGE);
        assert!(body.get("details").is_none());
        assert!(!body.to_string().contains("boom"));

        match &sink.of_kind("error")[0] {
            LogEvent::Error { name, message, .. } => {
                assert_eq!(name, "Panic");
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_panic_response_exposes_detail_outside_production() {
        let sink = MemorySink::new();

        let response = panic_response(Box::new(String::from("boom")), &sink, true);
        let body = body_of(response).await;
        assert_eq!(body["details"], "boom");
    }

    #[test]
    fn test_panic_detail_of_unknown_payload() {
        assert_eq!(panic_detail(&42_u8), "unknown panic");
        assert_eq!(panic_detail(&"static"), "static");
    }

    #[tokio::test]
    async fn test_body_rejection_maps_status() {
        let too_large = body_rejection(StatusCode::PAYLOAD_TOO_LARGE, String::new());
        assert_eq!(too_large.status(), StatusCode::PAYLOAD_TOO_LARGE);

        let malformed = body_rejection(StatusCode::UNPROCESSABLE_ENTITY, "bad".into());
        assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(malformed.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
    }
}
