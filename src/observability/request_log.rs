//! Per-request event logging middleware

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{EventSink, LogEvent};
use crate::middleware::client::request_context;

/// Settings and sink for the request log
pub struct RequestLogger {
    sink: Arc<dyn EventSink>,
    slow_threshold: Duration,
    trust_proxy: bool,
}

impl RequestLogger {
    pub fn new(sink: Arc<dyn EventSink>, slow_threshold: Duration, trust_proxy: bool) -> Self {
        Self {
            sink,
            slow_threshold,
            trust_proxy,
        }
    }
}

/// Record a `request` event for every response and a `performance` event
/// for requests slower than the threshold
pub async fn request_log_middleware(
    State(logger): State<Arc<RequestLogger>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let start = Instant::now();
    let context = request_context(
        req.method(),
        req.uri(),
        req.headers(),
        req.extensions(),
        logger.trust_proxy,
    );

    let response = next.run(req).await;

    let elapsed = start.elapsed();
    let duration_ms = elapsed.as_millis() as u64;
    let route = context.url.clone();

    logger.sink.record(LogEvent::request(
        context.clone(),
        response.status().as_u16(),
        duration_ms,
    ));

    if elapsed > logger.slow_threshold {
        logger
            .sink
            .record(LogEvent::performance(route, duration_ms, context));
    }

    response
}
