//! API route configuration

use axum::{
    extract::DefaultBodyLimit,
    handler::Handler,
    routing::{get, post},
    Router,
};
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer, limit::RequestBodyLimitLayer, services::ServeDir,
    trace::TraceLayer,
};

use crate::{
    config::Config,
    contact::CONTACT_ROUTE,
    middleware::{
        body_limit::body_limit_middleware, cors_layer, security_headers_middleware,
        static_cache_middleware, BodyLimiter,
    },
    observability::request_log::{request_log_middleware, RequestLogger},
};

use super::handlers::{self, AppState};

/// Health route; it never consults the rate limiter
pub const HEALTH_ROUTE: &str = "/api/health";

/// Build the complete router with middleware.
///
/// Layers from the outside in: tracing, request log, security headers,
/// static cache policy, CORS, declared body size check, panic recovery.
/// Unmatched paths are served from the public directory and fall back to
/// the JSON 404.
pub fn build_router(state: AppState, config: &Config) -> Router {
    let body_limiter = Arc::new(BodyLimiter::from_megabytes(config.server.max_body_size_mb));
    let request_logger = Arc::new(RequestLogger::new(
        state.sink.clone(),
        Duration::from_millis(config.performance.slow_request_ms),
        config.server.trust_proxy,
    ));

    let environment = state.environment;
    let panic_sink = state.sink.clone();
    let expose_detail = !environment.is_production();

    let static_files = ServeDir::new(&config.server.public_dir)
        .call_fallback_on_method_not_allowed(true)
        .not_found_service(handlers::not_found.with_state(state.clone()));

    let mut router = Router::new()
        .route(CONTACT_ROUTE, post(handlers::submit_contact))
        .route(HEALTH_ROUTE, get(handlers::health))
        .fallback_service(static_files)
        .with_state(state)
        .layer(DefaultBodyLimit::disable());

    if body_limiter.max_body_size() > 0 {
        router = router.layer(RequestBodyLimitLayer::new(body_limiter.max_body_size()));
    }

    router.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(axum::middleware::from_fn_with_state(
                request_logger,
                request_log_middleware,
            ))
            .layer(axum::middleware::from_fn(security_headers_middleware))
            .layer(axum::middleware::from_fn_with_state(
                environment,
                static_cache_middleware,
            ))
            .layer(cors_layer(environment, &config.server.cors_origins))
            .layer(axum::middleware::from_fn_with_state(
                body_limiter,
                body_limit_middleware,
            ))
            .layer(CatchPanicLayer::custom(move |panic: Box<dyn Any + Send + 'static>| {
                handlers::panic_response(panic, &*panic_sink, expose_detail)
            })),
    )
}
