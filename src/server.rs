//! Application assembly and the HTTP server

use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;

use crate::api::{build_router, AppState};
use crate::config::Config;
use crate::contact::{ContactPipeline, CONTACT_ROUTE};
use crate::error::Result;
use crate::middleware::{RateLimitConfig, RateLimiter};
use crate::observability::{EventSink, HealthChecker, TracingSink};
use crate::shutdown::shutdown_signal;
use crate::webhook::{Forwarder, WebhookClient};

impl AppState {
    /// Wire the pipeline and health checker from configuration
    pub fn from_config(
        config: &Config,
        sink: Arc<dyn EventSink>,
        forwarder: Arc<dyn Forwarder>,
    ) -> Self {
        let limiter = Arc::new(RateLimiter::new(RateLimitConfig::from(&config.rate_limit)));
        let health_checker = Arc::new(HealthChecker::new(
            config.environment,
            forwarder.is_configured(),
        ));

        let pipeline = ContactPipeline::new(limiter, forwarder, sink.clone())
            .with_detached_forwarding(config.webhook.detached)
            .with_slow_threshold(Duration::from_millis(config.performance.slow_contact_ms));

        Self {
            pipeline: Arc::new(pipeline),
            health_checker,
            sink,
            environment: config.environment,
            trust_proxy: config.server.trust_proxy,
        }
    }
}

/// Build the router with the webhook client described by `config`
pub fn build_app(config: &Config, sink: Arc<dyn EventSink>) -> Result<Router> {
    let forwarder = WebhookClient::new(
        config.webhook.url().map(str::to_string),
        config.webhook.timeout(),
    )?;
    Ok(build_app_with_forwarder(config, sink, Arc::new(forwarder)))
}

/// Build the router around a custom forwarder
pub fn build_app_with_forwarder(
    config: &Config,
    sink: Arc<dyn EventSink>,
    forwarder: Arc<dyn Forwarder>,
) -> Router {
    build_router(AppState::from_config(config, sink, forwarder), config)
}

/// Serve `app` on `listener` until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await?;
    Ok(())
}

/// Start the HTTP server and block until a shutdown signal
pub async fn start_server(config: Config) -> Result<()> {
    let forwarder: Arc<dyn Forwarder> = Arc::new(WebhookClient::new(
        config.webhook.url().map(str::to_string),
        config.webhook.timeout(),
    )?);
    let state = AppState::from_config(&config, Arc::new(TracingSink), forwarder);
    let cleanup = state.pipeline.limiter().clone().start_cleanup_task();
    let app = build_router(state, &config);

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr).await?;
    log_startup(&config, &addr);

    let result = serve(listener, app, shutdown_signal()).await;
    if let Some(cleanup) = cleanup {
        cleanup.abort();
    }
    info!("Server stopped");
    result
}

fn log_startup(config: &Config, addr: &str) {
    info!(
        port = config.server.port,
        environment = %config.environment,
        "Perfect Clean API listening on {}",
        addr
    );
    info!("Health check: http://localhost:{}/api/health", config.server.port);
    info!("Contact form: http://localhost:{}{}", config.server.port, CONTACT_ROUTE);

    if config.rate_limit.enabled {
        info!(
            "Rate limit: {} submissions per {} minutes per IP",
            config.rate_limit.max_requests,
            config.rate_limit.window_secs / 60
        );
    } else {
        info!("Rate limit: disabled");
    }

    match config.webhook.url() {
        Some(url) => info!(detached = config.webhook.detached, "Webhook: {}", url),
        None => info!("Webhook: not configured, submissions are only logged"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::MemorySink;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_serves_until_shutdown() {
        let config = Config::default_config();
        let sink = Arc::new(MemorySink::new());
        let app = build_app(&config, sink.clone()).unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel::<()>();
        let server = tokio::spawn(serve(listener, app, async {
            let _ = rx.await;
        }));

        let response = reqwest::get(format!("http://{}/api/health", addr))
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["checks"]["webhook"], "not_configured");

        // the peer address reaches the request log through ConnectInfo
        match &sink.of_kind("request")[0] {
            crate::observability::LogEvent::Request { request, .. } => {
                assert_eq!(request.ip, "127.0.0.1")
            }
            other => panic!("unexpected event {:?}", other),
        }

        tx.send(()).unwrap();
        server.await.unwrap().unwrap();
    }
}
