//! HTTP client for the automation webhook

use super::{ForwardOutcome, Forwarder};
use crate::contact::WebhookPayload;
use crate::error::{AppError, WebhookError};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

/// Client posting submissions to the configured webhook
pub struct WebhookClient {
    url: Option<String>,
    timeout: Duration,
    http_client: Client,
}

impl WebhookClient {
    /// Create a new webhook client; `url = None` disables forwarding
    pub fn new(url: Option<String>, timeout: Duration) -> Result<Self, AppError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(4)
            .build()
            .map_err(WebhookError::Network)?;

        let url = url.filter(|u| !u.trim().is_empty());
        info!(
            "Initialized webhook client (configured={}, timeout={}ms)",
            url.is_some(),
            timeout.as_millis()
        );

        Ok(Self {
            url,
            timeout,
            http_client,
        })
    }

    /// Make a single POST; any non-2xx status is an error
    async fn try_send(&self, url: &str, payload: &WebhookPayload) -> Result<u16, WebhookError> {
        debug!("Posting submission to webhook");

        let response = self
            .http_client
            .post(url)
            .header("Content-Type", "application/json")
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    WebhookError::Timeout(self.timeout.as_millis())
                } else {
                    WebhookError::Network(e)
                }
            })?;

        let status = response.status();
        if status.is_success() {
            Ok(status.as_u16())
        } else {
            Err(WebhookError::Status(status.as_u16()))
        }
    }
}

#[async_trait]
impl Forwarder for WebhookClient {
    fn target(&self) -> Option<&str> {
        self.url.as_deref()
    }

    async fn forward(&self, payload: &WebhookPayload) -> ForwardOutcome {
        let Some(url) = self.url.as_deref() else {
            return ForwardOutcome::NotConfigured;
        };

        match self.try_send(url, payload).await {
            Ok(status) => ForwardOutcome::Delivered { status },
            Err(e) => ForwardOutcome::Failed {
                reason: e.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> WebhookPayload {
        WebhookPayload {
            nome: "João Silva".into(),
            telefone: "(11) 99999-9999".into(),
            servico: "Limpeza de Sofás".into(),
            data: "Não informado".into(),
            horario: "Não informado".into(),
            data_envio: "2026-10-19T12:00:00.000Z".into(),
            ip: "127.0.0.1".into(),
            user_agent: None,
            referer: None,
        }
    }

    #[tokio::test]
    async fn test_not_configured() {
        let client = WebhookClient::new(None, Duration::from_secs(1)).unwrap();
        assert!(!client.is_configured());
        assert_eq!(client.forward(&payload()).await, ForwardOutcome::NotConfigured);

        let blank = WebhookClient::new(Some("  ".into()), Duration::from_secs(1)).unwrap();
        assert!(blank.target().is_none());
    }

    #[tokio::test]
    async fn test_delivered() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/webhook/contato")
            .match_header("content-type", "application/json")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "nome": "João Silva",
                "servico": "Limpeza de Sofás",
                "dataEnvio": "2026-10-19T12:00:00.000Z"
            })))
            .with_status(200)
            .create_async()
            .await;

        let url = format!("{}/webhook/contato", server.url());
        let client = WebhookClient::new(Some(url), Duration::from_secs(5)).unwrap();

        assert_eq!(
            client.forward(&payload()).await,
            ForwardOutcome::Delivered { status: 200 }
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_success_status_fails() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/hook")
            .with_status(502)
            .expect(1)
            .create_async()
            .await;

        let client = WebhookClient::new(Some(format!("{}/hook", server.url())), Duration::from_secs(5)).unwrap();

        match client.forward(&payload()).await {
            ForwardOutcome::Failed { reason } => assert!(reason.contains("502")),
            other => panic!("expected failure, got {:?}", other),
        }
        // exactly one attempt, no retries
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_timeout_fails() {
        // accepts connections but never answers
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let client = WebhookClient::new(Some(format!("http://{}/hook", addr)), Duration::from_millis(200)).unwrap();

        match client.forward(&payload()).await {
            ForwardOutcome::Failed { reason } => assert!(reason.contains("timed out"), "{}", reason),
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_connection_refused_fails() {
        // bind then drop to get a port nobody listens on
        let addr = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };

        let client = WebhookClient::new(Some(format!("http://{}/hook", addr)), Duration::from_secs(2)).unwrap();
        assert!(matches!(
            client.forward(&payload()).await,
            ForwardOutcome::Failed { .. }
        ));
    }
}
