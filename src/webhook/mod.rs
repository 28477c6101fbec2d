//! Forwarding of accepted submissions to the automation webhook

pub mod client;

pub use client::WebhookClient;

use async_trait::async_trait;

use crate::contact::WebhookPayload;

/// Result of one forwarding attempt
///
/// Forwarding never fails the request, so failures are reported as a value
/// rather than an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForwardOutcome {
    /// No webhook URL is configured
    NotConfigured,
    /// The webhook answered with a 2xx status
    Delivered { status: u16 },
    /// Timeout, network error or non-2xx status
    Failed { reason: String },
    /// Handed to a background task; the outcome is logged there
    Scheduled,
}

/// Trait for webhook forwarders
#[async_trait]
pub trait Forwarder: Send + Sync {
    /// Target URL, if forwarding is enabled
    fn target(&self) -> Option<&str>;

    /// Send the payload once; never retried
    async fn forward(&self, payload: &WebhookPayload) -> ForwardOutcome;

    fn is_configured(&self) -> bool {
        self.target().is_some()
    }
}
