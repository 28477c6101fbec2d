//! The contact submission pipeline
//!
//! Stages run in a fixed order: sanitize, rate check, validate, forward,
//! record. Each gate returns [`ControlFlow`]: `Continue` hands its output to
//! the next stage, `Break` ends the pipeline with a [`Rejection`].

use chrono::Utc;
use serde_json::{json, Map, Value};
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use super::models::{ContactSubmission, WebhookPayload};
use crate::error::Result;
use crate::middleware::{ContactValidator, RateLimiter, Sanitizer, ValidationResult};
use crate::observability::{EventSink, LogEvent, RequestContext};
use crate::webhook::{ForwardOutcome, Forwarder};

/// Route the pipeline serves
pub const CONTACT_ROUTE: &str = "/api/contato";

/// Raw, untrusted submission as received
#[derive(Debug, Clone)]
pub struct InboundSubmission {
    pub body: Map<String, Value>,
    pub query: Map<String, Value>,
    pub request: RequestContext,
}

/// Submission after the sanitizer ran over body and query
#[derive(Debug, Clone)]
pub struct SanitizedSubmission {
    pub body: Map<String, Value>,
    pub query: Map<String, Value>,
    pub request: RequestContext,
}

/// Why a submission was turned away
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    RateLimited,
    Invalid(ValidationResult),
}

/// Final result of a pipeline run that did not fail unexpectedly
#[derive(Debug, Clone)]
pub enum Outcome {
    Accepted {
        payload: WebhookPayload,
        forwarding: ForwardOutcome,
    },
    Rejected(Rejection),
}

/// Ordered contact pipeline with its collaborators
pub struct ContactPipeline {
    limiter: Arc<RateLimiter>,
    forwarder: Arc<dyn Forwarder>,
    sink: Arc<dyn EventSink>,
    detached_forwarding: bool,
    slow_threshold: Duration,
}

impl ContactPipeline {
    pub fn new(
        limiter: Arc<RateLimiter>,
        forwarder: Arc<dyn Forwarder>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            limiter,
            forwarder,
            sink,
            detached_forwarding: false,
            slow_threshold: Duration::from_millis(500),
        }
    }

    /// Forward in a background task instead of awaiting it
    pub fn with_detached_forwarding(mut self, detached: bool) -> Self {
        self.detached_forwarding = detached;
        self
    }

    /// Duration above which an accepted submission logs a performance event
    pub fn with_slow_threshold(mut self, threshold: Duration) -> Self {
        self.slow_threshold = threshold;
        self
    }

    pub fn forwarder(&self) -> &Arc<dyn Forwarder> {
        &self.forwarder
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Run one submission through every stage
    pub async fn process(&self, inbound: InboundSubmission) -> Result<Outcome> {
        let start = Instant::now();

        let sanitized = Self::sanitize(inbound);

        let sanitized = match self.check_rate_limit(sanitized).await {
            ControlFlow::Continue(s) => s,
            ControlFlow::Break(rejection) => return Ok(Outcome::Rejected(rejection)),
        };

        let (submission, request) = match self.validate(sanitized)? {
            ControlFlow::Continue(valid) => valid,
            ControlFlow::Break(rejection) => return Ok(Outcome::Rejected(rejection)),
        };

        let payload = WebhookPayload::new(submission, &request, Utc::now());
        let forwarding = self.forward(&payload, &request).await;

        self.sink
            .record(LogEvent::contact(payload.record(), request.clone()));

        let elapsed = start.elapsed();
        if elapsed > self.slow_threshold {
            self.sink.record(LogEvent::performance(
                CONTACT_ROUTE,
                elapsed.as_millis() as u64,
                request,
            ));
        }

        Ok(Outcome::Accepted {
            payload,
            forwarding,
        })
    }

    /// Strip markup from body and query; applied to every submission
    fn sanitize(inbound: InboundSubmission) -> SanitizedSubmission {
        SanitizedSubmission {
            body: Sanitizer::sanitize_map(inbound.body),
            query: Sanitizer::sanitize_map(inbound.query),
            request: inbound.request,
        }
    }

    async fn check_rate_limit(
        &self,
        submission: SanitizedSubmission,
    ) -> ControlFlow<Rejection, SanitizedSubmission> {
        let request = &submission.request;
        match self.limiter.check_rate_limit(&request.ip).await {
            Ok(decision) => {
                if self.limiter.should_warn(&decision) {
                    let reset_time = Utc::now()
                        + chrono::Duration::from_std(decision.reset_after)
                            .unwrap_or_else(|_| chrono::Duration::zero());
                    self.sink.record(LogEvent::security(
                        "rate_limit_warning",
                        request.clone(),
                        json!({
                            "remaining": decision.remaining,
                            "total": decision.limit,
                            "resetTime": reset_time.to_rfc3339(),
                        }),
                    ));
                }
                ControlFlow::Continue(submission)
            }
            Err(e) => {
                self.sink.record(LogEvent::security(
                    "rate_limit_exceeded",
                    request.clone(),
                    json!({ "reason": e.to_string() }),
                ));
                ControlFlow::Break(Rejection::RateLimited)
            }
        }
    }

    fn validate(
        &self,
        submission: SanitizedSubmission,
    ) -> Result<ControlFlow<Rejection, (ContactSubmission, RequestContext)>> {
        let result = ContactValidator::validate(&submission.body);

        if !result.valid {
            self.sink.record(LogEvent::security(
                "invalid_form_data",
                submission.request,
                json!({ "errors": result.errors }),
            ));
            return Ok(ControlFlow::Break(Rejection::Invalid(result)));
        }

        let contact = ContactSubmission::from_fields(&submission.body)?;
        Ok(ControlFlow::Continue((contact, submission.request)))
    }

    async fn forward(&self, payload: &WebhookPayload, request: &RequestContext) -> ForwardOutcome {
        if !self.forwarder.is_configured() {
            debug!("Webhook not configured, skipping forwarding");
            return ForwardOutcome::NotConfigured;
        }

        if self.detached_forwarding {
            let forwarder = self.forwarder.clone();
            let sink = self.sink.clone();
            let payload = payload.clone();
            let request = request.clone();
            tokio::spawn(async move {
                let outcome = forwarder.forward(&payload).await;
                report_forwarding(&*forwarder, &*sink, &outcome, &payload, &request);
            });
            return ForwardOutcome::Scheduled;
        }

        let outcome = self.forwarder.forward(payload).await;
        report_forwarding(&*self.forwarder, &*self.sink, &outcome, payload, request);
        outcome
    }
}

/// Record the forwarding outcome; failures become error events
fn report_forwarding(
    forwarder: &dyn Forwarder,
    sink: &dyn EventSink,
    outcome: &ForwardOutcome,
    payload: &WebhookPayload,
    request: &RequestContext,
) {
    match outcome {
        ForwardOutcome::Delivered { status } => {
            sink.record(LogEvent::info(
                "webhook_success",
                Some(request.clone()),
                json!({
                    "status": status,
                    "nome": payload.nome,
                }),
            ));
        }
        ForwardOutcome::Failed { reason } => {
            sink.record(LogEvent::error(
                "WebhookError",
                reason.clone(),
                Some(request.clone()),
                json!({
                    "type": "webhook_error",
                    "url": forwarder.target(),
                    "nome": payload.nome,
                }),
            ));
        }
        ForwardOutcome::NotConfigured | ForwardOutcome::Scheduled => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::{RateLimitConfig, MSG_PHONE_REQUIRED, MSG_SERVICE_INVALID};
    use crate::observability::MemorySink;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Forwarder that records payloads and answers with a fixed outcome
    struct RecordingForwarder {
        outcome: ForwardOutcome,
        sent: Mutex<Vec<WebhookPayload>>,
    }

    impl RecordingForwarder {
        fn new(outcome: ForwardOutcome) -> Self {
            Self {
                outcome,
                sent: Mutex::new(Vec::new()),
            }
        }

        fn sent(&self) -> Vec<WebhookPayload> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Forwarder for RecordingForwarder {
        fn target(&self) -> Option<&str> {
            Some("http://automation.test/webhook")
        }

        async fn forward(&self, payload: &WebhookPayload) -> ForwardOutcome {
            self.sent.lock().unwrap().push(payload.clone());
            self.outcome.clone()
        }
    }

    fn request(ip: &str) -> RequestContext {
        RequestContext {
            method: "POST".into(),
            url: CONTACT_ROUTE.into(),
            ip: ip.into(),
            user_agent: Some("test".into()),
            referer: None,
        }
    }

    fn inbound(body: Value, ip: &str) -> InboundSubmission {
        InboundSubmission {
            body: body.as_object().cloned().unwrap_or_default(),
            query: Map::new(),
            request: request(ip),
        }
    }

    fn valid_body() -> Value {
        json!({
            "nome": "João Silva",
            "telefone": "(11) 99999-9999",
            "servico": "Limpeza de Sofás"
        })
    }

    fn pipeline(
        forwarder: Arc<RecordingForwarder>,
        sink: Arc<MemorySink>,
    ) -> ContactPipeline {
        ContactPipeline::new(
            Arc::new(RateLimiter::new(RateLimitConfig::default())),
            forwarder,
            sink,
        )
    }

    #[tokio::test]
    async fn test_accepted_submission_is_forwarded_and_logged() {
        let forwarder = Arc::new(RecordingForwarder::new(ForwardOutcome::Delivered { status: 200 }));
        let sink = Arc::new(MemorySink::new());
        let pipeline = pipeline(forwarder.clone(), sink.clone());

        let outcome = pipeline.process(inbound(valid_body(), "10.1.1.1")).await.unwrap();
        assert!(matches!(
            outcome,
            Outcome::Accepted { forwarding: ForwardOutcome::Delivered { status: 200 }, .. }
        ));

        let sent = forwarder.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].data, "Não informado");
        assert_eq!(sent[0].ip, "10.1.1.1");
        assert_eq!(sink.of_kind("contact").len(), 1);

        let info = sink.of_kind("info");
        assert_eq!(info.len(), 1);
        match &info[0] {
            LogEvent::Info { event, request, details, .. } => {
                assert_eq!(event, "webhook_success");
                assert_eq!(request.as_ref().map(|r| r.ip.as_str()), Some("10.1.1.1"));
                assert_eq!(details["status"], 200);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_markup_is_removed_before_forwarding() {
        let forwarder = Arc::new(RecordingForwarder::new(ForwardOutcome::Delivered { status: 200 }));
        let sink = Arc::new(MemorySink::new());
        let pipeline = pipeline(forwarder.clone(), sink.clone());

        let mut body = valid_body();
        body["nome"] = json!("<script>alert(1)</script>João");
        body["data"] = json!("<b>amanhã</b>");

        pipeline.process(inbound(body, "10.1.1.2")).await.unwrap();

        let sent = forwarder.sent();
        assert_eq!(sent[0].nome, "João");
        assert_eq!(sent[0].data, "amanhã");
        match &sink.of_kind("contact")[0] {
            LogEvent::Contact { data, .. } => assert_eq!(data.nome, "João"),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_submission_is_not_forwarded() {
        let forwarder = Arc::new(RecordingForwarder::new(ForwardOutcome::Delivered { status: 200 }));
        let sink = Arc::new(MemorySink::new());
        let pipeline = pipeline(forwarder.clone(), sink.clone());

        let outcome = pipeline
            .process(inbound(json!({"nome": "João"}), "10.1.1.3"))
            .await
            .unwrap();

        match outcome {
            Outcome::Rejected(Rejection::Invalid(result)) => {
                assert_eq!(result.errors, vec![MSG_PHONE_REQUIRED, MSG_SERVICE_INVALID]);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(forwarder.sent().is_empty());
        assert!(sink.of_kind("contact").is_empty());
        assert_eq!(sink.security_events(), vec!["invalid_form_data"]);
    }

    #[tokio::test]
    async fn test_rate_limit_runs_before_validation() {
        let forwarder = Arc::new(RecordingForwarder::new(ForwardOutcome::Delivered { status: 200 }));
        let sink = Arc::new(MemorySink::new());
        let pipeline = pipeline(forwarder.clone(), sink.clone());

        for _ in 0..5 {
            pipeline.process(inbound(json!({}), "10.1.1.4")).await.unwrap();
        }

        let outcome = pipeline.process(inbound(valid_body(), "10.1.1.4")).await.unwrap();
        assert!(matches!(outcome, Outcome::Rejected(Rejection::RateLimited)));
        assert!(forwarder.sent().is_empty());

        let security = sink.security_events();
        assert_eq!(security.last().map(String::as_str), Some("rate_limit_exceeded"));
        assert_eq!(
            security.iter().filter(|e| *e == "rate_limit_warning").count(),
            2
        );
    }

    #[tokio::test]
    async fn test_forwarding_failure_still_accepts() {
        let forwarder = Arc::new(RecordingForwarder::new(ForwardOutcome::Failed {
            reason: "Request timed out after 10000 ms".into(),
        }));
        let sink = Arc::new(MemorySink::new());
        let pipeline = pipeline(forwarder.clone(), sink.clone());

        let outcome = pipeline.process(inbound(valid_body(), "10.1.1.5")).await.unwrap();
        assert!(matches!(outcome, Outcome::Accepted { .. }));

        match &sink.of_kind("error")[0] {
            LogEvent::Error { message, context, .. } => {
                assert!(message.contains("timed out"));
                assert_eq!(context["url"], "http://automation.test/webhook");
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(sink.of_kind("contact").len(), 1);
    }

    #[tokio::test]
    async fn test_detached_forwarding_is_scheduled() {
        let forwarder = Arc::new(RecordingForwarder::new(ForwardOutcome::Delivered { status: 204 }));
        let sink = Arc::new(MemorySink::new());
        let pipeline = pipeline(forwarder.clone(), sink.clone()).with_detached_forwarding(true);

        let outcome = pipeline.process(inbound(valid_body(), "10.1.1.6")).await.unwrap();
        assert!(matches!(
            outcome,
            Outcome::Accepted { forwarding: ForwardOutcome::Scheduled, .. }
        ));

        for _ in 0..50 {
            if !forwarder.sent().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(forwarder.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_query_is_sanitized() {
        let mut submission = inbound(valid_body(), "10.1.1.7");
        submission
            .query
            .insert("utm".into(), json!("<script>x</script>ads"));

        let sanitized = ContactPipeline::sanitize(submission);
        assert_eq!(sanitized.query["utm"], "ads");
    }
}
