//! Structured log events and the sinks that record them

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::sync::Mutex;
use tracing::{error, info, warn};

/// Request details attached to events
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    pub method: String,
    pub url: String,
    pub ip: String,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
}

/// Contact data as recorded in the contact log
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ContactRecord {
    pub nome: String,
    pub telefone: String,
    pub servico: String,
    pub data: String,
    pub horario: String,
}

/// One structured log event
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LogEvent {
    /// A finished HTTP request
    Request {
        request: RequestContext,
        status: u16,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    /// An accepted contact submission
    Contact {
        data: ContactRecord,
        request: RequestContext,
        timestamp: DateTime<Utc>,
    },
    /// Something worth a security review: invalid input, limits, probing
    Security {
        event: String,
        request: RequestContext,
        details: Value,
        timestamp: DateTime<Utc>,
    },
    /// A route that took longer than its threshold
    Performance {
        route: String,
        duration_ms: u64,
        request: RequestContext,
        timestamp: DateTime<Utc>,
    },
    /// A routine operational fact, such as a delivered webhook
    Info {
        event: String,
        request: Option<RequestContext>,
        details: Value,
        timestamp: DateTime<Utc>,
    },
    /// A failure, recovered or not
    Error {
        name: String,
        message: String,
        request: Option<RequestContext>,
        context: Value,
        timestamp: DateTime<Utc>,
    },
}

impl LogEvent {
    pub fn request(request: RequestContext, status: u16, duration_ms: u64) -> Self {
        LogEvent::Request {
            request,
            status,
            duration_ms,
            timestamp: Utc::now(),
        }
    }

    pub fn contact(data: ContactRecord, request: RequestContext) -> Self {
        LogEvent::Contact {
            data,
            request,
            timestamp: Utc::now(),
        }
    }

    pub fn security(event: impl Into<String>, request: RequestContext, details: Value) -> Self {
        LogEvent::Security {
            event: event.into(),
            request,
            details,
            timestamp: Utc::now(),
        }
    }

    pub fn performance(route: impl Into<String>, duration_ms: u64, request: RequestContext) -> Self {
        LogEvent::Performance {
            route: route.into(),
            duration_ms,
            request,
            timestamp: Utc::now(),
        }
    }

    pub fn info(event: impl Into<String>, request: Option<RequestContext>, details: Value) -> Self {
        LogEvent::Info {
            event: event.into(),
            request,
            details,
            timestamp: Utc::now(),
        }
    }

    pub fn error(
        name: impl Into<String>,
        message: impl Into<String>,
        request: Option<RequestContext>,
        context: Value,
    ) -> Self {
        LogEvent::Error {
            name: name.into(),
            message: message.into(),
            request,
            context,
            timestamp: Utc::now(),
        }
    }

    /// Event kind as it appears in the `type` field
    pub fn kind(&self) -> &'static str {
        match self {
            LogEvent::Request { .. } => "request",
            LogEvent::Contact { .. } => "contact",
            LogEvent::Security { .. } => "security",
            LogEvent::Performance { .. } => "performance",
            LogEvent::Info { .. } => "info",
            LogEvent::Error { .. } => "error",
        }
    }
}

/// Anything that durably records log events
pub trait EventSink: Send + Sync {
    fn record(&self, event: LogEvent);
}

/// Sink that writes events through `tracing`
///
/// Each event becomes one record whose `event` field holds the JSON form,
/// so the configured subscriber decides where and how it is stored.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, event: LogEvent) {
        let kind = event.kind();
        let payload = serde_json::to_string(&event).unwrap_or_else(|e| {
            format!("{{\"type\":\"{}\",\"serialization_error\":\"{}\"}}", kind, e)
        });

        match &event {
            LogEvent::Request { .. } => {
                info!(target: "perfect_clean::events", kind, event = %payload, "Request processed")
            }
            LogEvent::Contact { .. } => {
                info!(target: "perfect_clean::events", kind, event = %payload, "New contact received")
            }
            LogEvent::Performance { .. } => {
                info!(target: "perfect_clean::events", kind, event = %payload, "Performance metric")
            }
            LogEvent::Info { event: name, .. } => {
                info!(target: "perfect_clean::events", kind, name = %name, event = %payload, "Operational event")
            }
            LogEvent::Security { .. } => {
                warn!(target: "perfect_clean::events", kind, event = %payload, "Security event")
            }
            LogEvent::Error { .. } => {
                error!(target: "perfect_clean::events", kind, event = %payload, "Application error")
            }
        }
    }
}

/// Sink that keeps events in memory, for tests and diagnostics
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<LogEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every event recorded so far, in insertion order
    pub fn events(&self) -> Vec<LogEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Events of one kind
    pub fn of_kind(&self, kind: &str) -> Vec<LogEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.kind() == kind)
            .collect()
    }

    /// Names of the security events recorded so far
    pub fn security_events(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                LogEvent::Security { event, .. } => Some(event),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for MemorySink {
    fn record(&self, event: LogEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
