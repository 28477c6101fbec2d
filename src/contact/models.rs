//! Contact submission data models

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AppError, Result};
use crate::observability::{ContactRecord, RequestContext};

/// Placeholder for optional fields the client left blank
pub const NOT_PROVIDED: &str = "Não informado";

/// A validated contact form submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactSubmission {
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "telefone")]
    pub phone: String,
    #[serde(rename = "servico")]
    pub service: String,
    #[serde(rename = "data", default)]
    pub date: Option<String>,
    #[serde(rename = "horario", default)]
    pub time: Option<String>,
}

impl ContactSubmission {
    /// Build a submission from sanitized fields that already passed validation
    pub fn from_fields(fields: &Map<String, Value>) -> Result<Self> {
        let required = |key: &str| -> Result<String> {
            fields
                .get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| AppError::Internal(format!("validated submission lacks '{}'", key)))
        };
        let optional = |key: &str| {
            fields
                .get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        Ok(Self {
            name: required("nome")?,
            phone: required("telefone")?,
            service: required("servico")?,
            date: optional("data"),
            time: optional("horario"),
        })
    }

    pub fn date_or_default(&self) -> &str {
        self.date.as_deref().unwrap_or(NOT_PROVIDED)
    }

    pub fn time_or_default(&self) -> &str {
        self.time.as_deref().unwrap_or(NOT_PROVIDED)
    }
}

/// Body posted to the automation webhook
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload {
    pub nome: String,
    pub telefone: String,
    pub servico: String,
    pub data: String,
    pub horario: String,
    pub data_envio: String,
    pub ip: String,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
}

impl WebhookPayload {
    pub fn new(submission: ContactSubmission, request: &RequestContext, sent_at: DateTime<Utc>) -> Self {
        Self {
            data: submission.date_or_default().to_string(),
            horario: submission.time_or_default().to_string(),
            nome: submission.name,
            telefone: submission.phone,
            servico: submission.service,
            data_envio: sent_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            ip: request.ip.clone(),
            user_agent: request.user_agent.clone(),
            referer: request.referer.clone(),
        }
    }

    /// Form data as recorded in the contact log
    pub fn record(&self) -> ContactRecord {
        ContactRecord {
            nome: self.nome.clone(),
            telefone: self.telefone.clone(),
            servico: self.servico.clone(),
            data: self.data.clone(),
            horario: self.horario.clone(),
        }
    }
}
