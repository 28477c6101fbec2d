//! Contact submissions and the pipeline that handles them

pub mod models;
pub mod pipeline;

pub use models::{ContactSubmission, WebhookPayload, NOT_PROVIDED};
pub use pipeline::{
    ContactPipeline, InboundSubmission, Outcome, Rejection, SanitizedSubmission, CONTACT_ROUTE,
};
