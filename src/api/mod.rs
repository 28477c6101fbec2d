//! HTTP API for the contact form

pub mod handlers;
pub mod routes;

pub use handlers::{AppState, ClientContext, ContactBody};
pub use routes::{build_router, HEALTH_ROUTE};
