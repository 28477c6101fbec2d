//! Middleware components for request processing

pub mod body_limit;
pub mod client;
pub mod cors;
pub mod rate_limiter;
pub mod sanitizer;
pub mod security_headers;
pub mod static_cache;
pub mod validator;

pub use body_limit::{BodyLimitConfig, BodyLimiter};
pub use cors::cors_layer;
pub use rate_limiter::{
    InMemoryStore, RateLimitConfig, RateLimitDecision, RateLimitError, RateLimitStore, RateLimiter,
    RATE_LIMIT_MESSAGE,
};
pub use sanitizer::Sanitizer;
pub use security_headers::security_headers_middleware;
pub use static_cache::{cache_control_for, static_cache_middleware};
pub use validator::{
    ContactValidator, ValidationResult, MSG_NAME_LENGTH, MSG_NAME_LETTERS, MSG_NAME_REQUIRED,
    MSG_PHONE_FORMAT, MSG_PHONE_REQUIRED, MSG_SERVICE_INVALID, VALID_SERVICES,
};
