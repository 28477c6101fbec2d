//! Per-client submission rate limiting
//!
//! Window state lives behind [`RateLimitStore`] so the in-memory map can be
//! replaced by a shared cache when several instances run side by side.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::config::RateLimitSettings;

/// Rejection message shown to clients
pub const RATE_LIMIT_MESSAGE: &str = "Muitas tentativas. Tente novamente em 15 minutos.";

/// Rate limit configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum accepted attempts per window
    pub max_requests: usize,
    /// Time window duration
    pub window_duration: Duration,
    /// Whether to enable rate limiting
    pub enabled: bool,
    /// Remaining-attempt threshold under which a warning is logged
    pub warn_below: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 5,
            window_duration: Duration::from_secs(15 * 60),
            enabled: true,
            warn_below: 2,
        }
    }
}

impl From<&RateLimitSettings> for RateLimitConfig {
    fn from(settings: &RateLimitSettings) -> Self {
        Self {
            max_requests: settings.max_requests,
            window_duration: Duration::from_secs(settings.window_secs),
            enabled: settings.enabled,
            warn_below: settings.warn_below,
        }
    }
}

/// Window state after an attempt was recorded (or refused)
#[derive(Debug, Clone, Copy)]
pub struct WindowState {
    /// Whether the attempt was counted
    pub admitted: bool,
    /// Attempts counted in the current window
    pub count: usize,
    /// When the current window started
    pub window_start: Instant,
}

/// Storage for per-client window counters
///
/// `acquire` must be atomic per key: two concurrent attempts for the same
/// client must never both observe the same count.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Count one attempt for `key` unless the window is already full
    async fn acquire(&self, key: &str, limit: usize, window: Duration, now: Instant) -> WindowState;

    /// Drop windows that ended before `now`
    async fn cleanup_expired(&self, window: Duration, now: Instant);

    /// Number of clients currently tracked
    async fn tracked_clients(&self) -> usize;
}

/// Request record for tracking
#[derive(Debug, Clone)]
struct RequestRecord {
    count: usize,
    window_start: Instant,
}

/// In-process store backed by a sharded map
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: DashMap<String, RequestRecord>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RateLimitStore for InMemoryStore {
    async fn acquire(&self, key: &str, limit: usize, window: Duration, now: Instant) -> WindowState {
        // the entry guard holds the shard lock for the whole read-modify-write
        let mut entry = self.records.entry(key.to_string()).or_insert(RequestRecord {
            count: 0,
            window_start: now,
        });
        let record = entry.value_mut();

        if now.saturating_duration_since(record.window_start) >= window {
            record.count = 0;
            record.window_start = now;
        }

        let admitted = record.count < limit;
        if admitted {
            record.count += 1;
        }

        WindowState {
            admitted,
            count: record.count,
            window_start: record.window_start,
        }
    }

    async fn cleanup_expired(&self, window: Duration, now: Instant) {
        self.records
            .retain(|_, record| now.saturating_duration_since(record.window_start) < window);
    }

    async fn tracked_clients(&self) -> usize {
        self.records.len()
    }
}

/// Admission details for an accepted attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub limit: usize,
    pub remaining: usize,
    pub reset_after: Duration,
}

impl RateLimitDecision {
    /// Unlimited decision used when limiting is disabled
    fn unlimited() -> Self {
        Self {
            limit: usize::MAX,
            remaining: usize::MAX,
            reset_after: Duration::ZERO,
        }
    }
}

/// Sliding-window rate limiter keyed by client IP
pub struct RateLimiter {
    config: RateLimitConfig,
    store: Arc<dyn RateLimitStore>,
}

impl RateLimiter {
    /// Create a new rate limiter with an in-memory store
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_store(config, Arc::new(InMemoryStore::new()))
    }

    /// Create a rate limiter over a custom store
    pub fn with_store(config: RateLimitConfig, store: Arc<dyn RateLimitStore>) -> Self {
        Self { config, store }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Whether a decision should raise the advisory warning
    pub fn should_warn(&self, decision: &RateLimitDecision) -> bool {
        self.config.enabled && decision.remaining < self.config.warn_below
    }

    /// Check and count an attempt for `client_id`
    pub async fn check_rate_limit(&self, client_id: &str) -> Result<RateLimitDecision, RateLimitError> {
        self.check_rate_limit_at(client_id, Instant::now()).await
    }

    /// Same as [`check_rate_limit`](Self::check_rate_limit) with an explicit clock reading
    pub async fn check_rate_limit_at(
        &self,
        client_id: &str,
        now: Instant,
    ) -> Result<RateLimitDecision, RateLimitError> {
        if !self.config.enabled {
            return Ok(RateLimitDecision::unlimited());
        }

        let state = self
            .store
            .acquire(client_id, self.config.max_requests, self.config.window_duration, now)
            .await;

        let reset_after = self
            .config
            .window_duration
            .saturating_sub(now.saturating_duration_since(state.window_start));

        if !state.admitted {
            warn!(
                "Rate limit exceeded for client: {} ({} requests in window)",
                client_id, state.count
            );
            return Err(RateLimitError::LimitExceeded {
                retry_after: reset_after,
                limit: self.config.max_requests,
            });
        }

        debug!(
            "Request allowed for client: {} ({}/{})",
            client_id, state.count, self.config.max_requests
        );

        Ok(RateLimitDecision {
            limit: self.config.max_requests,
            remaining: self.config.max_requests.saturating_sub(state.count),
            reset_after,
        })
    }

    /// Clean up expired records
    pub async fn cleanup_expired(&self) {
        self.store
            .cleanup_expired(self.config.window_duration, Instant::now())
            .await;
        debug!("Cleaned up expired rate limit records");
    }

    /// Start background cleanup task
    ///
    /// Returns `None` when limiting is disabled or the window is zero, since
    /// nothing is stored and the interval would have no period.
    pub fn start_cleanup_task(self: Arc<Self>) -> Option<tokio::task::JoinHandle<()>> {
        if !self.config.enabled || self.config.window_duration.is_zero() {
            debug!("Rate limiting disabled, no cleanup task started");
            return None;
        }

        Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.config.window_duration);
            loop {
                interval.tick().await;
                self.cleanup_expired().await;
            }
        }))
    }

    /// Get statistics
    pub async fn stats(&self) -> RateLimitStats {
        RateLimitStats {
            tracked_clients: self.store.tracked_clients().await,
            config: self.config.clone(),
        }
    }
}

/// Rate limit error
#[derive(Debug, Clone, thiserror::Error)]
pub enum RateLimitError {
    #[error("Rate limit exceeded. Retry after {retry_after:?}. Limit: {limit} requests per window")]
    LimitExceeded {
        retry_after: Duration,
        limit: usize,
    },
}

/// Rate limit statistics
#[derive(Debug, Clone)]
pub struct RateLimitStats {
    pub tracked_clients: usize,
    pub config: RateLimitConfig,
}
