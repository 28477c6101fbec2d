//! Health report for the `/api/health` endpoint

use serde::Serialize;
use std::time::Instant;
use tracing::debug;

use crate::config::Environment;

/// Service name reported by the health endpoint
pub const SERVICE_NAME: &str = "Perfect Clean API";

/// Status of the collaborators the API depends on
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HealthChecks {
    pub database: &'static str,
    pub webhook: &'static str,
    pub logs: &'static str,
}

/// Process memory figures in bytes
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MemoryUsage {
    pub rss: u64,
    pub virtual_size: u64,
}

/// Health response body
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub timestamp: String,
    pub service: &'static str,
    pub version: &'static str,
    /// Seconds since startup
    pub uptime: f64,
    pub memory: MemoryUsage,
    pub environment: Environment,
    pub checks: HealthChecks,
}

/// Builds health reports; cheap enough to run on every request
pub struct HealthChecker {
    start_time: Instant,
    environment: Environment,
    webhook_configured: bool,
}

impl HealthChecker {
    pub fn new(environment: Environment, webhook_configured: bool) -> Self {
        Self {
            start_time: Instant::now(),
            environment,
            webhook_configured,
        }
    }

    /// Seconds since the checker was created
    pub fn uptime_secs(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64()
    }

    /// Build a fresh report
    pub fn check_health(&self) -> HealthReport {
        debug!("Building health report");
        HealthReport {
            status: "ok",
            timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            service: SERVICE_NAME,
            version: env!("CARGO_PKG_VERSION"),
            uptime: self.uptime_secs(),
            memory: memory_usage(),
            environment: self.environment,
            checks: HealthChecks {
                // no database behind this service
                database: "ok",
                webhook: if self.webhook_configured { "configured" } else { "not_configured" },
                logs: "ok",
            },
        }
    }
}

/// Read resident and virtual memory from procfs; zeros elsewhere
fn memory_usage() -> MemoryUsage {
    let Ok(status) = std::fs::read_to_string("/proc/self/status") else {
        return MemoryUsage::default();
    };

    let field_bytes = |name: &str| -> u64 {
        status
            .lines()
            .find_map(|line| line.strip_prefix(name))
            .and_then(|rest| rest.split_whitespace().next())
            .and_then(|kb| kb.parse::<u64>().ok())
            .map(|kb| kb * 1024)
            .unwrap_or(0)
    };

    MemoryUsage {
        rss: field_bytes("VmRSS:"),
        virtual_size: field_bytes("VmSize:"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_report_shape() {
        let checker = HealthChecker::new(Environment::Test, false);
        let report = serde_json::to_value(checker.check_health()).unwrap();

        assert_eq!(report["status"], "ok");
        assert_eq!(report["service"], SERVICE_NAME);
        assert_eq!(report["environment"], "test");
        assert_eq!(report["checks"]["webhook"], "not_configured");
        assert_eq!(report["checks"]["database"], "ok");
        assert!(report["uptime"].as_f64().unwrap() >= 0.0);
        assert!(report["memory"].get("rss").is_some());
    }

    #[test]
    fn test_webhook_configured_flag() {
        let checker = HealthChecker::new(Environment::Production, true);
        assert_eq!(checker.check_health().checks.webhook, "configured");
    }
}
