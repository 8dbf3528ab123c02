//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the shutdown manager binary.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Shutdown orchestration settings.
    pub shutdown: ShutdownSettings,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// HTTP listeners managed by the orchestrator.
    pub http: Vec<HttpListenerConfig>,
}

/// Shutdown orchestration settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ShutdownSettings {
    /// Deadline shared by every server's graceful stop, in milliseconds.
    /// Zero forces every server immediately.
    pub timeout_ms: u64,

    /// Listen for SIGINT / SIGTERM and treat them as cancellation.
    pub handle_signals: bool,

    /// Extra time granted to the final drain after cancellation, in milliseconds.
    pub drain_slack_ms: u64,
}

impl ShutdownSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn drain_slack(&self) -> Duration {
        Duration::from_millis(self.drain_slack_ms)
    }
}

impl Default for ShutdownSettings {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            handle_signals: true,
            drain_slack_ms: 2_000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// A single HTTP listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpListenerConfig {
    /// Name used in logs and metric labels.
    #[serde(default)]
    pub name: String,

    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout() -> u64 {
    30
}

impl HttpListenerConfig {
    pub fn new(name: impl Into<String>, bind_address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bind_address: bind_address.into(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}
