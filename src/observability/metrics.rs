//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define the sink the shutdown manager reports outcomes to
//! - Provide a Prometheus-backed sink on top of the `metrics` facade
//! - Install the Prometheus scrape endpoint
//!
//! # Metrics
//! - `shutdown_stop_total` (counter): stop executions by aggregate result
//! - `shutdown_graceful_duration_seconds` (histogram): teardown wall-clock time
//! - `shutdown_serve_errors_total` (counter): real serve failures by server
//! - `shutdown_server_stop_total` (counter): per-server stop outcome

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Outcome of stopping one server, or of a whole stop when aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StopResult {
    /// Finished gracefully within the deadline.
    Success,
    /// Had to be force-stopped.
    Force,
}

impl StopResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            StopResult::Success => "success",
            StopResult::Force => "force",
        }
    }
}

impl fmt::Display for StopResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sink for shutdown outcomes.
pub trait ShutdownMetrics: Send + Sync {
    /// Once per stop execution with the aggregate result.
    fn inc_stop_total(&self, result: StopResult);

    /// Once per stop execution with the total teardown time.
    fn observe_graceful_duration(&self, duration: Duration);

    /// Once per server whose serve failed with a real error.
    fn inc_serve_error(&self, server: &str);

    /// Once per server per stop execution.
    fn inc_server_stop_result(&self, server: &str, result: StopResult);
}

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl ShutdownMetrics for NoopMetrics {
    fn inc_stop_total(&self, _result: StopResult) {}
    fn observe_graceful_duration(&self, _duration: Duration) {}
    fn inc_serve_error(&self, _server: &str) {}
    fn inc_server_stop_result(&self, _server: &str, _result: StopResult) {}
}

/// Sink writing to the globally installed `metrics` recorder.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrometheusMetrics;

impl ShutdownMetrics for PrometheusMetrics {
    fn inc_stop_total(&self, result: StopResult) {
        metrics::counter!("shutdown_stop_total", "result" => result.as_str()).increment(1);
    }

    fn observe_graceful_duration(&self, duration: Duration) {
        metrics::histogram!("shutdown_graceful_duration_seconds").record(duration.as_secs_f64());
    }

    fn inc_serve_error(&self, server: &str) {
        metrics::counter!("shutdown_serve_errors_total", "server" => server.to_string())
            .increment(1);
    }

    fn inc_server_stop_result(&self, server: &str, result: StopResult) {
        metrics::counter!(
            "shutdown_server_stop_total",
            "server" => server.to_string(),
            "result" => result.as_str()
        )
        .increment(1);
    }
}

/// Install the Prometheus recorder and its HTTP scrape listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}
