//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Manager run / stop produce:
//!     → logging.rs (LogSink callback, tracing by default)
//!     → metrics.rs (ShutdownMetrics sink, no-op by default)
//!
//! Consumers:
//!     → stderr via tracing-subscriber
//!     → Prometheus scrape endpoint (metrics-exporter-prometheus)
//! ```
//!
//! # Design Decisions
//! - Both sinks are injected through the manager configuration
//! - Metric labels always use the resolved server display name

pub mod logging;
pub mod metrics;

pub use self::logging::{log_fn, LogSink, TracingLogger};
pub use self::metrics::{NoopMetrics, PrometheusMetrics, ShutdownMetrics, StopResult};
