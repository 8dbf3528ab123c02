//! Shared test doubles for the manager integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use shutdown_manager::lifecycle::{Server, ServerError};
use shutdown_manager::observability::logging::{render_fields, Fields, LogSink};
use shutdown_manager::observability::{ShutdownMetrics, StopResult};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Level;

/// How a mock server's `serve` behaves.
#[derive(Clone)]
pub enum Serve {
    /// Wait for cancellation, take `drain` to wind down, then return `error` if set.
    UntilCancelled {
        drain: Duration,
        error: Option<String>,
    },
    /// Fail with `error` after `delay`, regardless of cancellation.
    FailAfter { delay: Duration, error: String },
    /// Return the closed-server sentinel after `delay`.
    CloseAfter { delay: Duration },
    /// Never return.
    Hang,
}

/// A programmable server.
pub struct MockServer {
    name: String,
    serve: Serve,
    graceful_delay: Duration,
    graceful_error: Option<String>,
    pub graceful_calls: AtomicUsize,
    pub graceful_completed: AtomicBool,
    pub force_calls: AtomicUsize,
}

impl MockServer {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            serve: Serve::UntilCancelled {
                drain: Duration::ZERO,
                error: None,
            },
            graceful_delay: Duration::ZERO,
            graceful_error: None,
            graceful_calls: AtomicUsize::new(0),
            graceful_completed: AtomicBool::new(false),
            force_calls: AtomicUsize::new(0),
        }
    }

    pub fn serving(mut self, serve: Serve) -> Self {
        self.serve = serve;
        self
    }

    pub fn fail_after(self, delay_ms: u64, error: &str) -> Self {
        self.serving(Serve::FailAfter {
            delay: Duration::from_millis(delay_ms),
            error: error.to_string(),
        })
    }

    pub fn drain(self, drain_ms: u64, error: Option<&str>) -> Self {
        self.serving(Serve::UntilCancelled {
            drain: Duration::from_millis(drain_ms),
            error: error.map(str::to_string),
        })
    }

    pub fn graceful_delay(mut self, delay_ms: u64) -> Self {
        self.graceful_delay = Duration::from_millis(delay_ms);
        self
    }

    pub fn graceful_error(mut self, error: &str) -> Self {
        self.graceful_error = Some(error.to_string());
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn graceful_calls(&self) -> usize {
        self.graceful_calls.load(Ordering::SeqCst)
    }

    pub fn force_calls(&self) -> usize {
        self.force_calls.load(Ordering::SeqCst)
    }

    pub fn graceful_completed(&self) -> bool {
        self.graceful_completed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Server for MockServer {
    async fn serve(&self, token: CancellationToken) -> Result<(), ServerError> {
        match &self.serve {
            Serve::UntilCancelled { drain, error } => {
                token.cancelled().await;
                tokio::time::sleep(*drain).await;
                match error {
                    Some(error) => Err(ServerError::message(error.clone())),
                    None => Ok(()),
                }
            }
            Serve::FailAfter { delay, error } => {
                tokio::time::sleep(*delay).await;
                Err(ServerError::message(error.clone()))
            }
            Serve::CloseAfter { delay } => {
                tokio::time::sleep(*delay).await;
                Err(ServerError::Closed)
            }
            Serve::Hang => std::future::pending().await,
        }
    }

    async fn graceful_stop(&self, _deadline: Instant) -> Result<(), ServerError> {
        self.graceful_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.graceful_delay).await;
        self.graceful_completed.store(true, Ordering::SeqCst);
        match &self.graceful_error {
            Some(error) => Err(ServerError::message(error.clone())),
            None => Ok(()),
        }
    }

    fn force_stop(&self) {
        self.force_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// A metric emission.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    StopTotal(StopResult),
    GracefulDuration(Duration),
    ServeError(String),
    ServerStop(String, StopResult),
}

/// Metrics sink that records every call.
#[derive(Default)]
pub struct RecordingMetrics {
    events: Mutex<Vec<Event>>,
}

impl RecordingMetrics {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn stop_totals(&self) -> Vec<StopResult> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::StopTotal(result) => Some(result),
                _ => None,
            })
            .collect()
    }

    pub fn durations(&self) -> Vec<Duration> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::GracefulDuration(d) => Some(d),
                _ => None,
            })
            .collect()
    }

    pub fn serve_errors(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::ServeError(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    /// Per-server stop results, sorted by server name.
    pub fn server_results(&self) -> Vec<(String, StopResult)> {
        let mut results: Vec<_> = self
            .events()
            .into_iter()
            .filter_map(|e| match e {
                Event::ServerStop(name, result) => Some((name, result)),
                _ => None,
            })
            .collect();
        results.sort_by(|a, b| a.0.cmp(&b.0));
        results
    }

    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

impl ShutdownMetrics for RecordingMetrics {
    fn inc_stop_total(&self, result: StopResult) {
        self.push(Event::StopTotal(result));
    }

    fn observe_graceful_duration(&self, duration: Duration) {
        self.push(Event::GracefulDuration(duration));
    }

    fn inc_serve_error(&self, server: &str) {
        self.push(Event::ServeError(server.to_string()));
    }

    fn inc_server_stop_result(&self, server: &str, result: StopResult) {
        self.push(Event::ServerStop(server.to_string(), result));
    }
}

/// Log sink that keeps `(level, message, rendered fields)`.
#[derive(Default)]
pub struct RecordingLogger {
    lines: Mutex<Vec<(Level, String, String)>>,
}

impl RecordingLogger {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn lines(&self) -> Vec<(Level, String, String)> {
        self.lines.lock().unwrap().clone()
    }

    pub fn contains(&self, level: Level, message: &str) -> bool {
        self.lines()
            .iter()
            .any(|(l, m, _)| *l == level && m == message)
    }
}

impl LogSink for RecordingLogger {
    fn log(&self, level: Level, message: &str, fields: Fields<'_>) {
        self.lines
            .lock()
            .unwrap()
            .push((level, message.to_string(), render_fields(fields)));
    }
}
