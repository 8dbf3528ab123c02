//! Shutdown manager: runs a set of servers and tears them down together.
//!
//! # Run
//! ```text
//! starting → running → shutting-down → drained
//!
//! serve tasks (one per server, shared group token)
//!     real error before cancellation → cancels the group, becomes the result
//!     anything else                  → logged, task completes cleanly
//!
//! first of: group finished | working token cancelled
//!     → stop()
//!     → result (bounded by shutdown_timeout + drain_slack after cancellation)
//! ```
//!
//! # Stop
//! ```text
//! per server, concurrently, against one fresh deadline:
//!     graceful_stop(deadline) ok in time → success
//!     error / deadline overrun          → force_stop() → force
//! aggregate: force if any server was forced
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Level;

use crate::config::ShutdownSettings;
use crate::lifecycle::classify::{default_classifier, is_normal_result, Classifier};
use crate::lifecycle::group::TaskGroup;
use crate::lifecycle::server::{display_name, Server, ServerError};
use crate::lifecycle::signals;
use crate::observability::logging::{LogSink, TracingLogger};
use crate::observability::metrics::{NoopMetrics, ShutdownMetrics, StopResult};

/// Default extra time granted to the final drain after cancellation.
pub const DEFAULT_DRAIN_SLACK: Duration = Duration::from_secs(2);

/// Stand-in deadline offset when `now + timeout` does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Errors returned by [`Manager::run`].
#[derive(Debug, Error)]
pub enum RunError {
    /// A server failed before any shutdown had begun.
    #[error("server '{server}' failed: {source}")]
    Serve {
        server: String,
        #[source]
        source: ServerError,
    },

    /// Servers did not finish draining after cancellation.
    #[error("servers did not drain within {timeout:?}")]
    DrainTimeout { timeout: Duration },
}

/// Runtime configuration of a [`Manager`].
#[derive(Clone)]
pub struct ManagerConfig {
    shutdown_timeout: Duration,
    handle_signals: bool,
    drain_slack: Duration,
    classifier: Classifier,
    logger: Arc<dyn LogSink>,
    metrics: Arc<dyn ShutdownMetrics>,
}

impl ManagerConfig {
    /// Configuration with the default classifier, tracing logger, no metrics
    /// and signal handling disabled.
    ///
    /// The tracing logger writes to stderr directly until a subscriber is
    /// installed (see [`init_tracing`](crate::observability::logging::init_tracing)).
    pub fn new(shutdown_timeout: Duration) -> Self {
        Self {
            shutdown_timeout,
            handle_signals: false,
            drain_slack: DEFAULT_DRAIN_SLACK,
            classifier: default_classifier(),
            logger: Arc::new(TracingLogger),
            metrics: Arc::new(NoopMetrics),
        }
    }

    pub fn from_settings(settings: &ShutdownSettings) -> Self {
        Self::new(settings.timeout())
            .with_signals(settings.handle_signals)
            .with_drain_slack(settings.drain_slack())
    }

    pub fn with_signals(mut self, enabled: bool) -> Self {
        self.handle_signals = enabled;
        self
    }

    pub fn with_drain_slack(mut self, slack: Duration) -> Self {
        self.drain_slack = slack;
        self
    }

    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn LogSink>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn ShutdownMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }

    pub fn handle_signals(&self) -> bool {
        self.handle_signals
    }

    pub fn drain_slack(&self) -> Duration {
        self.drain_slack
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self::from_settings(&ShutdownSettings::default())
    }
}

impl std::fmt::Debug for ManagerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagerConfig")
            .field("shutdown_timeout", &self.shutdown_timeout)
            .field("handle_signals", &self.handle_signals)
            .field("drain_slack", &self.drain_slack)
            .finish_non_exhaustive()
    }
}

/// Runs registered servers concurrently and stops them with a shared deadline.
pub struct Manager {
    config: ManagerConfig,
    servers: Vec<Arc<dyn Server>>,
    stopped: Mutex<bool>,
}

impl Manager {
    pub fn new(config: ManagerConfig) -> Self {
        Self {
            config,
            servers: Vec::new(),
            stopped: Mutex::new(false),
        }
    }

    /// Register a server. Only honoured before `run` / `stop`.
    pub fn add(&mut self, server: Arc<dyn Server>) {
        self.servers.push(server);
    }

    /// Number of registered servers.
    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Serve every server until cancellation or failure, then stop them all.
    ///
    /// Returns the first real serve failure that happened before shutdown
    /// began, or [`RunError::DrainTimeout`] if servers keep running past
    /// `shutdown_timeout + drain_slack` after cancellation.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<(), RunError> {
        // The guard cancels the signal-derived token on return so the listener exits.
        let (working, _signal_guard) = if self.config.handle_signals {
            let token = shutdown.child_token();
            signals::cancel_on_signal(token.clone());
            (token.clone(), Some(token.drop_guard()))
        } else {
            (shutdown, None)
        };

        let mut group = TaskGroup::new(&working);
        for server in &self.servers {
            let server = Arc::clone(server);
            let token = group.token();
            let classifier = Arc::clone(&self.config.classifier);
            let logger = Arc::clone(&self.config.logger);
            let metrics = Arc::clone(&self.config.metrics);

            group.spawn(async move {
                let name = display_name(Some(server.as_ref()));
                logger.log(Level::INFO, "serve start", &[("server", &name)]);

                let result = server.serve(token.clone()).await;
                let real = !is_normal_result(&classifier, &result) && !token.is_cancelled();
                match result {
                    Err(err) if real => {
                        logger.log(
                            Level::ERROR,
                            "serve failed",
                            &[("server", &name), ("error", &err)],
                        );
                        metrics.inc_serve_error(&name);
                        Err(RunError::Serve {
                            server: name,
                            source: err,
                        })
                    }
                    Err(err) => {
                        logger.log(
                            Level::INFO,
                            "serve stop",
                            &[("server", &name), ("error", &err)],
                        );
                        Ok(())
                    }
                    Ok(()) => {
                        logger.log(Level::INFO, "serve stop", &[("server", &name)]);
                        Ok(())
                    }
                }
            });
        }

        let mut done = tokio::spawn(group.wait());
        let logger = &self.config.logger;

        tokio::select! {
            joined = &mut done => {
                let result = flatten(joined);
                match &result {
                    Err(err) => logger.log(
                        Level::ERROR,
                        "server failed; starting graceful stop",
                        &[("error", err)],
                    ),
                    Ok(()) => logger.log(Level::INFO, "all servers finished; starting graceful stop", &[]),
                }
                self.stop().await;
                self.filter(result)
            }
            _ = working.cancelled() => {
                logger.log(Level::INFO, "context done; starting graceful stop", &[]);
                self.stop().await;

                let bound = self.config.shutdown_timeout.saturating_add(self.config.drain_slack);
                match tokio::time::timeout(bound, &mut done).await {
                    Ok(joined) => self.filter(flatten(joined)),
                    Err(_) => {
                        done.abort();
                        logger.log(
                            Level::ERROR,
                            "servers did not drain in time",
                            &[("timeout", &format!("{bound:?}"))],
                        );
                        Err(RunError::DrainTimeout { timeout: bound })
                    }
                }
            }
        }
    }

    /// Stop every server: graceful first, forced on error or deadline overrun.
    ///
    /// Only the first call does anything; later or concurrent calls return
    /// immediately.
    pub async fn stop(&self) {
        {
            let mut stopped = self.stopped.lock().unwrap_or_else(PoisonError::into_inner);
            if *stopped {
                return;
            }
            *stopped = true;
        }

        let started = Instant::now();
        let deadline = deadline_after(started, self.config.shutdown_timeout);
        let forced_any = Arc::new(AtomicBool::new(false));

        let mut tasks = JoinSet::new();
        for server in &self.servers {
            let server = Arc::clone(server);
            let logger = Arc::clone(&self.config.logger);
            let metrics = Arc::clone(&self.config.metrics);
            let forced_any = Arc::clone(&forced_any);

            tasks.spawn(async move {
                let name = display_name(Some(server.as_ref()));
                let graceful = tokio::time::timeout_at(deadline, server.graceful_stop(deadline))
                    .await
                    .unwrap_or_else(|_| Err(ServerError::message("graceful stop deadline exceeded")));

                let failure = match graceful {
                    Err(err) => Some(err.to_string()),
                    Ok(()) if Instant::now() >= deadline => {
                        Some("graceful stop finished after deadline".to_string())
                    }
                    Ok(()) => None,
                };

                let result = match failure {
                    Some(reason) => {
                        logger.log(
                            Level::WARN,
                            "graceful stop failed; forcing stop",
                            &[("server", &name), ("error", &reason)],
                        );
                        server.force_stop();
                        forced_any.store(true, Ordering::SeqCst);
                        StopResult::Force
                    }
                    None => {
                        logger.log(Level::INFO, "graceful stop done", &[("server", &name)]);
                        StopResult::Success
                    }
                };
                metrics.inc_server_stop_result(&name, result);
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(err) = joined {
                if err.is_panic() {
                    std::panic::resume_unwind(err.into_panic());
                }
            }
        }

        let elapsed = started.elapsed();
        let total = if forced_any.load(Ordering::SeqCst) {
            StopResult::Force
        } else {
            StopResult::Success
        };
        self.config.metrics.observe_graceful_duration(elapsed);
        self.config.metrics.inc_stop_total(total);
        self.config.logger.log(
            Level::INFO,
            "shutdown complete",
            &[("result", &total), ("elapsed_ms", &elapsed.as_millis())],
        );
    }

    /// Drop errors the classifier considers normal.
    fn filter(&self, result: Result<(), RunError>) -> Result<(), RunError> {
        match result {
            Err(RunError::Serve { source, .. }) if (self.config.classifier)(&source) => Ok(()),
            other => other,
        }
    }
}

/// `start + timeout`, clamped for timeouts too large to represent.
fn deadline_after(start: Instant, timeout: Duration) -> Instant {
    start
        .checked_add(timeout)
        .unwrap_or_else(|| start + FAR_FUTURE)
}

fn flatten(
    joined: Result<Result<(), RunError>, tokio::task::JoinError>,
) -> Result<(), RunError> {
    match joined {
        Ok(result) => result,
        Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
        Err(_) => Ok(()),
    }
}
