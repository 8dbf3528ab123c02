//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber for the binary
//! - Define the logging callback the manager reports to
//! - Provide the default tracing-backed callback
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - Log level configurable via config, overridden by `RUST_LOG`
//! - Output goes to stderr, directly when no subscriber is installed

use std::fmt;
use std::sync::Arc;

use tracing::subscriber::NoSubscriber;
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Key-value pairs attached to a log line.
pub type Fields<'a> = &'a [(&'a str, &'a dyn fmt::Display)];

/// Logging callback: `(level, message, fields)`.
pub trait LogSink: Send + Sync {
    fn log(&self, level: Level, message: &str, fields: Fields<'_>);
}

impl<F> LogSink for F
where
    F: Fn(Level, &str, Fields<'_>) + Send + Sync,
{
    fn log(&self, level: Level, message: &str, fields: Fields<'_>) {
        self(level, message, fields)
    }
}

/// Box a closure as a shared sink.
pub fn log_fn<F>(f: F) -> Arc<dyn LogSink>
where
    F: Fn(Level, &str, Fields<'_>) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Default sink, forwards to the `tracing` macros.
///
/// Without an installed subscriber the line is written straight to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl LogSink for TracingLogger {
    fn log(&self, level: Level, message: &str, fields: Fields<'_>) {
        let fields = render_fields(fields);
        if !subscriber_installed() {
            eprintln!("{}", fallback_line(level, message, &fields));
            return;
        }
        match level {
            Level::ERROR => tracing::error!(target: "shutdown", %fields, "{}", message),
            Level::WARN => tracing::warn!(target: "shutdown", %fields, "{}", message),
            Level::INFO => tracing::info!(target: "shutdown", %fields, "{}", message),
            Level::DEBUG => tracing::debug!(target: "shutdown", %fields, "{}", message),
            _ => tracing::trace!(target: "shutdown", %fields, "{}", message),
        }
    }
}

/// Whether a subscriber (global or scoped) receives events on this thread.
pub fn subscriber_installed() -> bool {
    tracing::dispatcher::get_default(|dispatch| !dispatch.is::<NoSubscriber>())
}

fn fallback_line(level: Level, message: &str, fields: &str) -> String {
    if fields.is_empty() {
        format!("{:>5} shutdown: {message}", level.as_str())
    } else {
        format!("{:>5} shutdown: {message} {fields}", level.as_str())
    }
}

/// Render fields as space separated `key=value` pairs.
pub fn render_fields(fields: Fields<'_>) -> String {
    let mut out = String::new();
    for (i, (key, value)) in fields.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(key);
        out.push('=');
        out.push_str(&value.to_string());
    }
    out
}

/// Install the global subscriber. `RUST_LOG` wins over `level`.
pub fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("shutdown_manager={level},shutdown={level},tower_http={level}").into()
    });

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();

    if installed.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}
