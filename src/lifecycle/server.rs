//! The contract every managed server satisfies.
//!
//! # Responsibilities
//! - Define the serve / graceful stop / force stop lifecycle
//! - Define the error type servers report
//! - Resolve the display name used in logs and metric labels

use async_trait::async_trait;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Name used when a server has no usable name of its own.
pub const FALLBACK_NAME: &str = "server";

/// Errors reported by a managed server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The server was shut down and closed its listener.
    #[error("server closed")]
    Closed,

    /// I/O failure while serving or stopping.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Free-form failure.
    #[error("{0}")]
    Message(String),

    /// Any other error raised by the server implementation.
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl ServerError {
    /// Build a [`ServerError::Message`].
    pub fn message(msg: impl Into<String>) -> Self {
        Self::Message(msg.into())
    }

    /// Wrap an arbitrary error.
    pub fn other<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Other(Box::new(err))
    }
}

/// A unit of work run and stopped by the [`Manager`](crate::lifecycle::Manager).
#[async_trait]
pub trait Server: Send + Sync {
    /// Do useful work until failure or until `token` is cancelled.
    ///
    /// Must return promptly once `token` is cancelled.
    async fn serve(&self, token: CancellationToken) -> Result<(), ServerError>;

    /// Stop accepting new work and wait for in-flight work to finish.
    ///
    /// Returns an error if the work cannot finish before `deadline`.
    async fn graceful_stop(&self, deadline: Instant) -> Result<(), ServerError>;

    /// Terminate immediately. Must be idempotent and must not panic.
    fn force_stop(&self);

    /// Short identifier for logs and metric labels. May be empty.
    fn name(&self) -> &str;
}

/// Resolve the name a server is logged and reported under.
pub fn display_name(server: Option<&dyn Server>) -> String {
    match server {
        Some(server) if !server.name().is_empty() => server.name().to_string(),
        _ => FALLBACK_NAME.to_string(),
    }
}
