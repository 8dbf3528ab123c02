//! OS signal handling.
//!
//! # Responsibilities
//! - Wait for SIGINT / SIGTERM (Ctrl-C only on non-Unix targets)
//! - Translate a delivered signal into token cancellation
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - A failed SIGTERM registration degrades to Ctrl-C only

use tokio_util::sync::CancellationToken;

/// Wait until the process receives an interrupt or termination signal.
pub async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let term_signal = match signal(SignalKind::terminate()) {
            Ok(sig) => Some(sig),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Failed to install SIGTERM handler, only Ctrl+C will trigger shutdown"
                );
                None
            }
        };

        tokio::select! {
            _ = ctrl_c() => {},
            _ = async {
                match term_signal {
                    Some(mut sig) => { sig.recv().await; }
                    None => std::future::pending::<()>().await,
                }
            } => {},
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c().await;
    }
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}

/// Cancel `token` when a shutdown signal arrives.
///
/// The listener exits on its own once `token` is cancelled by anything else.
pub fn cancel_on_signal(token: CancellationToken) {
    tokio::spawn(async move {
        tokio::select! {
            _ = wait_for_shutdown_signal() => {
                tracing::info!("Shutdown signal received");
                token.cancel();
            }
            _ = token.cancelled() => {}
        }
    });
}
