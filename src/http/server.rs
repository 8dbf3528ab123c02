//! HTTP server adapter for the shutdown manager.
//!
//! # Responsibilities
//! - Bind a TCP listener for an Axum router
//! - Wire up middleware (tracing, request timeout)
//! - Implement the serve / graceful stop / force stop lifecycle

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use axum::{routing::get, Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::HttpListenerConfig;
use crate::lifecycle::{Server, ServerError};

/// An Axum server managed by the shutdown manager.
pub struct HttpServer {
    name: String,
    local_addr: SocketAddr,
    router: Router,
    /// Taken by the first `serve`.
    listener: Mutex<Option<TcpListener>>,
    started: AtomicBool,
    /// Cancelled to begin a graceful shutdown.
    graceful: CancellationToken,
    /// Cancelled to abandon the serve loop.
    force: CancellationToken,
    /// Flips to true once `serve` has returned.
    done: watch::Sender<bool>,
}

impl HttpServer {
    /// Bind the configured address and attach middleware to `router`.
    #[allow(deprecated)]
    pub async fn bind(config: &HttpListenerConfig, router: Router) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(&config.bind_address).await?;
        let local_addr = listener.local_addr()?;

        tracing::info!(
            server = %config.name,
            address = %local_addr,
            "HTTP listener bound"
        );

        let router = router
            .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
            .layer(TraceLayer::new_for_http());

        let (done, _) = watch::channel(false);
        Ok(Self {
            name: config.name.clone(),
            local_addr,
            router,
            listener: Mutex::new(Some(listener)),
            started: AtomicBool::new(false),
            graceful: CancellationToken::new(),
            force: CancellationToken::new(),
            done,
        })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    fn take_listener(&self) -> Option<TcpListener> {
        self.listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    fn stop_requested(&self) -> bool {
        self.graceful.is_cancelled() || self.force.is_cancelled()
    }
}

#[async_trait]
impl Server for HttpServer {
    async fn serve(&self, token: CancellationToken) -> Result<(), ServerError> {
        // `started` flips under the listener lock so `graceful_stop` never sees
        // an empty slot with `started == false`.
        let listener = {
            let mut slot = self.listener.lock().unwrap_or_else(PoisonError::into_inner);
            match slot.take() {
                Some(listener) => {
                    self.started.store(true, Ordering::SeqCst);
                    listener
                }
                None if self.stop_requested() => return Err(ServerError::Closed),
                None => return Err(ServerError::message("listener already in use")),
            }
        };

        let graceful = self.graceful.clone();
        let shutdown = async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = graceful.cancelled() => {}
            }
        };

        tracing::info!(server = %self.name, address = %self.local_addr, "HTTP server starting");
        let serving = axum::serve(listener, self.router.clone())
            .with_graceful_shutdown(shutdown)
            .into_future();

        // Dropping the serve future on force stop closes the listener; connections
        // already accepted finish on their own tasks.
        let result = tokio::select! {
            result = serving => result,
            _ = self.force.cancelled() => Ok(()),
        };
        self.done.send_replace(true);

        tracing::info!(server = %self.name, "HTTP server stopped");
        result?;
        Err(ServerError::Closed)
    }

    async fn graceful_stop(&self, deadline: Instant) -> Result<(), ServerError> {
        self.graceful.cancel();

        let idle = {
            let mut slot = self.listener.lock().unwrap_or_else(PoisonError::into_inner);
            let idle = !self.started.load(Ordering::SeqCst);
            if idle {
                drop(slot.take());
            }
            idle
        };
        if idle {
            return Ok(());
        }

        let mut done = self.done.subscribe();
        let finished = tokio::time::timeout_at(deadline, async move {
            done.wait_for(|finished| *finished).await.map(|_| ())
        })
        .await;

        match finished {
            Ok(_) => Ok(()),
            Err(_) => Err(ServerError::message("HTTP graceful shutdown timed out")),
        }
    }

    fn force_stop(&self) {
        self.force.cancel();
        self.graceful.cancel();
        drop(self.take_listener());
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Serialize)]
pub struct Status {
    pub name: String,
    pub version: &'static str,
}

/// Router answering `GET /` and `GET /status`.
pub fn status_router(name: &str) -> Router {
    let name = name.to_string();
    Router::new().route("/", get(|| async { "ok" })).route(
        "/status",
        get(move || {
            let name = name.clone();
            async move {
                Json(Status {
                    name,
                    version: env!("CARGO_PKG_VERSION"),
                })
            }
        }),
    )
}
