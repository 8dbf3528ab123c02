//! HTTP adapter subsystem.
//!
//! # Data Flow
//! ```text
//! HttpListenerConfig
//!     → server.rs (bind listener, attach middleware)
//!     → HttpServer (implements lifecycle::Server)
//!     → registered with lifecycle::Manager
//! ```
//!
//! # Design Decisions
//! - Graceful stop uses axum's graceful shutdown (stop accepting, finish in-flight)
//! - Force stop drops the serve loop without waiting
//! - A stopped server reports `ServerError::Closed`, which classifies as normal

pub mod server;

pub use server::{status_router, HttpServer};
