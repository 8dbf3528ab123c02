//! Coordinated graceful shutdown for groups of network servers.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::AppConfig;
pub use http::HttpServer;
pub use lifecycle::{Manager, ManagerConfig, RunError, Server, ServerError};
