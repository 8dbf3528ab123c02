//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Run (manager.rs):
//!     Register servers → Serve concurrently (group.rs) → Trigger → Stop
//!
//! Triggers:
//!     Caller cancels token | SIGTERM/SIGINT (signals.rs) | server fails | all servers exit
//!
//! Stop (manager.rs):
//!     Fresh deadline → Graceful stop per server → Force stop on error/overrun → Metrics
//!
//! Classification (classify.rs):
//!     Serve error → normal (shutdown artifact) | real (surfaced from run)
//! ```
//!
//! # Design Decisions
//! - Serve cancellation and the stop deadline are independent scopes
//! - Stop executes at most once per manager
//! - A failing graceful stop never fails the caller; it escalates to force stop

pub mod classify;
pub mod group;
pub mod manager;
pub mod server;
pub mod signals;

pub use classify::{default_classifier, is_normal, Classifier};
pub use group::TaskGroup;
pub use manager::{Manager, ManagerConfig, RunError};
pub use server::{display_name, Server, ServerError};
