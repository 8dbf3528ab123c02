//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses and log level
//! - Detect duplicate listener names
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::AppConfig;
use crate::lifecycle::server::FALLBACK_NAME;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener '{name}' has invalid bind address '{address}'")]
    BindAddress { name: String, address: String },

    #[error("duplicate listener name '{0}'")]
    DuplicateName(String),

    #[error("invalid metrics address '{0}'")]
    MetricsAddress(String),

    #[error("unknown log level '{0}'")]
    LogLevel(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let mut seen = HashSet::new();
    for listener in &config.http {
        let name = if listener.name.is_empty() {
            FALLBACK_NAME
        } else {
            listener.name.as_str()
        };

        if listener.bind_address.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::BindAddress {
                name: name.to_string(),
                address: listener.bind_address.clone(),
            });
        }
        if !seen.insert(name) {
            errors.push(ValidationError::DuplicateName(name.to_string()));
        }
    }

    let observability = &config.observability;
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            observability.metrics_address.clone(),
        ));
    }
    if !LOG_LEVELS.contains(&observability.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ValidationError::LogLevel(observability.log_level.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
