//! Classification of serve errors into "normal" and "real".
//!
//! A normal error is the expected by-product of a clean shutdown: the closed
//! listener sentinel, a read on a socket that was closed under it, or a TLS
//! handshake cut short by the stop. Anything else is a real failure.

use std::sync::Arc;

use crate::lifecycle::server::ServerError;

/// Predicate deciding whether an error is expected at shutdown.
pub type Classifier = Arc<dyn Fn(&ServerError) -> bool + Send + Sync>;

const CLOSED_CONNECTION: &str = "use of closed network connection";
const ABORTED_HANDSHAKE: &str = "Server.Serve failed to complete security handshake";

/// Default classifier.
pub fn is_normal(err: &ServerError) -> bool {
    if matches!(err, ServerError::Closed) {
        return true;
    }
    let text = err.to_string();
    text.contains(CLOSED_CONNECTION) || text.contains(ABORTED_HANDSHAKE)
}

/// Classify an optional error; no error at all is normal.
pub fn is_normal_result(classifier: &Classifier, result: &Result<(), ServerError>) -> bool {
    match result {
        Ok(()) => true,
        Err(err) => classifier(err),
    }
}

/// The default classifier as a [`Classifier`] value.
pub fn default_classifier() -> Classifier {
    Arc::new(is_normal)
}
