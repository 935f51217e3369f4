//! Error types for lazy sequences and event bridges
//!
//! Exhaustion is never an error: it is signalled by `None` from the pull.
//! Errors here cover misuse of the synchronous path and bridge teardown.

/// Main error type for pico-stream operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LazyListError {
    /// A synchronous pull was attempted on a sequence that only supports
    /// asynchronous pulling (a bridge, or an async predicate/transform).
    #[error("sequence can only be pulled asynchronously")]
    AsyncOnly,
    /// The event bridge has already released its subscriptions
    #[error("event bridge for '{0}' is already disposed")]
    Disposed(String),
    /// Configuration could not be parsed
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl From<serde_json::Error> for LazyListError {
    fn from(err: serde_json::Error) -> Self {
        LazyListError::InvalidConfiguration(err.to_string())
    }
}

/// Result type for pico-stream operations
pub type LazyListResult<T> = Result<T, LazyListError>;
