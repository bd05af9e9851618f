//! Error handling module
//!
//! Provides unified error types and handling for the entire relay.
//!
//! Errors here surface through logs rather than HTTP responses: the webhook
//! always answers 200 (a non-2xx reply would only make the chat platform
//! redeliver the update), and the poll cycle recovers by skipping to the
//! next tick.

use thiserror::Error;

/// Application-wide error type
///
/// `Source` covers transient failures of the governance data source (epoch or
/// proposal fetch); the poll cycle skips and retries on the next tick.
/// `MalformedRecord` is per-record and never aborts a fetch batch.
/// `Delivery` is never escalated past the delivery engine. `Config` is fatal
/// at startup.
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Source error: {0}")]
    Source(String),

    #[error("Malformed proposal record: {0}")]
    MalformedRecord(String),

    #[error("Delivery error: {0}")]
    Delivery(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<std::io::Error> for RelayError {
    fn from(e: std::io::Error) -> Self {
        RelayError::Persistence(e.to_string())
    }
}

impl From<serde_json::Error> for RelayError {
    fn from(e: serde_json::Error) -> Self {
        RelayError::Persistence(e.to_string())
    }
}

/// Result type alias for relay operations
pub type RelayResult<T> = Result<T, RelayError>;

/// Helper function to create a transient source error
pub fn source_error(msg: impl Into<String>) -> RelayError {
    RelayError::Source(msg.into())
}

/// Helper function to create a malformed-record error
pub fn malformed_record(msg: impl Into<String>) -> RelayError {
    RelayError::MalformedRecord(msg.into())
}

/// Helper function to create a delivery error
pub fn delivery_error(msg: impl Into<String>) -> RelayError {
    RelayError::Delivery(msg.into())
}
