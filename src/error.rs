// Error types for CertWire
//
// Structured error types using thiserror. Failures are classified where they
// occur and never cross subsystem boundaries: pollers retry on transient
// errors, the decoder drops single entries, the broker drops queued payloads.

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Main error type for CertWire operations
#[derive(Debug, Error)]
pub enum CtError {
    /// HTTP request completed with a non-success status
    #[error("HTTP error (status {status}): {details}")]
    HttpError { status: u16, details: String },

    /// Parsing error for upstream payloads (log list, STH, entries)
    #[error("Parse error: {message}")]
    ParseError { message: String },

    /// A CT leaf or chain could not be decoded
    #[error("Decode error: {message}")]
    DecodeError { message: String },

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {message}")]
    ConfigError { message: String },

    /// A stream endpoint refused a subscriber at its client cap
    #[error("Max clients reached")]
    MaxClientsReached,

    /// Operation timed out
    #[error("Operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    /// Reqwest HTTP client errors
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Generic I/O error
    #[error("I/O error: {source}")]
    IoError {
        #[from]
        source: io::Error,
    },

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl From<base64::DecodeError> for CtError {
    fn from(err: base64::DecodeError) -> Self {
        CtError::DecodeError {
            message: format!("Invalid base64: {}", err),
        }
    }
}

impl From<tokio::task::JoinError> for CtError {
    fn from(err: tokio::task::JoinError) -> Self {
        CtError::Other(format!("Task join error: {}", err))
    }
}
