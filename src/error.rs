//! Error handling for the pixelchain mining client
//!
//! Covers payload validation, hex parsing, digest scoring, and canvas server
//! communication with proper context and recovery information.

use thiserror::Error;

/// Result type alias for pixelchain mining operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the pixelchain mining client
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML configuration parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// A pixel request field exceeds its declared bit width
    #[error("Value out of range for {field}: {value} exceeds maximum {max}")]
    Range {
        field: &'static str,
        value: u64,
        max: u64,
    },

    /// Hex input with an odd number of characters
    #[error("Hex string has odd length {len}")]
    OddHexLength { len: usize },

    /// A non-hexadecimal character in hex input or a digest
    #[error("Invalid hexit '{ch}' at position {index}")]
    InvalidHexit { ch: char, index: usize },

    /// Canvas server returned an unexpected response
    #[error("Canvas server error: {message}")]
    Server { message: String },

    /// The pixel changed underneath the miner (HTTP 409)
    #[error("Pixel state conflict: {message}")]
    Conflict { message: String },

    /// The server rejected the submitted proof (HTTP 403)
    #[error("Submission rejected: {message}")]
    Rejected { message: String },

    /// Worker errors
    #[error("Worker error: {worker_type}: {message}")]
    Worker { worker_type: String, message: String },

    /// Cancellation errors for async operations
    #[error("Operation was cancelled: {operation}")]
    Cancelled { operation: String },
}

impl Error {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a range error for an out-of-bounds request field
    pub fn range(field: &'static str, value: u64, max: u64) -> Self {
        Self::Range { field, value, max }
    }

    /// Create a server error
    pub fn server(message: impl Into<String>) -> Self {
        Self::Server {
            message: message.into(),
        }
    }

    /// Create a conflict error
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Create a rejection error
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    /// Create a worker error
    pub fn worker(worker_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Worker {
            worker_type: worker_type.into(),
            message: message.into(),
        }
    }

    /// Create a cancellation error
    pub fn cancelled(operation: impl Into<String>) -> Self {
        Self::Cancelled {
            operation: operation.into(),
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(e) => {
                if let Some(status) = e.status() {
                    status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS
                } else {
                    // Network errors are typically retryable
                    e.is_timeout() || e.is_connect() || e.is_request()
                }
            }
            Error::Server { .. } => true,
            Error::Io(_) => true,
            // A 409 means the previous-block reference is stale; the caller
            // can refetch the pixel and mine again.
            Error::Conflict { .. } => true,
            _ => false,
        }
    }

    /// Get error category for metrics/logging
    pub fn category(&self) -> &'static str {
        match self {
            Error::Http(_) => "http",
            Error::Json(_) => "json",
            Error::Yaml(_) => "yaml",
            Error::Io(_) => "io",
            Error::Config { .. } => "config",
            Error::Range { .. } => "range",
            Error::OddHexLength { .. } => "hex",
            Error::InvalidHexit { .. } => "hex",
            Error::Server { .. } => "server",
            Error::Conflict { .. } => "conflict",
            Error::Rejected { .. } => "rejected",
            Error::Worker { .. } => "worker",
            Error::Cancelled { .. } => "cancelled",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_range_error_message() {
        let err = Error::range("x", 65536, 65535);
        assert_eq!(
            err.to_string(),
            "Value out of range for x: 65536 exceeds maximum 65535"
        );
        assert_eq!(err.category(), "range");
    }

    #[test]
    fn test_hexit_error_identifies_position() {
        let err = Error::InvalidHexit { ch: 'z', index: 3 };
        assert_eq!(err.to_string(), "Invalid hexit 'z' at position 3");
    }

    #[test]
    fn test_retryability() {
        assert!(Error::server("boom").is_retryable());
        assert!(Error::conflict("stale block").is_retryable());
        assert!(!Error::range("y", 70000, 65535).is_retryable());
        assert!(!Error::cancelled("mining").is_retryable());
        assert_matches!(Error::config("bad"), Error::Config { .. });
    }
}
