//! Error types for the request limiter.

use thiserror::Error;

/// Main error type for request limiter operations.
///
/// Admission denials are not errors at this level; they are reported as
/// [`crate::ratelimit::Decision::Denied`] values.
#[derive(Error, Debug)]
pub enum LimiterError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Layered configuration sources (files, environment)
    #[error("Configuration source error: {0}")]
    ConfigSource(#[from] config::ConfigError),

    /// JSON encoding or decoding errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for request limiter operations.
pub type Result<T> = std::result::Result<T, LimiterError>;
