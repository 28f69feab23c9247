//! Error types for the CCR calendar Lambda functions.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while serving calendar data.
///
/// Wrong passwords and unsupported methods are ordinary responses, not errors.
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Transport error talking to the REST row API
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Error reported by the REST row API
    #[error("Store error {code}: {message}")]
    Store { code: String, message: String },

    /// AWS SDK error
    #[error("AWS error: {0}")]
    Aws(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
