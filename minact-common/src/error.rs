//! Common error types for Minact

use thiserror::Error;

/// Common result type for Minact operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across Minact services
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Missing, expired or otherwise unusable credentials
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but not allowed to perform the operation
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Operation is not legal from the record's current state
    #[error("Precondition failed: {0}")]
    FailedPrecondition(String),

    /// Transcript extraction service failure or unparsable output
    #[error("Extractor error: {0}")]
    Extractor(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}
