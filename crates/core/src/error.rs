use thiserror::Error;

/// Result type alias for tidsync-core
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types shared across the tidsync crates
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error for file operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Validation errors
    #[error("validation error: {0}")]
    Validation(String),

    /// Parse/serialization errors
    #[error("parse error: {0}")]
    Parse(String),
}

impl Error {
    /// Create a configuration error with a message
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a validation error with a message
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a parse error with a message
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }
}
