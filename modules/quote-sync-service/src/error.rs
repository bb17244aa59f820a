//! Error types for the quote sync service.

use thiserror::Error;

/// All errors the store, gateway and sync engine can produce.
#[derive(Debug, Error)]
pub enum QuoteError {
    /// A required field was empty, or the quote already exists.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The remote collection could not be reached or answered badly.
    #[error("Network error: {0}")]
    Network(String),

    /// A snapshot or import payload was not a valid quote array.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Reading or writing the durable snapshot failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for QuoteError {
    fn from(e: serde_json::Error) -> Self {
        QuoteError::Parse(e.to_string())
    }
}

impl From<reqwest::Error> for QuoteError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            QuoteError::Network(format!("request timed out: {}", e))
        } else {
            QuoteError::Network(e.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, QuoteError>;
