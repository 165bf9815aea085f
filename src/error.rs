//! Error types for aggregation operations
//!
//! This module defines the error taxonomy shared by the cache, resolver,
//! and correlator. Expected operational states (rate limiting, no data)
//! are *not* errors; they are returned as status values by collaborators.

use thiserror::Error;

/// Main error type for aggregation operations
#[derive(Error, Debug)]
pub enum ArgusError {
    /// A collaborator call exceeded its deadline
    #[error("Operation timed out after {timeout_seconds}s: {context}")]
    Timeout {
        timeout_seconds: u64,
        context: String,
    },

    /// Malformed or unexpected response shape from a collaborator
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid or expired credentials; must not be retried
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/Deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Durable cache tier error (wrapper)
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// External knowledge-base lookup failure
    #[error("Lookup error: {0}")]
    Lookup(String),

    /// Generic error with context
    #[error("Error: {0}")]
    Other(String),
}

/// Result type alias for aggregation operations
pub type Result<T> = std::result::Result<T, ArgusError>;

impl From<String> for ArgusError {
    fn from(s: String) -> Self {
        ArgusError::Other(s)
    }
}

impl From<&str> for ArgusError {
    fn from(s: &str) -> Self {
        ArgusError::Other(s.to_string())
    }
}

impl From<serde_json::Error> for ArgusError {
    fn from(e: serde_json::Error) -> Self {
        ArgusError::Serialization(e.to_string())
    }
}
