//! Error types for the coaching core

use std::time::Duration;

use thiserror::Error;

/// Result type alias using the coaching core's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors in the coaching core
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Returned both when a record doesn't exist and when it belongs to someone else
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Upstream provider failed: {0}")]
    Upstream(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Upstream call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Provider not configured: {0}")]
    ProviderNotConfigured(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the caller should offer the user a retry
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Upstream(_) | Error::Timeout(_) | Error::Network(_))
    }

    /// Whether this is a uniqueness violation reported by SQLite
    pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
        matches!(
            err,
            rusqlite::Error::SqliteFailure(e, _)
                if e.code == rusqlite::ErrorCode::ConstraintViolation
                    && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(Error::Upstream("502".to_string()).is_retryable());
        assert!(Error::Timeout(Duration::from_secs(30)).is_retryable());
        assert!(!Error::NotFound("session".to_string()).is_retryable());
        assert!(!Error::Conflict("feedback exists".to_string()).is_retryable());
        assert!(!Error::InvalidInput("empty".to_string()).is_retryable());
    }
}
