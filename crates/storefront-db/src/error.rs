//! Storage errors

use storefront_utils::RetryableError;
use thiserror::Error;

/// Storage errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DbError {
    /// Record not found
    #[error("record not found")]
    NotFound,

    /// A record with the same key already exists
    #[error("record already exists: {0}")]
    Conflict(String),

    /// The backing store could not serve the request
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl DbError {
    /// Whether the operation may succeed if repeated
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl RetryableError for DbError {
    fn is_retryable(&self) -> bool {
        DbError::is_retryable(self)
    }
}

/// Result type for storage operations
pub type DbResult<T> = Result<T, DbError>;
