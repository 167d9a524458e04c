//! Common error types

use thiserror::Error;

/// Domain validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required text field is empty or whitespace
    #[error("{0} must not be blank")]
    Blank(&'static str),

    /// Product code contains the key separator
    #[error("code must not contain '#'")]
    InvalidCode,

    /// Price is negative, NaN or infinite
    #[error("price must be a finite, non-negative number")]
    InvalidPrice,

    /// Invoice total is negative, NaN or infinite
    #[error("totalValue must be a finite, non-negative number")]
    InvalidTotal,

    /// Invoice quantity is zero
    #[error("quantity must be at least 1")]
    InvalidQuantity,

    /// Uploaded document is not a readable invoice
    #[error("invalid invoice document: {0}")]
    InvalidDocument(String),

    /// Unknown product event type
    #[error("unknown event type: {0}")]
    UnknownEventType(String),
}

impl ValidationError {
    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Blank(_) => "BLANK_FIELD",
            Self::InvalidCode => "INVALID_CODE",
            Self::InvalidPrice => "INVALID_PRICE",
            Self::InvalidTotal => "INVALID_TOTAL",
            Self::InvalidQuantity => "INVALID_QUANTITY",
            Self::InvalidDocument(_) => "INVALID_DOCUMENT",
            Self::UnknownEventType(_) => "UNKNOWN_EVENT_TYPE",
        }
    }
}
