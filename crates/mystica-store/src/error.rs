//! Error types for economy storage.

use mystica_core::{CurrencyKind, EconomyError};

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A debit would take the balance below zero. Nothing was written.
    #[error("insufficient {currency}: balance={available}, required={required}")]
    InsufficientFunds {
        /// The currency being debited.
        currency: CurrencyKind,
        /// Amount the debit asked for.
        required: i64,
        /// Balance at the time of the check.
        available: i64,
    },

    /// A counter would overflow. Nothing was written.
    #[error("overflow: {0}")]
    Overflow(String),

    /// A staged write can never be applied. Nothing was written.
    #[error("invalid write: {0}")]
    InvalidWrite(String),
}

impl From<StoreError> for EconomyError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InsufficientFunds {
                currency,
                required,
                available,
            } => Self::insufficient_funds(currency, required, available),
            StoreError::Overflow(msg) | StoreError::InvalidWrite(msg) => Self::validation(msg),
            StoreError::Database(msg) | StoreError::Serialization(msg) => Self::Persistence(msg),
        }
    }
}
