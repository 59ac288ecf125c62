//! Error types for the Mystica economy.

use crate::currency::CurrencyKind;
use crate::ids::{IdError, OperationId};

/// Result type for economy operations.
pub type Result<T> = std::result::Result<T, EconomyError>;

/// Errors that can occur in economy operations.
#[derive(Debug, thiserror::Error)]
pub enum EconomyError {
    /// Bad input: non-positive amount, unknown kind, malformed bundle.
    #[error("validation failed: {message}")]
    Validation {
        /// What was wrong with the input.
        message: String,
    },

    /// A debit asked for more than the balance holds.
    #[error(
        "insufficient {currency}: required={required}, available={available}, shortfall={shortfall}"
    )]
    InsufficientFunds {
        /// The currency being debited.
        currency: CurrencyKind,
        /// Amount the debit asked for.
        required: i64,
        /// Balance at the time of the check.
        available: i64,
        /// `required - available`.
        shortfall: i64,
    },

    /// A referenced location, enemy or user does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of entity.
        entity: &'static str,
        /// The identifier that was looked up.
        id: String,
    },

    /// The underlying store failed.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// A collaborator (loot generation, enemy selection) failed.
    #[error("external service error: {service} - {message}")]
    External {
        /// The collaborator that failed.
        service: String,
        /// Error message.
        message: String,
    },

    /// A failure inside a reward operation, tagged with its idempotency key.
    #[error("reward operation {operation_id} failed: {source}")]
    Reward {
        /// The operation that failed.
        operation_id: OperationId,
        /// What went wrong.
        #[source]
        source: Box<EconomyError>,
    },

    /// Invalid identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),
}

impl EconomyError {
    /// Build a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Build an insufficient-funds error, deriving the shortfall.
    #[must_use]
    pub fn insufficient_funds(currency: CurrencyKind, required: i64, available: i64) -> Self {
        Self::InsufficientFunds {
            currency,
            required,
            available,
            shortfall: required.saturating_sub(available).max(0),
        }
    }

    /// Build a not-found error.
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Build a collaborator failure.
    pub fn external(service: impl Into<String>, message: impl ToString) -> Self {
        Self::External {
            service: service.into(),
            message: message.to_string(),
        }
    }

    /// Tag this error with the reward operation it occurred in.
    #[must_use]
    pub fn in_operation(self, operation_id: OperationId) -> Self {
        match self {
            already @ Self::Reward { .. } => already,
            other => Self::Reward {
                operation_id,
                source: Box::new(other),
            },
        }
    }

    /// Whether retrying the same request may succeed.
    ///
    /// Only store and collaborator failures are transient. Reward operations
    /// are idempotent, so retrying them with the same operation id is safe.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Persistence(_) | Self::External { .. } => true,
            Self::Reward { source, .. } => source.is_retryable(),
            Self::Validation { .. }
            | Self::InsufficientFunds { .. }
            | Self::NotFound { .. }
            | Self::InvalidId(_) => false,
        }
    }

    /// The innermost error, skipping operation tags.
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::Reward { source, .. } => source.root(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shortfall_is_derived() {
        let err = EconomyError::insufficient_funds(CurrencyKind::Gold, 150, 100);
        assert!(matches!(
            err,
            EconomyError::InsufficientFunds {
                required: 150,
                available: 100,
                shortfall: 50,
                ..
            }
        ));
        assert_eq!(
            err.to_string(),
            "insufficient GOLD: required=150, available=100, shortfall=50"
        );
    }

    #[test]
    fn operation_tag_preserves_retryability() {
        let op = OperationId::generate();
        let transient = EconomyError::Persistence("disk full".into()).in_operation(op);
        assert!(transient.is_retryable());
        assert!(matches!(transient.root(), EconomyError::Persistence(_)));

        let malformed = EconomyError::validation("negative delta").in_operation(op);
        assert!(!malformed.is_retryable());
    }

    #[test]
    fn operation_tag_is_not_nested() {
        let op = OperationId::generate();
        let err = EconomyError::Persistence("io".into())
            .in_operation(op)
            .in_operation(OperationId::generate());
        match err {
            EconomyError::Reward { operation_id, source } => {
                assert_eq!(operation_id, op);
                assert!(matches!(*source, EconomyError::Persistence(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
