//! API error types and responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use mystica_core::{CurrencyKind, EconomyError};

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Bad request - invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Insufficient funds for a debit.
    #[error("insufficient {currency}: required={required}, available={available}")]
    InsufficientFunds {
        /// Currency being debited.
        currency: CurrencyKind,
        /// Amount asked for.
        required: i64,
        /// Current balance.
        available: i64,
        /// Missing amount.
        shortfall: i64,
    },

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),

    /// External service error.
    #[error("external service error: {0}")]
    ExternalService(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone(), None),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone(), None),
            Self::InsufficientFunds {
                currency,
                required,
                available,
                shortfall,
            } => (
                StatusCode::PAYMENT_REQUIRED,
                "insufficient_funds",
                self.to_string(),
                Some(serde_json::json!({
                    "currency": currency,
                    "required": required,
                    "available": available,
                    "shortfall": shortfall
                })),
            ),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
            Self::ExternalService(msg) => (
                StatusCode::BAD_GATEWAY,
                "external_service_error",
                msg.clone(),
                None,
            ),
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<EconomyError> for ApiError {
    fn from(err: EconomyError) -> Self {
        let message = err.to_string();
        match err.root() {
            EconomyError::Validation { .. } | EconomyError::InvalidId(_) => {
                Self::BadRequest(message)
            }
            EconomyError::InsufficientFunds {
                currency,
                required,
                available,
                shortfall,
            } => Self::InsufficientFunds {
                currency: *currency,
                required: *required,
                available: *available,
                shortfall: *shortfall,
            },
            EconomyError::NotFound { .. } => Self::NotFound(message),
            EconomyError::External { .. } => Self::ExternalService(message),
            EconomyError::Persistence(_) | EconomyError::Reward { .. } => Self::Internal(message),
        }
    }
}

impl From<mystica_store::StoreError> for ApiError {
    fn from(err: mystica_store::StoreError) -> Self {
        EconomyError::from(err).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mystica_core::OperationId;

    #[test]
    fn wrapped_errors_map_by_root_cause() {
        let err: ApiError = EconomyError::validation("bad slot")
            .in_operation(OperationId::generate())
            .into();
        assert!(matches!(err, ApiError::BadRequest(msg) if msg.contains("bad slot")));

        let err: ApiError = EconomyError::insufficient_funds(CurrencyKind::Gold, 150, 100).into();
        assert!(matches!(err, ApiError::InsufficientFunds { shortfall: 50, .. }));

        let err: ApiError = EconomyError::Persistence("disk".into()).into();
        assert!(matches!(err, ApiError::Internal(_)));
    }

    #[test]
    fn collaborator_failure_is_bad_gateway() {
        let err: ApiError = EconomyError::external("loot_generator", "timed out").into();
        assert!(matches!(&err, ApiError::ExternalService(msg) if msg.contains("loot_generator")));
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn insufficient_funds_is_payment_required() {
        let response = ApiError::InsufficientFunds {
            currency: CurrencyKind::Gems,
            required: 10,
            available: 4,
            shortfall: 6,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    }
}
