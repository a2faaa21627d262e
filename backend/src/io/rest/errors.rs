//! Translation of domain errors into HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use shared::ErrorResponse;
use tracing::{error, warn};

use crate::domain::errors::{LedgerError, ValidationError};

/// Message shown for infrastructure failures. Details stay in the log.
pub const RETRY_MESSAGE: &str = "The ledger could not be reached. Check the latest balances and try again.";

#[derive(Debug)]
pub enum ApiError {
    Ledger(LedgerError),
    /// No identity headers on the request
    Unauthenticated,
    Forbidden(String),
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        ApiError::Ledger(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Ledger(LedgerError::Validation(err))
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Ledger(err) => match err {
                LedgerError::Validation(_) => StatusCode::BAD_REQUEST,
                LedgerError::AmountExceedsDue { .. } | LedgerError::MissingIdentity { .. } => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                LedgerError::AccountNotFound { .. } | LedgerError::PaymentNotFound { .. } => StatusCode::NOT_FOUND,
                LedgerError::ConcurrencyConflict { .. } => StatusCode::CONFLICT,
                LedgerError::Persistence(_) => StatusCode::SERVICE_UNAVAILABLE,
            },
        }
    }

    /// Stable machine-readable kind for the `error` field
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Unauthenticated => "unauthenticated",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::Ledger(err) => match err {
                LedgerError::Validation(_) => "validation_error",
                LedgerError::AmountExceedsDue { .. } => "amount_exceeds_due",
                LedgerError::MissingIdentity { .. } => "missing_identity",
                LedgerError::AccountNotFound { .. } | LedgerError::PaymentNotFound { .. } => "not_found",
                LedgerError::ConcurrencyConflict { .. } => "concurrency_conflict",
                LedgerError::Persistence(_) => "storage_unavailable",
            },
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Unauthenticated => "Sign in to continue".to_string(),
            ApiError::Forbidden(message) => message.clone(),
            ApiError::Ledger(LedgerError::Persistence(_)) => RETRY_MESSAGE.to_string(),
            ApiError::Ledger(err) => err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.kind().to_string(),
            message: self.message(),
        };
        (self.status(), Json(body)).into_response()
    }
}

/// Log a failed operation at the level its kind deserves and build the response.
pub fn ledger_failure(operation: &str, err: LedgerError) -> Response {
    match &err {
        LedgerError::Persistence(cause) => error!("Failed to {}: {:#}", operation, cause),
        other if other.is_retryable() => warn!("Conflict on {}, caller may retry: {}", operation, other),
        other => warn!("Rejected {}: {}", operation, other),
    }
    ApiError::from(err).into_response()
}
