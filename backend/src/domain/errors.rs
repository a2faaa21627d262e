//! Error kinds produced by the ledger domain.
//!
//! Business-rule violations are typed so callers can show an actionable
//! message. Infrastructure failures are wrapped in [`LedgerError::Persistence`]
//! and should be surfaced as a generic retry prompt.

use rust_decimal::Decimal;

/// Malformed configuration or input. Nothing has been mutated.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} cannot be negative (got {value})")]
    NegativeAmount { field: &'static str, value: Decimal },
    #[error("{field} must have at most 2 decimal places")]
    TooManyDecimalPlaces { field: &'static str },
    #[error("{field} is larger than the ledger can hold")]
    AmountTooLarge { field: &'static str },
    #[error("Enter a valid amount greater than zero")]
    AmountNotPositive,
    #[error("Due day must be a day of month between 1 and 31, got '{0}'")]
    InvalidDueDay(String),
    #[error("Due date must be a calendar date like 2025-03-20, got '{0}'")]
    InvalidDueDate(String),
    #[error("'{0}' is not a valid email address")]
    InvalidEmail(String),
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("Manual Edit is reserved for admin dues corrections")]
    ReservedPaymentMethod,
    #[error("An account with id '{0}' already exists")]
    DuplicateAccount(String),
    #[error("Billing configuration has not been saved yet")]
    MissingBillingConfig,
}

/// Every way a ledger operation can be rejected.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Amount exceeds due. Max payable is ₹{max:.2}")]
    AmountExceedsDue { max: Decimal },

    #[error("Account '{account_id}' has no email on file, so a payment cannot be posted")]
    MissingIdentity { account_id: String },

    #[error("Account '{account_id}' not found")]
    AccountNotFound { account_id: String },

    #[error("Payment '{receipt_id}' not found")]
    PaymentNotFound { receipt_id: String },

    #[error("Account '{account_id}' was changed by another operation; reload and retry")]
    ConcurrencyConflict { account_id: String },

    #[error("storage error: {0}")]
    Persistence(#[from] anyhow::Error),
}

impl LedgerError {
    /// Whether retrying the same request may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LedgerError::ConcurrencyConflict { .. } | LedgerError::Persistence(_)
        )
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
