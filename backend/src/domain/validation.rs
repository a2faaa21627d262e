//! Input checks shared by the billing, member and payment services.

use rust_decimal::Decimal;

use crate::domain::errors::ValidationError;

/// Currency amounts carry at most this many decimal places
pub const CURRENCY_SCALE: u32 = 2;

/// Largest single amount the ledger accepts: 1,000,000,000,000.00
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(276_447_232, 23_283, 0, false, CURRENCY_SCALE);

/// Accept a non-negative amount with at most two decimal places.
pub fn non_negative_amount(field: &'static str, value: Decimal) -> Result<Decimal, ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValidationError::NegativeAmount { field, value });
    }
    check_precision(field, value)
}

/// Accept a strictly positive amount with at most two decimal places.
pub fn positive_amount(field: &'static str, value: Decimal) -> Result<Decimal, ValidationError> {
    if value <= Decimal::ZERO {
        return Err(ValidationError::AmountNotPositive);
    }
    check_precision(field, value)
}

fn check_precision(field: &'static str, value: Decimal) -> Result<Decimal, ValidationError> {
    if value > MAX_AMOUNT {
        return Err(ValidationError::AmountTooLarge { field });
    }
    if value.normalize().scale() > CURRENCY_SCALE {
        return Err(ValidationError::TooManyDecimalPlaces { field });
    }
    let mut rounded = value.round_dp(CURRENCY_SCALE);
    rounded.rescale(CURRENCY_SCALE);
    Ok(rounded)
}

/// Add amounts without panicking on overflow.
pub fn checked_sum(
    field: &'static str,
    amounts: impl IntoIterator<Item = Decimal>,
) -> Result<Decimal, ValidationError> {
    amounts
        .into_iter()
        .try_fold(Decimal::ZERO, |total, amount| total.checked_add(amount))
        .ok_or(ValidationError::AmountTooLarge { field })
}

/// Minimal shape check: one '@' with text on both sides and a dot in the domain.
pub fn is_plausible_email(email: &str) -> bool {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

/// Trim an optional text field, mapping blank input to `None`.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Require a non-blank text field.
pub fn required_text(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(trimmed.to_string())
}
