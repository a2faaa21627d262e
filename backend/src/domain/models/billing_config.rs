//! Domain model for the society's recurring charge schedule.
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::errors::ValidationError;
use crate::domain::validation::{checked_sum, is_plausible_email, non_blank, non_negative_amount};

/// Unvalidated billing input as an admin submits it.
#[derive(Debug, Clone, PartialEq)]
pub struct BillingConfigDraft {
    pub maintenance_charge: Decimal,
    pub water_charge: Decimal,
    pub sinking_fund: Decimal,
    pub late_fee: Decimal,
    /// Legacy day-of-month, e.g. "15"
    pub due_date: Option<String>,
    /// Absolute date, e.g. "2025-03-20"; its day wins over `due_date`
    pub due_date_iso: Option<String>,
    pub contact_email: Option<String>,
}

/// A validated billing configuration. One per society.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingConfig {
    pub maintenance_charge: Decimal,
    pub water_charge: Decimal,
    pub sinking_fund: Decimal,
    pub late_fee: Decimal,
    /// Legacy day-of-month, rewritten from `due_date_iso` when that is set
    pub due_day: Option<u8>,
    pub due_date_iso: Option<NaiveDate>,
    pub contact_email: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl BillingConfig {
    /// Validate a draft and normalize the ISO due date into the legacy day field.
    pub fn validate(draft: BillingConfigDraft, now: DateTime<Utc>) -> Result<Self, ValidationError> {
        let maintenance_charge = non_negative_amount("maintenanceCharge", draft.maintenance_charge)?;
        let water_charge = non_negative_amount("waterCharge", draft.water_charge)?;
        let sinking_fund = non_negative_amount("sinkingFund", draft.sinking_fund)?;
        let late_fee = non_negative_amount("lateFee", draft.late_fee)?;

        let legacy_day = match non_blank(draft.due_date) {
            Some(raw) => Some(parse_day_of_month(&raw)?),
            None => None,
        };
        let due_date_iso = match non_blank(draft.due_date_iso) {
            Some(raw) => Some(parse_iso_date(&raw)?),
            None => None,
        };
        let due_day = due_date_iso.map(|d| d.day() as u8).or(legacy_day);

        let contact_email = non_blank(draft.contact_email);
        if let Some(email) = &contact_email {
            if !is_plausible_email(email) {
                return Err(ValidationError::InvalidEmail(email.clone()));
            }
        }

        Ok(Self {
            maintenance_charge,
            water_charge,
            sinking_fund,
            late_fee,
            due_day,
            due_date_iso,
            contact_email,
            updated_at: now,
        })
    }

    /// Day of month after which a payment is late. The ISO date's day takes
    /// precedence over the legacy field. `None` means no due day is configured
    /// and nothing is ever late.
    pub fn effective_due_day_of_month(&self) -> Option<u8> {
        self.due_date_iso
            .map(|d| d.day() as u8)
            .or(self.due_day)
            .filter(|day| (1..=31).contains(day))
    }

    /// Recurring charge per period. The late fee is assessed at payment time only.
    pub fn monthly_total(&self) -> Result<Decimal, ValidationError> {
        checked_sum(
            "monthlyTotal",
            [self.maintenance_charge, self.water_charge, self.sinking_fund],
        )
    }
}

fn parse_day_of_month(raw: &str) -> Result<u8, ValidationError> {
    match raw.trim().parse::<u8>() {
        Ok(day) if (1..=31).contains(&day) => Ok(day),
        _ => Err(ValidationError::InvalidDueDay(raw.to_string())),
    }
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp.
fn parse_iso_date(raw: &str) -> Result<NaiveDate, ValidationError> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.date_naive())
        .map_err(|_| ValidationError::InvalidDueDate(raw.to_string()))
}
