//! Ledger reconciliation rules.
//!
//! Every function here is pure: it takes a snapshot of account state plus the
//! inputs of one operation and returns the new state together with any audit
//! record the operation produces. Persisting the result is the caller's job
//! (see the services in this module's siblings).
//!
//! ## Rules
//!
//! - A billing cycle adds the configured monthly total to every account's
//!   dues. It is a charge, not a payment, so no record is produced.
//! - A payment first retires outstanding dues, then absorbs a late fee newly
//!   assessed by the same payment. Any unfunded part of that fee is folded
//!   back into dues.
//! - A late fee is assessed at most once per account per billing period.
//! - A manual correction that lowers dues is booked as a `Manual Edit`
//!   payment of the difference. A correction that raises dues is not income
//!   and produces no record.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::domain::errors::{LedgerError, LedgerResult, ValidationError};
use crate::domain::models::{
    BillingConfig, BillingPeriod, MemberAccount, MemberStatus, PaymentMethod, PaymentRecord,
};
use crate::domain::validation::{checked_sum, is_plausible_email, non_negative_amount, positive_amount, required_text};

/// Date and identity stamps for records written by one operation
#[derive(Debug, Clone)]
pub struct PostingContext {
    pub today: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub receipt_id: String,
}

impl PostingContext {
    pub fn new(today: NaiveDate, created_at: DateTime<Utc>) -> Self {
        Self {
            today,
            created_at,
            receipt_id: PaymentRecord::generate_receipt_id(today),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BillingCycleOutcome {
    pub updated_accounts: Vec<MemberAccount>,
    /// Always empty: a cycle charge is not a money movement
    pub audit_records: Vec<PaymentRecord>,
    pub charge_per_account: Decimal,
}

/// Late-fee status of one account on one date
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LateFeeAssessment {
    pub period: BillingPeriod,
    /// Today is past the configured due day
    pub is_late: bool,
    /// A fee would be assessed by a payment made today
    pub applies: bool,
    /// Fee that would be assessed, zero when it does not apply
    pub fee: Decimal,
}

/// How one tendered amount was split
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaymentAllocation {
    pub applied_to_dues: Decimal,
    pub remaining: Decimal,
    pub fee_assessed: Decimal,
    pub fee_remaining: Decimal,
    pub new_dues: Decimal,
    pub new_paid: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentOutcome {
    pub updated_account: MemberAccount,
    pub record: PaymentRecord,
    pub allocation: PaymentAllocation,
}

/// Fields an admin may change in the account editor
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DuesCorrection {
    pub new_dues: Decimal,
    pub name: Option<String>,
    pub flat_number: Option<String>,
    pub email: Option<String>,
    pub status: Option<MemberStatus>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CorrectionOutcome {
    pub updated_account: MemberAccount,
    /// Present when the correction lowered dues
    pub record: Option<PaymentRecord>,
    pub payment_delta: Decimal,
}

/// Whether `as_of` falls after the configured due day of its month.
///
/// Each period is judged on its own: whether earlier periods were settled
/// does not matter.
pub fn is_overdue(config: &BillingConfig, as_of: NaiveDate) -> bool {
    match config.effective_due_day_of_month() {
        Some(due_day) => as_of.day() > u32::from(due_day),
        None => false,
    }
}

/// Decide whether a payment made on `today` assesses the late fee.
pub fn assess_late_fee(account: &MemberAccount, config: &BillingConfig, today: NaiveDate) -> LateFeeAssessment {
    let period = BillingPeriod::containing(today);
    let is_late = is_overdue(config, today);
    let applies = config.late_fee > Decimal::ZERO
        && account.dues > Decimal::ZERO
        && is_late
        && account.late_fee_assessed_on != Some(period);
    LateFeeAssessment {
        period,
        is_late,
        applies,
        fee: if applies { config.late_fee } else { Decimal::ZERO },
    }
}

/// Most a member may pay today: dues plus any fee this payment would assess.
pub fn allowed_max(
    account: &MemberAccount,
    config: &BillingConfig,
    today: NaiveDate,
) -> Result<Decimal, ValidationError> {
    checked_sum("dues", [account.dues, assess_late_fee(account, config, today).fee])
}

/// Debit every account with the configured monthly total.
///
/// Fails without touching any account if one of them would overflow.
pub fn apply_billing_cycle(
    config: &BillingConfig,
    accounts: &[MemberAccount],
) -> Result<BillingCycleOutcome, ValidationError> {
    let charge = config.monthly_total()?;
    let updated_accounts = accounts
        .iter()
        .map(|account| {
            let mut updated = account.clone();
            updated.dues = checked_sum("dues", [account.dues, charge])?;
            Ok(updated)
        })
        .collect::<Result<Vec<_>, ValidationError>>()?;

    Ok(BillingCycleOutcome {
        updated_accounts,
        audit_records: Vec::new(),
        charge_per_account: charge,
    })
}

/// Split a tendered amount between dues and a newly assessed late fee.
pub fn allocate_payment(
    account: &MemberAccount,
    amount: Decimal,
    fee_assessed: Decimal,
) -> Result<PaymentAllocation, ValidationError> {
    let applied_to_dues = amount.min(account.dues);
    let dues_after_principal = account.dues - applied_to_dues;
    let remaining = amount - applied_to_dues;
    let fee_remaining = (fee_assessed - remaining).max(Decimal::ZERO);

    Ok(PaymentAllocation {
        applied_to_dues,
        remaining,
        fee_assessed,
        fee_remaining,
        new_dues: checked_sum("dues", [dues_after_principal, fee_remaining])?,
        new_paid: checked_sum("paid", [account.paid, amount])?,
    })
}

/// Apply one member payment to one account.
pub fn apply_payment(
    account: &MemberAccount,
    amount_tendered: Decimal,
    method: PaymentMethod,
    config: &BillingConfig,
    ctx: &PostingContext,
) -> LedgerResult<PaymentOutcome> {
    let amount = positive_amount("amount", amount_tendered)?;
    if !method.is_tender() {
        return Err(ValidationError::ReservedPaymentMethod.into());
    }
    if !account.has_identity() {
        return Err(LedgerError::MissingIdentity {
            account_id: account.id.clone(),
        });
    }

    let assessment = assess_late_fee(account, config, ctx.today);
    let max = checked_sum("dues", [account.dues, assessment.fee])?;
    if amount > max {
        return Err(LedgerError::AmountExceedsDue { max });
    }

    let allocation = allocate_payment(account, amount, assessment.fee)?;

    let mut updated_account = account.clone();
    updated_account.dues = allocation.new_dues;
    updated_account.paid = allocation.new_paid;
    if assessment.applies {
        updated_account.late_fee_assessed_on = Some(assessment.period);
    }

    let record = PaymentRecord {
        receipt_id: ctx.receipt_id.clone(),
        account_id: account.id.clone(),
        member: account.snapshot(),
        amount,
        method,
        date: ctx.today,
        created_at: ctx.created_at,
        late_fee_added_to_dues: assessment.fee,
        was_late_payment: assessment.is_late,
    };

    Ok(PaymentOutcome {
        updated_account,
        record,
        allocation,
    })
}

/// Apply an admin edit of an account's dues (and descriptive fields).
///
/// The payment delta is not capped: this is the admin override path.
pub fn apply_manual_correction(
    account: &MemberAccount,
    correction: DuesCorrection,
    ctx: &PostingContext,
) -> LedgerResult<CorrectionOutcome> {
    let new_dues = non_negative_amount("dues", correction.new_dues)?;

    let mut updated_account = account.clone();
    if let Some(name) = correction.name {
        updated_account.name = required_text("name", &name)?;
    }
    if let Some(flat_number) = correction.flat_number {
        updated_account.flat_number = required_text("flatNumber", &flat_number)?;
    }
    if let Some(email) = correction.email {
        let email = required_text("email", &email)?;
        if !is_plausible_email(&email) {
            return Err(ValidationError::InvalidEmail(email).into());
        }
        updated_account.email = email;
    }
    if let Some(status) = correction.status {
        updated_account.status = status;
    }

    let payment_delta = account.dues - new_dues;
    updated_account.dues = new_dues;

    let record = if payment_delta > Decimal::ZERO {
        updated_account.paid = checked_sum("paid", [account.paid, payment_delta])?;
        Some(PaymentRecord {
            receipt_id: ctx.receipt_id.clone(),
            account_id: account.id.clone(),
            member: updated_account.snapshot(),
            amount: payment_delta,
            method: PaymentMethod::ManualEdit,
            date: ctx.today,
            created_at: ctx.created_at,
            late_fee_added_to_dues: Decimal::ZERO,
            was_late_payment: false,
        })
    } else {
        None
    };

    Ok(CorrectionOutcome {
        updated_account,
        record,
        payment_delta,
    })
}
