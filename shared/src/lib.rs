//! Wire types shared between the society ledger backend and its clients.
//!
//! Amounts are `rust_decimal::Decimal` values in the society's currency and
//! serialize as strings to keep two-decimal precision intact over JSON.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Membership status of a resident account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberStatus {
    Active,
    Inactive,
}

/// How a payment was made
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    #[serde(rename = "UPI")]
    Upi,
    Cash,
    Card,
    #[serde(rename = "Bank Transfer")]
    BankTransfer,
    /// Admin dues decrease recorded as a payment
    #[serde(rename = "Manual Edit")]
    ManualEdit,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PaymentMethod::Upi => "UPI",
            PaymentMethod::Cash => "Cash",
            PaymentMethod::Card => "Card",
            PaymentMethod::BankTransfer => "Bank Transfer",
            PaymentMethod::ManualEdit => "Manual Edit",
        };
        f.write_str(label)
    }
}

/// A resident's running balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberAccount {
    pub id: String,
    pub name: String,
    pub flat_number: String,
    pub email: String,
    pub status: MemberStatus,
    /// Outstanding balance owed
    pub dues: Decimal,
    /// Lifetime amount paid
    pub paid: Decimal,
    /// Billing period ("YYYY-MM") whose late fee is already in `dues`
    pub late_fee_assessed_on: Option<String>,
    /// Optimistic concurrency stamp
    pub version: u64,
}

/// Immutable audit entry of one money movement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub receipt_id: String,
    pub account_id: String,
    /// Member name at the time of payment
    pub member_name: String,
    pub flat_number: String,
    pub email: String,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub late_fee_added_to_dues: Decimal,
    pub was_late_payment: bool,
}

/// The society's recurring charge schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingConfig {
    pub maintenance_charge: Decimal,
    pub water_charge: Decimal,
    pub sinking_fund: Decimal,
    pub late_fee: Decimal,
    /// Legacy day-of-month field, kept for older consumers
    pub due_date: Option<String>,
    /// Absolute due date (YYYY-MM-DD); its day wins over `due_date`
    pub due_date_iso: Option<String>,
    pub contact_email: Option<String>,
    pub monthly_total: Decimal,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveBillingConfigRequest {
    pub maintenance_charge: Decimal,
    pub water_charge: Decimal,
    pub sinking_fund: Decimal,
    pub late_fee: Decimal,
    pub due_date: Option<String>,
    pub due_date_iso: Option<String>,
    pub contact_email: Option<String>,
    /// Charge every member the new monthly total after saving (default true)
    #[serde(default)]
    pub apply_cycle_charge: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveBillingConfigResponse {
    pub config: BillingConfig,
    /// Number of accounts debited with the new period's charge, if one was applied
    pub charged_accounts: Option<usize>,
    pub success_message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetBillingConfigResponse {
    pub config: Option<BillingConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplyCycleChargeResponse {
    pub count: usize,
    pub monthly_total: Decimal,
    pub success_message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountListResponse {
    pub accounts: Vec<MemberAccount>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateMemberRequest {
    /// Optional stable id; generated when absent
    pub id: Option<String>,
    pub name: String,
    pub flat_number: String,
    pub email: String,
    pub initial_dues: Decimal,
    pub status: Option<MemberStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateMemberResponse {
    pub account: MemberAccount,
    pub success_message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoveMemberResponse {
    pub account_id: String,
    /// Payment records kept for audit
    pub retained_records: usize,
    pub success_message: String,
}

/// Admin edit of an account; `new_dues` drives the ledger correction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectDuesRequest {
    pub new_dues: Decimal,
    pub name: Option<String>,
    pub flat_number: Option<String>,
    pub email: Option<String>,
    pub status: Option<MemberStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectDuesResponse {
    pub account: MemberAccount,
    /// Present only when the correction lowered dues
    pub record: Option<PaymentRecord>,
    pub success_message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordPaymentRequest {
    pub amount: Decimal,
    pub method: PaymentMethod,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordPaymentResponse {
    pub record: PaymentRecord,
    pub account: MemberAccount,
    pub success_message: String,
}

/// Query string of `GET /api/accounts/:id/payments`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentHistoryQuery {
    /// Keep only the most recent records
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentListResponse {
    pub payments: Vec<PaymentRecord>,
}

/// Query string of the admin payment search and CSV export.
/// Dates are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentSearchQuery {
    pub q: Option<String>,
    pub method: Option<PaymentMethod>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentTotals {
    pub count: usize,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentSearchResponse {
    pub payments: Vec<PaymentRecord>,
    pub totals: PaymentTotals,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeletePaymentResponse {
    pub receipt_id: String,
    pub success_message: String,
}

/// What a member sees before paying
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberBill {
    pub account_id: String,
    pub as_of: NaiveDate,
    /// Billing period "YYYY-MM" of `as_of`
    pub period: String,
    pub dues: Decimal,
    pub paid: Decimal,
    pub maintenance_charge: Decimal,
    pub water_charge: Decimal,
    pub sinking_fund: Decimal,
    pub monthly_total: Decimal,
    pub due_day: Option<u8>,
    pub is_late: bool,
    pub late_fee_applies: bool,
    pub late_fee: Decimal,
    pub max_payable: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_members: usize,
    pub active_members: usize,
    pub total_collected: Decimal,
    pub total_dues: Decimal,
    /// Members with dues outstanding past this period's due day
    pub overdue_members: usize,
}

/// JSON body returned for every rejected request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}
