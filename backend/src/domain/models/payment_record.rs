//! Domain model for a payment audit record.
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    Upi,
    Cash,
    Card,
    BankTransfer,
    /// Admin dues decrease booked as income
    ManualEdit,
}

impl PaymentMethod {
    pub fn label(&self) -> &'static str {
        match self {
            PaymentMethod::Upi => "UPI",
            PaymentMethod::Cash => "Cash",
            PaymentMethod::Card => "Card",
            PaymentMethod::BankTransfer => "Bank Transfer",
            PaymentMethod::ManualEdit => "Manual Edit",
        }
    }

    /// Methods a member or cashier may use when recording a payment
    pub fn is_tender(&self) -> bool {
        !matches!(self, PaymentMethod::ManualEdit)
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "UPI" => Ok(PaymentMethod::Upi),
            "Cash" => Ok(PaymentMethod::Cash),
            "Card" => Ok(PaymentMethod::Card),
            "Bank Transfer" => Ok(PaymentMethod::BankTransfer),
            "Manual Edit" => Ok(PaymentMethod::ManualEdit),
            other => Err(format!("Unknown payment method: {}", other)),
        }
    }
}

/// Member details captured when the record was written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberSnapshot {
    pub name: String,
    pub flat_number: String,
    pub email: String,
}

/// Immutable once created. Corrections produce new records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub receipt_id: String,
    pub account_id: String,
    pub member: MemberSnapshot,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
    /// Late fee assessed by this payment (not the unfunded remainder)
    pub late_fee_added_to_dues: Decimal,
    pub was_late_payment: bool,
}

impl PaymentRecord {
    /// Generate a human-readable receipt ID.
    /// Format: RCPT-<yyyymmdd>-<6 hex digits>
    /// Example: RCPT-20250321-4F1A9C
    pub fn generate_receipt_id(date: NaiveDate) -> String {
        let suffix: String = Uuid::new_v4()
            .simple()
            .to_string()
            .chars()
            .take(6)
            .collect::<String>()
            .to_uppercase();
        format!("RCPT-{}-{}", date.format("%Y%m%d"), suffix)
    }

    /// Case-insensitive match against member, flat, email and receipt id
    pub fn matches_text(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        let haystack = format!(
            "{} {} {} {}",
            self.member.name, self.member.flat_number, self.member.email, self.receipt_id
        )
        .to_lowercase();
        haystack.contains(&query)
    }
}
