//! Domain model for a resident's account.
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::payment_record::MemberSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberStatus {
    Active,
    Inactive,
}

impl MemberStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberStatus::Active => "Active",
            MemberStatus::Inactive => "Inactive",
        }
    }
}

impl FromStr for MemberStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(MemberStatus::Active),
            "inactive" => Ok(MemberStatus::Inactive),
            other => Err(format!("Unknown member status: {}", other)),
        }
    }
}

/// A billing period is a calendar month. Late fees are assessed at most once per period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BillingPeriod {
    pub year: i32,
    pub month: u32,
}

impl BillingPeriod {
    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for BillingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for BillingPeriod {
    type Err = String;

    /// Parses the "YYYY-MM" form
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| format!("Invalid billing period: {}", s))?;
        let year = year
            .parse::<i32>()
            .map_err(|_| format!("Invalid year in billing period: {}", s))?;
        let month = month
            .parse::<u32>()
            .map_err(|_| format!("Invalid month in billing period: {}", s))?;
        if !(1..=12).contains(&month) {
            return Err(format!("Month out of range in billing period: {}", s));
        }
        Ok(Self { year, month })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberAccount {
    /// Stable identifier, independent of the display name
    pub id: String,
    pub name: String,
    pub flat_number: String,
    pub email: String,
    pub status: MemberStatus,
    /// Outstanding balance, never negative
    pub dues: Decimal,
    /// Lifetime amount paid, never negative
    pub paid: Decimal,
    pub late_fee_assessed_on: Option<BillingPeriod>,
    /// Bumped by the store on every committed mutation
    pub version: u64,
}

impl MemberAccount {
    /// Generate an account ID from the flat number and a timestamp
    pub fn generate_id(flat_number: &str, epoch_millis: i64) -> String {
        let flat: String = flat_number
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        if flat.is_empty() {
            format!("member::{}", epoch_millis)
        } else {
            format!("member::{}::{}", flat, epoch_millis)
        }
    }

    /// Whether the account carries enough identity to post a payment
    pub fn has_identity(&self) -> bool {
        !self.id.trim().is_empty() && !self.email.trim().is_empty()
    }

    /// Denormalized copy of the descriptive fields for audit records
    pub fn snapshot(&self) -> MemberSnapshot {
        MemberSnapshot {
            name: self.name.clone(),
            flat_number: self.flat_number.clone(),
            email: self.email.clone(),
        }
    }
}
