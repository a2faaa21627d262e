//! # CSV Payment Repository
//!
//! Insertion-ordered payment records in `payments.csv`. Records are appended
//! by [`super::LedgerRepository`] together with the account mutation that
//! produced them; this repository reads them and performs audit deletions.
//!
//! ```csv
//! receipt_id,account_id,member_name,flat_number,email,amount,method,date,created_at,late_fee_added_to_dues,was_late_payment
//! RCPT-20250315-4F1A9C,member::a101,Asha Rao,A-101,asha@example.com,600.00,UPI,2025-03-15,2025-03-15T06:30:00+00:00,50.00,true
//! ```

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use csv::StringRecord;
use std::path::Path;
use tracing::{debug, warn};

use super::connection::{write_atomically, CsvConnection};
use super::rows::{decimal_field, encode_rows, field, parsed_field, read_rows};
use crate::domain::models::{MemberSnapshot, PaymentMethod, PaymentRecord};
use crate::storage::traits::PaymentStorage;

pub(crate) const PAYMENT_HEADER: [&str; 11] = [
    "receipt_id",
    "account_id",
    "member_name",
    "flat_number",
    "email",
    "amount",
    "method",
    "date",
    "created_at",
    "late_fee_added_to_dues",
    "was_late_payment",
];

#[derive(Clone)]
pub struct PaymentRepository {
    connection: CsvConnection,
}

impl PaymentRepository {
    pub fn new(connection: CsvConnection) -> Self {
        Self { connection }
    }
}

fn parse_payment(record: &StringRecord) -> Result<PaymentRecord> {
    let date_raw = field(record, 7, "date")?;
    let date = NaiveDate::parse_from_str(date_raw, "%Y-%m-%d")
        .map_err(|e| anyhow!("invalid date '{}': {}", date_raw, e))?;
    let created_raw = field(record, 8, "created_at")?;
    let created_at = DateTime::parse_from_rfc3339(created_raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| anyhow!("invalid created_at '{}': {}", created_raw, e))?;

    Ok(PaymentRecord {
        receipt_id: field(record, 0, "receipt_id")?.to_string(),
        account_id: field(record, 1, "account_id")?.to_string(),
        member: MemberSnapshot {
            name: field(record, 2, "member_name")?.to_string(),
            flat_number: field(record, 3, "flat_number")?.to_string(),
            email: field(record, 4, "email")?.to_string(),
        },
        amount: decimal_field(record, 5, "amount")?,
        method: parsed_field::<PaymentMethod>(record, 6, "method")?,
        date,
        created_at,
        late_fee_added_to_dues: decimal_field(record, 9, "late_fee_added_to_dues")?,
        was_late_payment: parsed_field::<bool>(record, 10, "was_late_payment")?,
    })
}

pub(crate) fn read_payments(path: &Path) -> Result<Vec<PaymentRecord>> {
    let records = read_rows(path)?
        .iter()
        .map(parse_payment)
        .collect::<Result<Vec<_>>>()?;
    debug!("Read {} payment records from {}", records.len(), path.display());
    Ok(records)
}

pub(crate) fn encode_payments(records: &[PaymentRecord]) -> Result<Vec<u8>> {
    encode_rows(
        &PAYMENT_HEADER,
        records.iter().map(|record| {
            vec![
                record.receipt_id.clone(),
                record.account_id.clone(),
                record.member.name.clone(),
                record.member.flat_number.clone(),
                record.member.email.clone(),
                record.amount.to_string(),
                record.method.label().to_string(),
                record.date.format("%Y-%m-%d").to_string(),
                record.created_at.to_rfc3339(),
                record.late_fee_added_to_dues.to_string(),
                record.was_late_payment.to_string(),
            ]
        }),
    )
}

#[async_trait]
impl PaymentStorage for PaymentRepository {
    async fn get_payment(&self, receipt_id: &str) -> Result<Option<PaymentRecord>> {
        let records = read_payments(&self.connection.payments_file_path())?;
        Ok(records.into_iter().find(|record| record.receipt_id == receipt_id))
    }

    async fn list_payments(&self) -> Result<Vec<PaymentRecord>> {
        read_payments(&self.connection.payments_file_path())
    }

    async fn list_payments_for_account(&self, account_id: &str) -> Result<Vec<PaymentRecord>> {
        let records = read_payments(&self.connection.payments_file_path())?;
        Ok(records
            .into_iter()
            .filter(|record| record.account_id == account_id)
            .collect())
    }

    async fn delete_payment(&self, receipt_id: &str) -> Result<bool> {
        let _guard = self.connection.write_guard().await;
        let path = self.connection.payments_file_path();
        let mut records = read_payments(&path)?;
        let before = records.len();
        records.retain(|record| record.receipt_id != receipt_id);
        if records.len() == before {
            return Ok(false);
        }
        write_atomically(&path, &encode_payments(&records)?)?;
        warn!("Deleted payment record {} from {}", receipt_id, path.display());
        Ok(true)
    }
}
