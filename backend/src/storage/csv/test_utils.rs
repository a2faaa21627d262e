/// Test utilities for the file store
///
/// `TestEnvironment` owns a temporary data directory that is removed when the
/// environment is dropped, even if the test panics.
use anyhow::{bail, Result};
use chrono::{NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use std::path::PathBuf;
use tempfile::TempDir;

use super::connection::{write_atomically, CsvConnection};
use super::roster_repository::encode_roster;
use crate::domain::models::{MemberAccount, MemberStatus, PaymentMethod, PaymentRecord};
use crate::storage::traits::{AccountWrite, CommitOutcome, Connection, LedgerCommit, LedgerStorage};

pub struct TestEnvironment {
    /// Kept alive so the directory survives until drop
    _temp_dir: TempDir,
    pub connection: CsvConnection,
    pub base_path: PathBuf,
}

impl TestEnvironment {
    pub async fn new() -> Result<Self> {
        let temp_dir = TempDir::with_prefix("society-ledger-")?;
        let base_path = temp_dir.path().to_path_buf();
        let connection = CsvConnection::new(&base_path)?;

        Ok(TestEnvironment {
            _temp_dir: temp_dir,
            connection,
            base_path,
        })
    }

    /// Insert an account into the credentialed store at version 1
    pub async fn seed_account(&self, account: MemberAccount) -> Result<()> {
        let outcome = self
            .connection
            .create_ledger_repository()
            .commit(LedgerCommit {
                writes: vec![AccountWrite::Insert(account)],
                records: vec![],
            })
            .await?;
        if outcome != CommitOutcome::Committed {
            bail!("seeding account failed: {:?}", outcome);
        }
        Ok(())
    }

    /// Replace the legacy roster file
    pub fn seed_roster(&self, entries: &[MemberAccount]) -> Result<()> {
        write_atomically(&self.connection.roster_file_path(), &encode_roster(entries)?)
    }
}

pub fn sample_account(id: &str, name: &str, dues: Decimal) -> MemberAccount {
    MemberAccount {
        id: id.to_string(),
        name: name.to_string(),
        flat_number: format!("FL-{}", id.to_uppercase()),
        email: format!("{}@example.com", id.replace("::", ".")),
        status: MemberStatus::Active,
        dues,
        paid: Decimal::ZERO,
        late_fee_assessed_on: None,
        version: 1,
    }
}

pub fn sample_record(receipt_id: &str, account_id: &str, amount: Decimal, method: PaymentMethod) -> PaymentRecord {
    PaymentRecord {
        receipt_id: receipt_id.to_string(),
        account_id: account_id.to_string(),
        member: sample_account(account_id, "Sample Member", Decimal::ZERO).snapshot(),
        amount,
        method,
        date: NaiveDate::from_ymd_opt(2025, 3, 15).unwrap_or_default(),
        created_at: Utc.with_ymd_and_hms(2025, 3, 15, 6, 30, 0).unwrap(),
        late_fee_added_to_dues: Decimal::ZERO,
        was_late_payment: false,
    }
}
