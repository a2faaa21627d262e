//! # Ledger Commit Repository
//!
//! Applies a [`LedgerCommit`] to the data directory as one unit:
//!
//! 1. Take the connection write lock.
//! 2. Re-read accounts, roster and payments and check every expected version
//!    and receipt id. A mismatch returns a [`CommitOutcome`] without writing.
//! 3. Write payments, then accounts, then the roster (only when a removal
//!    touches it). If any write fails, files already replaced are restored
//!    to their previous bytes.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{debug, error, warn};

use super::account_repository::{encode_accounts, read_accounts};
use super::connection::{read_if_exists, restore, write_atomically, CsvConnection};
use super::payment_repository::{encode_payments, read_payments};
use super::roster_repository::{encode_roster, read_roster};
use crate::storage::traits::{AccountWrite, CommitOutcome, LedgerCommit, LedgerStorage};

#[derive(Clone)]
pub struct LedgerRepository {
    connection: CsvConnection,
}

impl LedgerRepository {
    pub fn new(connection: CsvConnection) -> Self {
        Self { connection }
    }

    /// Replace each file in order, restoring earlier ones if a later write fails.
    fn write_all(&self, files: Vec<(PathBuf, Vec<u8>)>) -> Result<()> {
        let mut replaced: Vec<(PathBuf, Option<Vec<u8>>)> = Vec::with_capacity(files.len());
        for (path, contents) in files {
            let previous = read_if_exists(&path)?;
            if let Err(write_error) = write_atomically(&path, &contents) {
                for (earlier_path, earlier_bytes) in replaced.iter().rev() {
                    if let Err(restore_error) = restore(earlier_path, earlier_bytes.as_deref()) {
                        error!("Failed to restore {} after aborted commit: {:#}", earlier_path.display(), restore_error);
                    }
                }
                return Err(write_error).context("ledger commit aborted, previous files restored");
            }
            replaced.push((path, previous));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerStorage for LedgerRepository {
    async fn commit(&self, commit: LedgerCommit) -> Result<CommitOutcome> {
        let _guard = self.connection.write_guard().await;

        let accounts_path = self.connection.accounts_file_path();
        let payments_path = self.connection.payments_file_path();
        let roster_path = self.connection.roster_file_path();

        let mut accounts = read_accounts(&accounts_path)?;
        let mut roster_dirty = false;
        let mut roster = Vec::new();

        for write in commit.writes {
            match write {
                AccountWrite::Insert(mut account) => {
                    if accounts.iter().any(|existing| existing.id == account.id) {
                        warn!("Commit rejected: account {} already exists", account.id);
                        return Ok(CommitOutcome::AccountExists { account_id: account.id });
                    }
                    account.version = 1;
                    accounts.push(account);
                }
                AccountWrite::Update {
                    expected_version,
                    mut account,
                } => {
                    let Some(slot) = accounts.iter_mut().find(|existing| existing.id == account.id) else {
                        warn!("Commit rejected: account {} vanished", account.id);
                        return Ok(CommitOutcome::VersionConflict { account_id: account.id });
                    };
                    if slot.version != expected_version {
                        warn!(
                            "Commit rejected: account {} is at version {}, expected {}",
                            account.id, slot.version, expected_version
                        );
                        return Ok(CommitOutcome::VersionConflict { account_id: account.id });
                    }
                    account.version = expected_version + 1;
                    *slot = account;
                }
                AccountWrite::Remove {
                    account_id,
                    expected_version,
                } => {
                    let stored_version = accounts
                        .iter()
                        .find(|existing| existing.id == account_id)
                        .map(|existing| existing.version)
                        .unwrap_or(0);
                    if stored_version != expected_version {
                        return Ok(CommitOutcome::VersionConflict { account_id });
                    }
                    accounts.retain(|existing| existing.id != account_id);

                    if !roster_dirty {
                        roster = read_roster(&roster_path)?;
                    }
                    let before = roster.len();
                    roster.retain(|entry| entry.id != account_id);
                    roster_dirty |= roster.len() != before;
                }
            }
        }

        let mut files = Vec::with_capacity(3);
        if !commit.records.is_empty() {
            let mut payments = read_payments(&payments_path)?;
            let mut receipt_ids: HashSet<String> = payments.iter().map(|r| r.receipt_id.clone()).collect();
            for record in &commit.records {
                if !receipt_ids.insert(record.receipt_id.clone()) {
                    warn!("Commit rejected: receipt id {} already used", record.receipt_id);
                    return Ok(CommitOutcome::DuplicateReceipt {
                        receipt_id: record.receipt_id.clone(),
                    });
                }
            }
            payments.extend(commit.records);
            files.push((payments_path, encode_payments(&payments)?));
        }
        files.push((accounts_path, encode_accounts(&accounts)?));
        if roster_dirty {
            files.push((roster_path, encode_roster(&roster)?));
        }

        self.write_all(files)?;
        debug!("Committed ledger changes for {} accounts", accounts.len());
        Ok(CommitOutcome::Committed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::PaymentMethod;
    use crate::storage::csv::test_utils::{sample_account, sample_record, TestEnvironment};
    use crate::storage::traits::{AccountStorage, PaymentStorage, RosterStorage};
    use crate::storage::Connection;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_insert_then_update_bumps_version() {
        let env = TestEnvironment::new().await.unwrap();
        let ledger = env.connection.create_ledger_repository();
        let accounts = env.connection.create_account_repository();

        let outcome = ledger
            .commit(LedgerCommit {
                writes: vec![AccountWrite::Insert(sample_account("m1", "Asha", dec!(1000)))],
                records: vec![],
            })
            .await
            .unwrap();
        assert_eq!(outcome, CommitOutcome::Committed);
        let stored = accounts.get_account("m1").await.unwrap().unwrap();
        assert_eq!(stored.version, 1);

        let mut updated = stored.clone();
        updated.dues = dec!(400);
        let record = sample_record("RCPT-1", "m1", dec!(600), PaymentMethod::Upi);
        let outcome = ledger
            .commit(LedgerCommit {
                writes: vec![AccountWrite::persist(updated)],
                records: vec![record.clone()],
            })
            .await
            .unwrap();
        assert_eq!(outcome, CommitOutcome::Committed);
        let stored = accounts.get_account("m1").await.unwrap().unwrap();
        assert_eq!(stored.version, 2);
        assert_eq!(stored.dues, dec!(400));
        let payments = env.connection.create_payment_repository();
        assert_eq!(payments.list_payments().await.unwrap(), vec![record]);
    }

    #[tokio::test]
    async fn test_stale_version_writes_nothing() {
        let env = TestEnvironment::new().await.unwrap();
        let ledger = env.connection.create_ledger_repository();
        env.seed_account(sample_account("m1", "Asha", dec!(1000))).await.unwrap();

        let mut stale = env.connection.create_account_repository().get_account("m1").await.unwrap().unwrap();
        stale.version = 7;
        stale.dues = dec!(0);
        let outcome = ledger
            .commit(LedgerCommit {
                writes: vec![AccountWrite::persist(stale)],
                records: vec![sample_record("RCPT-1", "m1", dec!(1000), PaymentMethod::Cash)],
            })
            .await
            .unwrap();
        assert_eq!(outcome, CommitOutcome::VersionConflict { account_id: "m1".to_string() });

        let stored = env.connection.create_account_repository().get_account("m1").await.unwrap().unwrap();
        assert_eq!(stored.dues, dec!(1000));
        assert!(env.connection.create_payment_repository().list_payments().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_receipt_is_rejected() {
        let env = TestEnvironment::new().await.unwrap();
        let ledger = env.connection.create_ledger_repository();
        let record = sample_record("RCPT-1", "m1", dec!(10), PaymentMethod::Cash);
        let first = ledger
            .commit(LedgerCommit {
                writes: vec![],
                records: vec![record.clone()],
            })
            .await
            .unwrap();
        assert_eq!(first, CommitOutcome::Committed);

        let second = ledger
            .commit(LedgerCommit {
                writes: vec![AccountWrite::Insert(sample_account("m1", "Asha", dec!(0)))],
                records: vec![record],
            })
            .await
            .unwrap();
        assert_eq!(second, CommitOutcome::DuplicateReceipt { receipt_id: "RCPT-1".to_string() });
        assert!(env.connection.create_account_repository().list_accounts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_insert_of_existing_id_is_rejected() {
        let env = TestEnvironment::new().await.unwrap();
        env.seed_account(sample_account("m1", "Asha", dec!(0))).await.unwrap();
        let outcome = env
            .connection
            .create_ledger_repository()
            .commit(LedgerCommit {
                writes: vec![AccountWrite::Insert(sample_account("m1", "Other", dec!(5)))],
                records: vec![],
            })
            .await
            .unwrap();
        assert_eq!(outcome, CommitOutcome::AccountExists { account_id: "m1".to_string() });
    }

    #[tokio::test]
    async fn test_remove_purges_roster_entry() {
        let env = TestEnvironment::new().await.unwrap();
        env.seed_roster(&[sample_account("r1", "Kiran", dec!(100)), sample_account("r2", "Leela", dec!(0))])
            .unwrap();

        let outcome = env
            .connection
            .create_ledger_repository()
            .commit(LedgerCommit {
                writes: vec![AccountWrite::Remove {
                    account_id: "r1".to_string(),
                    expected_version: 0,
                }],
                records: vec![],
            })
            .await
            .unwrap();
        assert_eq!(outcome, CommitOutcome::Committed);
        let roster = env.connection.create_roster_repository().list_roster().await.unwrap();
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].id, "r2");
    }

    #[tokio::test]
    async fn test_failed_accounts_write_restores_payments() {
        let env = TestEnvironment::new().await.unwrap();
        let ledger = env.connection.create_ledger_repository();

        // A directory where the accounts temp file should go makes its write fail
        std::fs::create_dir_all(env.connection.accounts_file_path().with_extension("tmp")).unwrap();

        let result = ledger
            .commit(LedgerCommit {
                writes: vec![AccountWrite::Insert(sample_account("m1", "Asha", dec!(0)))],
                records: vec![sample_record("RCPT-1", "m1", dec!(10), PaymentMethod::Cash)],
            })
            .await;
        assert!(result.is_err());
        assert!(!env.connection.payments_file_path().exists());
        assert!(!env.connection.accounts_file_path().exists());
    }
}
