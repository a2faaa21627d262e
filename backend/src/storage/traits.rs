//! # Storage Traits
//!
//! Storage abstraction used by the domain services. Reads go through the
//! per-collection traits. Every mutation of member accounts, and every
//! payment record append, goes through [`LedgerStorage::commit`] so that the
//! version check and the writes happen as one unit.

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::models::{BillingConfig, MemberAccount, PaymentRecord};

/// Credentialed account store, keyed by account id
#[async_trait]
pub trait AccountStorage: Send + Sync {
    /// Retrieve one account by id
    async fn get_account(&self, account_id: &str) -> Result<Option<MemberAccount>>;

    /// List all accounts in stored order
    async fn list_accounts(&self) -> Result<Vec<MemberAccount>>;
}

/// Legacy flat roster. Read-only for ledger operations.
#[async_trait]
pub trait RosterStorage: Send + Sync {
    async fn get_roster_entry(&self, account_id: &str) -> Result<Option<MemberAccount>>;

    async fn list_roster(&self) -> Result<Vec<MemberAccount>>;
}

/// Insertion-ordered payment records
#[async_trait]
pub trait PaymentStorage: Send + Sync {
    /// Retrieve one record by receipt id
    async fn get_payment(&self, receipt_id: &str) -> Result<Option<PaymentRecord>>;

    /// All records in insertion order
    async fn list_payments(&self) -> Result<Vec<PaymentRecord>>;

    /// Records of one account in insertion order
    async fn list_payments_for_account(&self, account_id: &str) -> Result<Vec<PaymentRecord>>;

    /// Remove a record (admin audit correction only).
    /// Returns true if the record was found and deleted.
    async fn delete_payment(&self, receipt_id: &str) -> Result<bool>;
}

/// The single billing configuration
#[async_trait]
pub trait BillingConfigStorage: Send + Sync {
    async fn get_billing_config(&self) -> Result<Option<BillingConfig>>;

    async fn save_billing_config(&self, config: &BillingConfig) -> Result<()>;
}

/// One account mutation inside a commit
#[derive(Debug, Clone, PartialEq)]
pub enum AccountWrite {
    /// Create an account that is not yet in the account store. Stored at version 1.
    Insert(MemberAccount),
    /// Replace an account whose stored version must equal `expected_version`.
    /// Stored at `expected_version + 1`.
    Update {
        expected_version: u64,
        account: MemberAccount,
    },
    /// Delete an account from the account store and the roster.
    /// `expected_version` 0 addresses a roster-only account.
    Remove {
        account_id: String,
        expected_version: u64,
    },
}

impl AccountWrite {
    pub fn account_id(&self) -> &str {
        match self {
            AccountWrite::Insert(account) => &account.id,
            AccountWrite::Update { account, .. } => &account.id,
            AccountWrite::Remove { account_id, .. } => account_id,
        }
    }

    /// Version the account has after this write commits
    pub fn resulting_version(&self) -> Option<u64> {
        match self {
            AccountWrite::Insert(_) => Some(1),
            AccountWrite::Update { expected_version, .. } => Some(expected_version + 1),
            AccountWrite::Remove { .. } => None,
        }
    }

    /// Write that persists `account` over the snapshot version it was read at.
    /// Version 0 means the account came from the roster and must be adopted.
    pub fn persist(account: MemberAccount) -> Self {
        if account.version == 0 {
            AccountWrite::Insert(account)
        } else {
            AccountWrite::Update {
                expected_version: account.version,
                account,
            }
        }
    }
}

/// Account writes plus the payment records they produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LedgerCommit {
    pub writes: Vec<AccountWrite>,
    pub records: Vec<PaymentRecord>,
}

/// Result of a commit that reached the store. Nothing was written unless
/// the outcome is `Committed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    /// The stored version of an account no longer matches the snapshot
    VersionConflict { account_id: String },
    /// A record with this receipt id already exists
    DuplicateReceipt { receipt_id: String },
    /// Insert of an id already present in the account store
    AccountExists { account_id: String },
}

#[async_trait]
pub trait LedgerStorage: Send + Sync {
    /// Apply all writes and append all records, or nothing.
    async fn commit(&self, commit: LedgerCommit) -> Result<CommitOutcome>;
}

/// Trait defining the interface for storage connections
///
/// Abstracts the concrete backend and provides factory methods for the
/// repositories the domain services use.
pub trait Connection: Send + Sync + Clone + 'static {
    type AccountRepository: AccountStorage + Clone + 'static;
    type RosterRepository: RosterStorage + Clone + 'static;
    type PaymentRepository: PaymentStorage + Clone + 'static;
    type BillingConfigRepository: BillingConfigStorage + Clone + 'static;
    type LedgerRepository: LedgerStorage + Clone + 'static;

    fn create_account_repository(&self) -> Self::AccountRepository;

    fn create_roster_repository(&self) -> Self::RosterRepository;

    fn create_payment_repository(&self) -> Self::PaymentRepository;

    fn create_billing_config_repository(&self) -> Self::BillingConfigRepository;

    fn create_ledger_repository(&self) -> Self::LedgerRepository;
}
