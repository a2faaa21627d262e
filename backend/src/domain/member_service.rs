//! Member roster: merged listing across both account sources, plus admin
//! add and remove.

use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::account_locks::AccountLocks;
use crate::domain::change_feed::{ChangeEvent, ChangeFeed};
use crate::domain::clock::Clock;
use crate::domain::commands::members::{AddMemberCommand, AddMemberResult, RemoveMemberResult};
use crate::domain::errors::{LedgerError, LedgerResult, ValidationError};
use crate::domain::identity::{merge_account_sources, resolve_account, SourcedAccount};
use crate::domain::models::{MemberAccount, MemberStatus};
use crate::domain::validation::{is_plausible_email, non_blank, non_negative_amount, required_text};
use crate::domain::MAX_COMMIT_ATTEMPTS;
use crate::storage::traits::{
    AccountStorage, AccountWrite, CommitOutcome, Connection, LedgerCommit, LedgerStorage, PaymentStorage,
    RosterStorage,
};

#[derive(Clone)]
pub struct MemberService<C: Connection> {
    account_repository: C::AccountRepository,
    roster_repository: C::RosterRepository,
    payment_repository: C::PaymentRepository,
    ledger_repository: C::LedgerRepository,
    clock: Arc<dyn Clock>,
    locks: AccountLocks,
    change_feed: ChangeFeed,
}

impl<C: Connection> MemberService<C> {
    pub fn new(connection: &C, clock: Arc<dyn Clock>, locks: AccountLocks, change_feed: ChangeFeed) -> Self {
        Self {
            account_repository: connection.create_account_repository(),
            roster_repository: connection.create_roster_repository(),
            payment_repository: connection.create_payment_repository(),
            ledger_repository: connection.create_ledger_repository(),
            clock,
            locks,
            change_feed,
        }
    }

    /// Every member once, with the source it was read from
    pub async fn list_sourced_accounts(&self) -> LedgerResult<Vec<SourcedAccount>> {
        let credentialed = self.account_repository.list_accounts().await?;
        let roster = self.roster_repository.list_roster().await?;
        Ok(merge_account_sources(credentialed, roster))
    }

    pub async fn list_accounts(&self) -> LedgerResult<Vec<MemberAccount>> {
        let accounts = self
            .list_sourced_accounts()
            .await?
            .into_iter()
            .map(|sourced| sourced.account)
            .collect::<Vec<_>>();
        info!("Listed {} member accounts", accounts.len());
        Ok(accounts)
    }

    /// Resolve an id against both sources, credentialed first.
    pub async fn resolve_account(&self, account_id: &str) -> LedgerResult<SourcedAccount> {
        let credentialed = self.account_repository.get_account(account_id).await?;
        let roster = match credentialed {
            Some(_) => None,
            None => self.roster_repository.get_roster_entry(account_id).await?,
        };
        resolve_account(credentialed, roster).ok_or_else(|| LedgerError::AccountNotFound {
            account_id: account_id.to_string(),
        })
    }

    pub async fn get_account(&self, account_id: &str) -> LedgerResult<MemberAccount> {
        Ok(self.resolve_account(account_id).await?.account)
    }

    /// Add a member with initial dues and nothing paid
    pub async fn add_member(&self, command: AddMemberCommand) -> LedgerResult<AddMemberResult> {
        info!("Adding member: flat {}, name {}", command.flat_number, command.name);

        let name = required_text("name", &command.name)?;
        let flat_number = required_text("flatNumber", &command.flat_number)?;
        let email = required_text("email", &command.email)?;
        if !is_plausible_email(&email) {
            return Err(ValidationError::InvalidEmail(email).into());
        }
        let dues = non_negative_amount("initialDues", command.initial_dues)?;
        let id = non_blank(command.id)
            .unwrap_or_else(|| MemberAccount::generate_id(&flat_number, self.clock.now().timestamp_millis()));

        let _guard = self.locks.acquire(&id).await;

        if self.roster_repository.get_roster_entry(&id).await?.is_some() {
            return Err(ValidationError::DuplicateAccount(id).into());
        }

        let account = MemberAccount {
            id: id.clone(),
            name,
            flat_number,
            email,
            status: command.status.unwrap_or(MemberStatus::Active),
            dues,
            paid: rust_decimal::Decimal::ZERO,
            late_fee_assessed_on: None,
            version: 0,
        };

        let outcome = self
            .ledger_repository
            .commit(LedgerCommit {
                writes: vec![AccountWrite::Insert(account.clone())],
                records: vec![],
            })
            .await?;

        match outcome {
            CommitOutcome::Committed => {
                let account = MemberAccount { version: 1, ..account };
                self.change_feed.publish(ChangeEvent::AccountsChanged {
                    account_ids: vec![account.id.clone()],
                });
                info!("Added member {} with dues {}", account.id, account.dues);
                Ok(AddMemberResult {
                    success_message: format!("Member {} added", account.name),
                    account,
                })
            }
            CommitOutcome::AccountExists { account_id } => {
                warn!("Rejected duplicate member id {}", account_id);
                Err(ValidationError::DuplicateAccount(account_id).into())
            }
            other => Err(anyhow::anyhow!("unexpected commit outcome for new member {}: {:?}", id, other).into()),
        }
    }

    /// Remove a member from both sources. Payment records are kept.
    pub async fn remove_member(&self, account_id: &str) -> LedgerResult<RemoveMemberResult> {
        info!("Removing member {}", account_id);
        let _guard = self.locks.acquire(account_id).await;

        for attempt in 1..=MAX_COMMIT_ATTEMPTS {
            let sourced = self.resolve_account(account_id).await?;
            let outcome = self
                .ledger_repository
                .commit(LedgerCommit {
                    writes: vec![AccountWrite::Remove {
                        account_id: account_id.to_string(),
                        expected_version: sourced.account.version,
                    }],
                    records: vec![],
                })
                .await?;

            if outcome == CommitOutcome::Committed {
                let retained_records = self.payment_repository.list_payments_for_account(account_id).await?.len();
                self.change_feed.publish(ChangeEvent::AccountRemoved {
                    account_id: account_id.to_string(),
                });
                info!("Removed member {}, {} payment records retained", account_id, retained_records);
                return Ok(RemoveMemberResult {
                    account_id: account_id.to_string(),
                    retained_records,
                    success_message: format!("Member {} removed", sourced.account.name),
                });
            }
            warn!("Remove of {} hit {:?} on attempt {}", account_id, outcome, attempt);
        }

        Err(LedgerError::ConcurrencyConflict {
            account_id: account_id.to_string(),
        })
    }
}
