//! Billing configuration and cycle charges.

use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::domain::account_locks::AccountLocks;
use crate::domain::change_feed::{ChangeEvent, ChangeFeed};
use crate::domain::clock::Clock;
use crate::domain::commands::billing::{ApplyCycleChargeResult, SaveBillingConfigCommand, SaveBillingConfigResult};
use crate::domain::errors::{LedgerError, LedgerResult, ValidationError};
use crate::domain::ledger::apply_billing_cycle;
use crate::domain::member_service::MemberService;
use crate::domain::models::BillingConfig;
use crate::domain::MAX_COMMIT_ATTEMPTS;
use crate::storage::traits::{AccountWrite, BillingConfigStorage, CommitOutcome, Connection, LedgerCommit, LedgerStorage};

#[derive(Clone)]
pub struct BillingService<C: Connection> {
    billing_config_repository: C::BillingConfigRepository,
    ledger_repository: C::LedgerRepository,
    member_service: MemberService<C>,
    clock: Arc<dyn Clock>,
    locks: AccountLocks,
    change_feed: ChangeFeed,
    /// One config save or cycle charge at a time
    writer: Arc<Mutex<()>>,
}

impl<C: Connection> BillingService<C> {
    pub fn new(
        connection: &C,
        member_service: MemberService<C>,
        clock: Arc<dyn Clock>,
        locks: AccountLocks,
        change_feed: ChangeFeed,
    ) -> Self {
        Self {
            billing_config_repository: connection.create_billing_config_repository(),
            ledger_repository: connection.create_ledger_repository(),
            member_service,
            clock,
            locks,
            change_feed,
            writer: Arc::new(Mutex::new(())),
        }
    }

    pub async fn get_billing_config(&self) -> LedgerResult<Option<BillingConfig>> {
        Ok(self.billing_config_repository.get_billing_config().await?)
    }

    /// Config the ledger rules run against. Before an admin saves one,
    /// everything is zero and no due day is set.
    pub async fn effective_config(&self) -> LedgerResult<BillingConfig> {
        Ok(self.get_billing_config().await?.unwrap_or_else(|| BillingConfig {
            maintenance_charge: Decimal::ZERO,
            water_charge: Decimal::ZERO,
            sinking_fund: Decimal::ZERO,
            late_fee: Decimal::ZERO,
            due_day: None,
            due_date_iso: None,
            contact_email: None,
            updated_at: self.clock.now(),
        }))
    }

    /// Validate and store the config, then optionally charge the cycle.
    ///
    /// The config is stored before the charge. If the charge fails the saved
    /// config stays and the charge can be re-run with
    /// [`BillingService::apply_stored_cycle_charge`].
    pub async fn save_billing_config(&self, command: SaveBillingConfigCommand) -> LedgerResult<SaveBillingConfigResult> {
        info!("Saving billing config: {:?}", command.draft);
        let config = BillingConfig::validate(command.draft, self.clock.now()).map_err(|e| {
            warn!("Rejected billing config: {}", e);
            e
        })?;
        let monthly_total = config.monthly_total()?;

        let _writer = self.writer.lock().await;
        self.billing_config_repository.save_billing_config(&config).await?;
        self.change_feed.publish(ChangeEvent::BillingConfigSaved);
        info!(
            "Billing config saved, monthly total {}, due day {:?}",
            monthly_total,
            config.effective_due_day_of_month()
        );

        if !command.apply_cycle_charge {
            return Ok(SaveBillingConfigResult {
                config,
                charged_accounts: None,
                success_message: "Billing configuration saved".to_string(),
            });
        }

        let charged = self.charge_cycle(&config).await?;
        Ok(SaveBillingConfigResult {
            success_message: format!(
                "Billing configuration saved and {} charged to {} members",
                monthly_total,
                charged
            ),
            config,
            charged_accounts: Some(charged),
        })
    }

    /// Add the monthly total of `config` to every member's dues
    pub async fn apply_cycle_charge(&self, config: &BillingConfig) -> LedgerResult<ApplyCycleChargeResult> {
        let monthly_total = config.monthly_total()?;
        let _writer = self.writer.lock().await;
        let count = self.charge_cycle(config).await?;
        Ok(ApplyCycleChargeResult {
            count,
            monthly_total,
            success_message: format!("Charged {} to {} members", monthly_total, count),
        })
    }

    /// Cycle charge with the stored config
    pub async fn apply_stored_cycle_charge(&self) -> LedgerResult<ApplyCycleChargeResult> {
        let config = self
            .get_billing_config()
            .await?
            .ok_or(ValidationError::MissingBillingConfig)?;
        self.apply_cycle_charge(&config).await
    }

    async fn charge_cycle(&self, config: &BillingConfig) -> LedgerResult<usize> {
        let ids: Vec<String> = self
            .member_service
            .list_sourced_accounts()
            .await?
            .into_iter()
            .map(|sourced| sourced.account.id)
            .collect();
        let _guards = self.locks.acquire_many(&ids).await;

        let mut last_conflict = None;
        for attempt in 1..=MAX_COMMIT_ATTEMPTS {
            let accounts: Vec<_> = self
                .member_service
                .list_sourced_accounts()
                .await?
                .into_iter()
                .map(|sourced| sourced.account)
                .collect();
            let outcome = apply_billing_cycle(config, &accounts)?;
            let count = outcome.updated_accounts.len();
            let account_ids: Vec<String> = outcome.updated_accounts.iter().map(|a| a.id.clone()).collect();

            let commit = LedgerCommit {
                writes: outcome.updated_accounts.into_iter().map(AccountWrite::persist).collect(),
                records: outcome.audit_records,
            };
            match self.ledger_repository.commit(commit).await? {
                CommitOutcome::Committed => {
                    if count > 0 {
                        self.change_feed.publish(ChangeEvent::AccountsChanged { account_ids });
                    }
                    info!("Applied cycle charge of {} to {} accounts", outcome.charge_per_account, count);
                    return Ok(count);
                }
                CommitOutcome::VersionConflict { account_id } | CommitOutcome::AccountExists { account_id } => {
                    warn!("Cycle charge conflicted on {} (attempt {})", account_id, attempt);
                    last_conflict = Some(account_id);
                }
                CommitOutcome::DuplicateReceipt { receipt_id } => {
                    return Err(anyhow::anyhow!("cycle charge produced receipt {}", receipt_id).into());
                }
            }
        }

        Err(LedgerError::ConcurrencyConflict {
            account_id: last_conflict.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clock::FixedClock;
    use crate::domain::models::BillingConfigDraft;
    use crate::storage::csv::test_utils::{sample_account, TestEnvironment};
    use crate::storage::{CsvConnection, PaymentStorage};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn service(env: &TestEnvironment) -> BillingService<CsvConnection> {
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::on(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()));
        let locks = AccountLocks::new();
        let feed = ChangeFeed::new();
        let members = MemberService::new(&env.connection, clock.clone(), locks.clone(), feed.clone());
        BillingService::new(&env.connection, members, clock, locks, feed)
    }

    fn draft() -> BillingConfigDraft {
        BillingConfigDraft {
            maintenance_charge: dec!(1000),
            water_charge: dec!(300),
            sinking_fund: dec!(200),
            late_fee: dec!(50),
            due_date: Some("15".to_string()),
            due_date_iso: Some("2025-03-20".to_string()),
            contact_email: None,
        }
    }

    #[tokio::test]
    async fn test_save_without_charge() {
        let env = TestEnvironment::new().await.unwrap();
        env.seed_account(sample_account("m1", "Asha", dec!(0))).await.unwrap();
        let service = service(&env);

        let result = service
            .save_billing_config(SaveBillingConfigCommand {
                draft: draft(),
                apply_cycle_charge: false,
            })
            .await
            .unwrap();
        assert_eq!(result.charged_accounts, None);
        assert_eq!(result.config.due_day, Some(20));
        assert_eq!(service.get_billing_config().await.unwrap(), Some(result.config));
        assert_eq!(service.member_service.get_account("m1").await.unwrap().dues, dec!(0));
    }

    #[tokio::test]
    async fn test_save_and_charge_adopts_roster_members() {
        let env = TestEnvironment::new().await.unwrap();
        env.seed_account(sample_account("m1", "Asha", dec!(0))).await.unwrap();
        env.seed_account(sample_account("m2", "Ravi", dec!(250))).await.unwrap();
        env.seed_roster(&[sample_account("r3", "Kiran", dec!(1000))]).unwrap();
        let service = service(&env);

        let result = service
            .save_billing_config(SaveBillingConfigCommand {
                draft: draft(),
                apply_cycle_charge: true,
            })
            .await
            .unwrap();
        assert_eq!(result.charged_accounts, Some(3));

        let accounts = service.member_service.list_sourced_accounts().await.unwrap();
        let dues: Vec<_> = accounts.iter().map(|s| s.account.dues).collect();
        assert_eq!(dues, vec![dec!(1500), dec!(1750), dec!(2500)]);
        assert!(accounts.iter().all(|s| s.is_adopted()));
        assert_eq!(accounts[2].account.version, 1);
        assert!(env.connection.create_payment_repository().list_payments().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_config_stores_nothing() {
        let env = TestEnvironment::new().await.unwrap();
        let service = service(&env);
        let mut bad = draft();
        bad.late_fee = dec!(-1);
        assert!(matches!(
            service
                .save_billing_config(SaveBillingConfigCommand {
                    draft: bad,
                    apply_cycle_charge: true,
                })
                .await,
            Err(LedgerError::Validation(_))
        ));
        assert!(service.get_billing_config().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_huge_charge_is_rejected_before_saving() {
        let env = TestEnvironment::new().await.unwrap();
        env.seed_account(sample_account("m1", "Asha", dec!(0))).await.unwrap();
        let service = service(&env);
        let mut huge = draft();
        huge.maintenance_charge = Decimal::MAX;
        huge.water_charge = dec!(1);
        assert!(matches!(
            service
                .save_billing_config(SaveBillingConfigCommand {
                    draft: huge,
                    apply_cycle_charge: true,
                })
                .await,
            Err(LedgerError::Validation(ValidationError::AmountTooLarge { .. }))
        ));
        assert!(service.get_billing_config().await.unwrap().is_none());
        assert_eq!(service.member_service.get_account("m1").await.unwrap().dues, dec!(0));
    }

    #[tokio::test]
    async fn test_cycle_charge_overflow_leaves_dues_unchanged() {
        let env = TestEnvironment::new().await.unwrap();
        env.seed_account(sample_account("m1", "Asha", dec!(0))).await.unwrap();
        env.seed_account(sample_account("m2", "Ravi", Decimal::MAX)).await.unwrap();
        let service = service(&env);
        let config = BillingConfig::validate(draft(), chrono::Utc::now()).unwrap();

        assert!(matches!(
            service.apply_cycle_charge(&config).await,
            Err(LedgerError::Validation(ValidationError::AmountTooLarge { field: "dues" }))
        ));
        assert_eq!(service.member_service.get_account("m1").await.unwrap().dues, dec!(0));
        assert_eq!(service.member_service.get_account("m2").await.unwrap().dues, Decimal::MAX);
    }

    #[tokio::test]
    async fn test_stored_cycle_charge_requires_config() {
        let env = TestEnvironment::new().await.unwrap();
        let service = service(&env);
        assert!(matches!(
            service.apply_stored_cycle_charge().await,
            Err(LedgerError::Validation(ValidationError::MissingBillingConfig))
        ));
    }

    #[tokio::test]
    async fn test_cycle_charge_on_empty_roster() {
        let env = TestEnvironment::new().await.unwrap();
        let service = service(&env);
        let config = BillingConfig::validate(draft(), chrono::Utc::now()).unwrap();
        let result = service.apply_cycle_charge(&config).await.unwrap();
        assert_eq!(result.count, 0);
        assert_eq!(result.monthly_total, dec!(1500));
    }
}
