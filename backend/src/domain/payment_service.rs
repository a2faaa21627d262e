//! Payments and dues corrections.
//!
//! Each operation runs under the account's lock as read, apply the ledger
//! rule, commit. A commit that loses a version race is retried against a
//! fresh snapshot, up to [`MAX_COMMIT_ATTEMPTS`] times.

use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::account_locks::AccountLocks;
use crate::domain::billing_service::BillingService;
use crate::domain::change_feed::{ChangeEvent, ChangeFeed};
use crate::domain::clock::Clock;
use crate::domain::commands::payments::{
    CorrectDuesCommand, CorrectDuesResult, DeletePaymentResult, PaymentListQuery, RecordPaymentCommand,
    RecordPaymentResult,
};
use crate::domain::commands::reports::MemberBill;
use crate::domain::errors::{LedgerError, LedgerResult};
use crate::domain::ledger::{allowed_max, apply_manual_correction, apply_payment, assess_late_fee, PostingContext};
use crate::domain::member_service::MemberService;
use crate::domain::models::{MemberAccount, PaymentRecord};
use crate::domain::MAX_COMMIT_ATTEMPTS;
use crate::storage::traits::{AccountWrite, CommitOutcome, Connection, LedgerCommit, LedgerStorage, PaymentStorage};

#[derive(Clone)]
pub struct PaymentService<C: Connection> {
    payment_repository: C::PaymentRepository,
    ledger_repository: C::LedgerRepository,
    member_service: MemberService<C>,
    billing_service: BillingService<C>,
    clock: Arc<dyn Clock>,
    locks: AccountLocks,
    change_feed: ChangeFeed,
}

/// What happened to one commit attempt
enum Attempt<T> {
    Done(T),
    Retry(String),
}

impl<C: Connection> PaymentService<C> {
    pub fn new(
        connection: &C,
        member_service: MemberService<C>,
        billing_service: BillingService<C>,
        clock: Arc<dyn Clock>,
        locks: AccountLocks,
        change_feed: ChangeFeed,
    ) -> Self {
        Self {
            payment_repository: connection.create_payment_repository(),
            ledger_repository: connection.create_ledger_repository(),
            member_service,
            billing_service,
            clock,
            locks,
            change_feed,
        }
    }

    /// Record a member payment against the account's dues
    pub async fn record_payment(&self, command: RecordPaymentCommand) -> LedgerResult<RecordPaymentResult> {
        info!(
            "Recording payment of {} by {} for account {}",
            command.amount, command.method, command.account_id
        );
        let _guard = self.locks.acquire(&command.account_id).await;
        let config = self.billing_service.effective_config().await?;
        let mut ctx = PostingContext::new(self.clock.today(), self.clock.now());

        let mut last_conflict = command.account_id.clone();
        for attempt in 1..=MAX_COMMIT_ATTEMPTS {
            let sourced = self.member_service.resolve_account(&command.account_id).await?;
            let outcome = apply_payment(&sourced.account, command.amount, command.method, &config, &ctx)
                .map_err(|e| {
                    warn!("Rejected payment for {}: {}", command.account_id, e);
                    e
                })?;

            match self
                .commit_one(outcome.updated_account, vec![outcome.record.clone()], &mut ctx)
                .await?
            {
                Attempt::Done(account) => {
                    let record = outcome.record;
                    self.change_feed.publish(ChangeEvent::PaymentRecorded {
                        receipt_id: record.receipt_id.clone(),
                        account_id: account.id.clone(),
                    });
                    info!(
                        "Recorded payment {} of {} for {}; dues now {}, late fee {}",
                        record.receipt_id, record.amount, account.id, account.dues, record.late_fee_added_to_dues
                    );
                    return Ok(RecordPaymentResult {
                        success_message: format!("Payment of {:.2} recorded. Receipt {}", record.amount, record.receipt_id),
                        record,
                        account,
                    });
                }
                Attempt::Retry(account_id) => {
                    warn!("Payment commit for {} retried (attempt {})", account_id, attempt);
                    last_conflict = account_id;
                }
            }
        }

        Err(LedgerError::ConcurrencyConflict {
            account_id: last_conflict,
        })
    }

    /// Admin edit of an account's dues and descriptive fields
    pub async fn correct_dues(&self, command: CorrectDuesCommand) -> LedgerResult<CorrectDuesResult> {
        info!("Correcting dues of {} to {}", command.account_id, command.correction.new_dues);
        let _guard = self.locks.acquire(&command.account_id).await;
        let mut ctx = PostingContext::new(self.clock.today(), self.clock.now());

        let mut last_conflict = command.account_id.clone();
        for attempt in 1..=MAX_COMMIT_ATTEMPTS {
            let sourced = self.member_service.resolve_account(&command.account_id).await?;
            let outcome = apply_manual_correction(&sourced.account, command.correction.clone(), &ctx).map_err(|e| {
                warn!("Rejected correction for {}: {}", command.account_id, e);
                e
            })?;
            let records: Vec<PaymentRecord> = outcome.record.iter().cloned().collect();

            match self.commit_one(outcome.updated_account, records, &mut ctx).await? {
                Attempt::Done(account) => {
                    let record = outcome.record;
                    if let Some(record) = &record {
                        self.change_feed.publish(ChangeEvent::PaymentRecorded {
                            receipt_id: record.receipt_id.clone(),
                            account_id: account.id.clone(),
                        });
                    }
                    info!(
                        "Corrected account {}: dues {}, paid {}, delta {}",
                        account.id, account.dues, account.paid, outcome.payment_delta
                    );
                    let success_message = match &record {
                        Some(record) => format!(
                            "Dues updated. {:.2} recorded as Manual Edit payment {}",
                            record.amount, record.receipt_id
                        ),
                        None => "Dues updated".to_string(),
                    };
                    return Ok(CorrectDuesResult {
                        account,
                        record,
                        success_message,
                    });
                }
                Attempt::Retry(account_id) => {
                    warn!("Correction commit for {} retried (attempt {})", account_id, attempt);
                    last_conflict = account_id;
                }
            }
        }

        Err(LedgerError::ConcurrencyConflict {
            account_id: last_conflict,
        })
    }

    /// Commit one account with its records. A duplicate receipt id gets a
    /// fresh id in `ctx` and a retry.
    async fn commit_one(
        &self,
        mut account: MemberAccount,
        records: Vec<PaymentRecord>,
        ctx: &mut PostingContext,
    ) -> LedgerResult<Attempt<MemberAccount>> {
        let write = AccountWrite::persist(account.clone());
        let resulting_version = write.resulting_version();
        let outcome = self
            .ledger_repository
            .commit(LedgerCommit {
                writes: vec![write],
                records,
            })
            .await?;

        Ok(match outcome {
            CommitOutcome::Committed => {
                account.version = resulting_version.unwrap_or(account.version);
                self.change_feed.publish(ChangeEvent::AccountsChanged {
                    account_ids: vec![account.id.clone()],
                });
                Attempt::Done(account)
            }
            CommitOutcome::DuplicateReceipt { receipt_id } => {
                warn!("Receipt id {} already used, generating another", receipt_id);
                ctx.receipt_id = PaymentRecord::generate_receipt_id(ctx.today);
                Attempt::Retry(account.id)
            }
            CommitOutcome::VersionConflict { account_id } | CommitOutcome::AccountExists { account_id } => {
                Attempt::Retry(account_id)
            }
        })
    }

    /// Payment history of one account ordered by date, ties by creation time.
    /// With a limit, the most recent records are kept.
    pub async fn list_payments_for_account(&self, query: PaymentListQuery) -> LedgerResult<Vec<PaymentRecord>> {
        let mut records = self
            .payment_repository
            .list_payments_for_account(&query.account_id)
            .await?;
        records.sort_by(|a, b| a.date.cmp(&b.date).then(a.created_at.cmp(&b.created_at)));
        if let Some(limit) = query.limit {
            let skip = records.len().saturating_sub(limit);
            records.drain(..skip);
        }
        info!("Listed {} payments for {}", records.len(), query.account_id);
        Ok(records)
    }

    pub async fn get_payment(&self, receipt_id: &str) -> LedgerResult<PaymentRecord> {
        self.payment_repository
            .get_payment(receipt_id)
            .await?
            .ok_or_else(|| LedgerError::PaymentNotFound {
                receipt_id: receipt_id.to_string(),
            })
    }

    /// Admin audit correction: remove a record. Balances are left as they are.
    pub async fn delete_payment(&self, receipt_id: &str, editor: &str) -> LedgerResult<DeletePaymentResult> {
        let record = self.get_payment(receipt_id).await?;
        let _guard = self.locks.acquire(&record.account_id).await;

        if !self.payment_repository.delete_payment(receipt_id).await? {
            return Err(LedgerError::PaymentNotFound {
                receipt_id: receipt_id.to_string(),
            });
        }
        warn!(
            target: "audit",
            "Payment {} ({} {} for account {}) deleted by {}",
            record.receipt_id, record.amount, record.method, record.account_id, editor
        );
        self.change_feed.publish(ChangeEvent::PaymentDeleted {
            receipt_id: receipt_id.to_string(),
        });
        Ok(DeletePaymentResult {
            receipt_id: receipt_id.to_string(),
            success_message: format!("Payment {} deleted", receipt_id),
        })
    }

    /// The member's bill as of today
    pub async fn member_bill(&self, account_id: &str) -> LedgerResult<MemberBill> {
        let account = self.member_service.get_account(account_id).await?;
        let config = self.billing_service.effective_config().await?;
        let today = self.clock.today();
        let assessment = assess_late_fee(&account, &config, today);
        let max_payable = allowed_max(&account, &config, today)?;
        let monthly_total = config.monthly_total()?;

        Ok(MemberBill {
            account_id: account.id,
            as_of: today,
            period: assessment.period,
            dues: account.dues,
            paid: account.paid,
            maintenance_charge: config.maintenance_charge,
            water_charge: config.water_charge,
            sinking_fund: config.sinking_fund,
            monthly_total,
            due_day: config.effective_due_day_of_month(),
            is_late: assessment.is_late,
            late_fee_applies: assessment.applies,
            late_fee: assessment.fee,
            max_payable,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clock::FixedClock;
    use crate::domain::commands::billing::SaveBillingConfigCommand;
    use crate::domain::ledger::DuesCorrection;
    use crate::domain::models::{BillingConfigDraft, BillingPeriod, PaymentMethod};
    use crate::storage::csv::test_utils::{sample_account, TestEnvironment};
    use crate::storage::{AccountStorage, CsvConnection};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    async fn service_on(env: &TestEnvironment, today: NaiveDate) -> PaymentService<CsvConnection> {
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::on(today));
        let locks = AccountLocks::new();
        let feed = ChangeFeed::new();
        let members = MemberService::new(&env.connection, clock.clone(), locks.clone(), feed.clone());
        let billing = BillingService::new(&env.connection, members.clone(), clock.clone(), locks.clone(), feed.clone());
        billing
            .save_billing_config(SaveBillingConfigCommand {
                draft: BillingConfigDraft {
                    maintenance_charge: dec!(1000),
                    water_charge: dec!(300),
                    sinking_fund: dec!(200),
                    late_fee: dec!(50),
                    due_date: Some("10".to_string()),
                    due_date_iso: None,
                    contact_email: None,
                },
                apply_cycle_charge: false,
            })
            .await
            .unwrap();
        PaymentService::new(&env.connection, members, billing, clock, locks, feed)
    }

    fn march(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
    }

    fn pay(account_id: &str, amount: Decimal) -> RecordPaymentCommand {
        RecordPaymentCommand {
            account_id: account_id.to_string(),
            amount,
            method: PaymentMethod::Upi,
        }
    }

    #[tokio::test]
    async fn test_late_payment_is_persisted_with_record() {
        let env = TestEnvironment::new().await.unwrap();
        env.seed_account(sample_account("m1", "Asha", dec!(1000))).await.unwrap();
        let service = service_on(&env, march(15)).await;

        let result = service.record_payment(pay("m1", dec!(600))).await.unwrap();
        assert_eq!(result.account.dues, dec!(450));
        assert_eq!(result.account.paid, dec!(600));
        assert_eq!(result.account.version, 2);
        assert_eq!(result.record.late_fee_added_to_dues, dec!(50));
        assert!(result.record.receipt_id.starts_with("RCPT-20250315-"));

        let stored = env.connection.create_account_repository().get_account("m1").await.unwrap().unwrap();
        assert_eq!(stored, result.account);
        assert_eq!(stored.late_fee_assessed_on, Some(BillingPeriod { year: 2025, month: 3 }));

        let history = service
            .list_payments_for_account(PaymentListQuery {
                account_id: "m1".to_string(),
                limit: None,
            })
            .await
            .unwrap();
        assert_eq!(history, vec![result.record]);
    }

    #[tokio::test]
    async fn test_rejected_payment_changes_nothing() {
        let env = TestEnvironment::new().await.unwrap();
        env.seed_account(sample_account("m1", "Asha", dec!(100))).await.unwrap();
        let service = service_on(&env, march(5)).await;

        let err = service.record_payment(pay("m1", dec!(150))).await.unwrap_err();
        assert_eq!(err.to_string(), "Amount exceeds due. Max payable is ₹100.00");

        let stored = env.connection.create_account_repository().get_account("m1").await.unwrap().unwrap();
        assert_eq!(stored.dues, dec!(100));
        assert_eq!(stored.version, 1);
        assert!(service
            .list_payments_for_account(PaymentListQuery {
                account_id: "m1".to_string(),
                limit: None
            })
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_payment_adopts_roster_account() {
        let env = TestEnvironment::new().await.unwrap();
        env.seed_roster(&[sample_account("r1", "Kiran", dec!(1500))]).unwrap();
        let service = service_on(&env, march(5)).await;

        let result = service.record_payment(pay("r1", dec!(500))).await.unwrap();
        assert_eq!(result.account.version, 1);
        assert_eq!(result.account.dues, dec!(1000));

        let accounts = service.member_service.list_sourced_accounts().await.unwrap();
        assert_eq!(accounts.len(), 1);
        assert!(accounts[0].is_adopted());
        assert_eq!(accounts[0].account.dues, dec!(1000));
    }

    #[tokio::test]
    async fn test_payment_for_unknown_or_anonymous_account() {
        let env = TestEnvironment::new().await.unwrap();
        let mut anonymous = sample_account("r1", "Kiran", dec!(100));
        anonymous.email = String::new();
        env.seed_roster(&[anonymous]).unwrap();
        let service = service_on(&env, march(5)).await;

        assert!(matches!(
            service.record_payment(pay("ghost", dec!(1))).await,
            Err(LedgerError::AccountNotFound { .. })
        ));
        assert!(matches!(
            service.record_payment(pay("r1", dec!(1))).await,
            Err(LedgerError::MissingIdentity { .. })
        ));
    }

    #[tokio::test]
    async fn test_concurrent_payments_conserve_money() {
        let env = TestEnvironment::new().await.unwrap();
        env.seed_account(sample_account("m1", "Asha", dec!(1000))).await.unwrap();
        let service = service_on(&env, march(5)).await;

        let mut handles = Vec::new();
        for _ in 0..5 {
            let service = service.clone();
            handles.push(tokio::spawn(async move { service.record_payment(pay("m1", dec!(100))).await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let stored = env.connection.create_account_repository().get_account("m1").await.unwrap().unwrap();
        assert_eq!(stored.dues, dec!(500));
        assert_eq!(stored.paid, dec!(500));
        assert_eq!(stored.version, 6);
        let history = service
            .list_payments_for_account(PaymentListQuery {
                account_id: "m1".to_string(),
                limit: None,
            })
            .await
            .unwrap();
        let total: Decimal = history.iter().map(|r| r.amount).sum();
        assert_eq!(total, stored.paid);
    }

    #[tokio::test]
    async fn test_history_limit_keeps_most_recent() {
        let env = TestEnvironment::new().await.unwrap();
        env.seed_account(sample_account("m1", "Asha", dec!(1000))).await.unwrap();
        let service = service_on(&env, march(5)).await;
        for amount in [dec!(1), dec!(2), dec!(3)] {
            service.record_payment(pay("m1", amount)).await.unwrap();
        }
        let history = service
            .list_payments_for_account(PaymentListQuery {
                account_id: "m1".to_string(),
                limit: Some(2),
            })
            .await
            .unwrap();
        let amounts: Vec<_> = history.iter().map(|r| r.amount).collect();
        assert_eq!(amounts, vec![dec!(2), dec!(3)]);
    }

    #[tokio::test]
    async fn test_correction_books_manual_edit() {
        let env = TestEnvironment::new().await.unwrap();
        let mut account = sample_account("m1", "Asha", dec!(500));
        account.paid = dec!(200);
        env.seed_account(account).await.unwrap();
        let service = service_on(&env, march(5)).await;

        let result = service
            .correct_dues(CorrectDuesCommand {
                account_id: "m1".to_string(),
                correction: DuesCorrection {
                    new_dues: dec!(300),
                    ..Default::default()
                },
            })
            .await
            .unwrap();
        assert_eq!(result.account.paid, dec!(400));
        let record = result.record.unwrap();
        assert_eq!(record.method, PaymentMethod::ManualEdit);
        assert_eq!(service.get_payment(&record.receipt_id).await.unwrap(), record);

        let raised = service
            .correct_dues(CorrectDuesCommand {
                account_id: "m1".to_string(),
                correction: DuesCorrection {
                    new_dues: dec!(700),
                    ..Default::default()
                },
            })
            .await
            .unwrap();
        assert!(raised.record.is_none());
        assert_eq!(raised.account.paid, dec!(400));
        assert_eq!(raised.account.version, 3);
    }

    #[tokio::test]
    async fn test_delete_payment_keeps_balances() {
        let env = TestEnvironment::new().await.unwrap();
        env.seed_account(sample_account("m1", "Asha", dec!(1000))).await.unwrap();
        let service = service_on(&env, march(5)).await;
        let paid = service.record_payment(pay("m1", dec!(400))).await.unwrap();

        service.delete_payment(&paid.record.receipt_id, "admin-1").await.unwrap();
        assert!(matches!(
            service.get_payment(&paid.record.receipt_id).await,
            Err(LedgerError::PaymentNotFound { .. })
        ));
        let stored = env.connection.create_account_repository().get_account("m1").await.unwrap().unwrap();
        assert_eq!(stored.dues, dec!(600));
        assert!(matches!(
            service.delete_payment(&paid.record.receipt_id, "admin-1").await,
            Err(LedgerError::PaymentNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_member_bill_previews_late_fee() {
        let env = TestEnvironment::new().await.unwrap();
        env.seed_account(sample_account("m1", "Asha", dec!(1000))).await.unwrap();
        let late = service_on(&env, march(11)).await;
        let bill = late.member_bill("m1").await.unwrap();
        assert!(bill.is_late);
        assert!(bill.late_fee_applies);
        assert_eq!(bill.max_payable, dec!(1050));
        assert_eq!(bill.monthly_total, dec!(1500));
        assert_eq!(bill.due_day, Some(10));

        let on_time = service_on(&env, march(10)).await;
        let bill = on_time.member_bill("m1").await.unwrap();
        assert!(!bill.late_fee_applies);
        assert_eq!(bill.max_payable, dec!(1000));
    }
}
