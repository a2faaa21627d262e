//! Read-only views over accounts and payment records: the admin dashboard,
//! payment search, CSV exports and receipts.

use anyhow::anyhow;
use csv::Writer;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::info;

use crate::domain::billing_service::BillingService;
use crate::domain::clock::Clock;
use crate::domain::commands::payments::{PaymentSearchQuery, PaymentSearchResult};
use crate::domain::commands::reports::DashboardStats;
use crate::domain::errors::{LedgerError, LedgerResult};
use crate::domain::ledger::is_overdue;
use crate::domain::member_service::MemberService;
use crate::domain::models::{MemberStatus, PaymentRecord};
use crate::domain::receipt::ReceiptRenderer;
use crate::domain::validation::checked_sum;
use crate::storage::traits::{Connection, PaymentStorage};

/// A rendered receipt ready to send
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiptDocument {
    pub file_name: String,
    pub content_type: &'static str,
    pub body: String,
}

#[derive(Clone)]
pub struct ReportingService<C: Connection> {
    payment_repository: C::PaymentRepository,
    member_service: MemberService<C>,
    billing_service: BillingService<C>,
    clock: Arc<dyn Clock>,
    receipt_renderer: Arc<dyn ReceiptRenderer>,
}

impl<C: Connection> ReportingService<C> {
    pub fn new(
        connection: &C,
        member_service: MemberService<C>,
        billing_service: BillingService<C>,
        clock: Arc<dyn Clock>,
        receipt_renderer: Arc<dyn ReceiptRenderer>,
    ) -> Self {
        Self {
            payment_repository: connection.create_payment_repository(),
            member_service,
            billing_service,
            clock,
            receipt_renderer,
        }
    }

    /// Member counts and money totals over the merged roster
    pub async fn dashboard_stats(&self) -> LedgerResult<DashboardStats> {
        let accounts = self.member_service.list_accounts().await?;
        let config = self.billing_service.effective_config().await?;
        let today = self.clock.today();
        let overdue_today = is_overdue(&config, today);

        let stats = DashboardStats {
            total_members: accounts.len(),
            active_members: accounts.iter().filter(|a| a.status == MemberStatus::Active).count(),
            total_collected: checked_sum("totalCollected", accounts.iter().map(|a| a.paid))?,
            total_dues: checked_sum("totalDues", accounts.iter().map(|a| a.dues))?,
            overdue_members: if overdue_today {
                accounts.iter().filter(|a| a.dues > Decimal::ZERO).count()
            } else {
                0
            },
        };
        info!("Dashboard stats: {:?}", stats);
        Ok(stats)
    }

    /// Filter all records, newest first, with totals
    pub async fn search_payments(&self, query: PaymentSearchQuery) -> LedgerResult<PaymentSearchResult> {
        let mut records: Vec<PaymentRecord> = self
            .payment_repository
            .list_payments()
            .await?
            .into_iter()
            .filter(|record| matches_query(record, &query))
            .collect();
        records.sort_by(|a, b| b.date.cmp(&a.date).then(b.created_at.cmp(&a.created_at)));

        let total_amount = checked_sum("totalAmount", records.iter().map(|record| record.amount))?;
        info!("Payment search matched {} records", records.len());
        Ok(PaymentSearchResult {
            count: records.len(),
            total_amount,
            records,
        })
    }

    /// CSV of the records a search returns
    pub async fn export_payments_csv(&self, query: PaymentSearchQuery) -> LedgerResult<String> {
        let result = self.search_payments(query).await?;
        let mut writer = Writer::from_writer(Vec::new());
        write_csv_row(&mut writer, ["Date", "Member", "Flat", "Email", "Amount", "Method", "Receipt"].map(String::from))?;
        for record in &result.records {
            write_csv_row(
                &mut writer,
                [
                    record.date.format("%Y-%m-%d").to_string(),
                    record.member.name.clone(),
                    record.member.flat_number.clone(),
                    record.member.email.clone(),
                    format!("{:.2}", record.amount),
                    record.method.label().to_string(),
                    record.receipt_id.clone(),
                ],
            )?;
        }
        finish_csv(writer)
    }

    /// CSV of the merged roster
    pub async fn export_roster_csv(&self) -> LedgerResult<String> {
        let accounts = self.member_service.list_accounts().await?;
        let mut writer = Writer::from_writer(Vec::new());
        write_csv_row(&mut writer, ["Id", "Name", "Flat", "Email", "Status", "Dues", "Paid"].map(String::from))?;
        for account in &accounts {
            write_csv_row(
                &mut writer,
                [
                    account.id.clone(),
                    account.name.clone(),
                    account.flat_number.clone(),
                    account.email.clone(),
                    account.status.as_str().to_string(),
                    format!("{:.2}", account.dues),
                    format!("{:.2}", account.paid),
                ],
            )?;
        }
        finish_csv(writer)
    }

    pub async fn render_receipt(&self, receipt_id: &str) -> LedgerResult<ReceiptDocument> {
        let record = self
            .payment_repository
            .get_payment(receipt_id)
            .await?
            .ok_or_else(|| LedgerError::PaymentNotFound {
                receipt_id: receipt_id.to_string(),
            })?;
        Ok(ReceiptDocument {
            file_name: self.receipt_renderer.file_name(&record),
            content_type: self.receipt_renderer.content_type(),
            body: self.receipt_renderer.render(&record),
        })
    }
}

fn matches_query(record: &PaymentRecord, query: &PaymentSearchQuery) -> bool {
    if let Some(text) = &query.text {
        if !record.matches_text(text) {
            return false;
        }
    }
    if query.method.is_some_and(|method| method != record.method) {
        return false;
    }
    if query.from.is_some_and(|from| record.date < from) {
        return false;
    }
    if query.to.is_some_and(|to| record.date > to) {
        return false;
    }
    true
}

fn write_csv_row<const N: usize>(writer: &mut Writer<Vec<u8>>, row: [String; N]) -> LedgerResult<()> {
    writer.write_record(&row).map_err(anyhow::Error::from)?;
    Ok(())
}

fn finish_csv(writer: Writer<Vec<u8>>) -> LedgerResult<String> {
    let bytes = writer.into_inner().map_err(|e| anyhow!("flushing csv export: {}", e))?;
    Ok(String::from_utf8(bytes).map_err(anyhow::Error::from)?)
}
