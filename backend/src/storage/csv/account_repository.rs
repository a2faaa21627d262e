//! # CSV Account Repository
//!
//! Read side of the credentialed account store `accounts.csv`. Writes only
//! happen through [`super::LedgerRepository`].
//!
//! ```csv
//! id,name,flat_number,email,status,dues,paid,late_fee_assessed_on,version
//! member::a101::1700000000000,Asha Rao,A-101,asha@example.com,Active,450.00,600.00,2025-03,4
//! ```

use anyhow::Result;
use async_trait::async_trait;
use csv::StringRecord;
use std::path::Path;
use tracing::debug;

use super::connection::CsvConnection;
use super::rows::{decimal_field, encode_rows, field, parsed_field, read_rows};
use crate::domain::models::{BillingPeriod, MemberAccount, MemberStatus};
use crate::storage::traits::AccountStorage;

pub(crate) const ACCOUNT_HEADER: [&str; 9] = [
    "id",
    "name",
    "flat_number",
    "email",
    "status",
    "dues",
    "paid",
    "late_fee_assessed_on",
    "version",
];

#[derive(Clone)]
pub struct AccountRepository {
    connection: CsvConnection,
}

impl AccountRepository {
    pub fn new(connection: CsvConnection) -> Self {
        Self { connection }
    }
}

fn parse_account(record: &StringRecord) -> Result<MemberAccount> {
    let late_fee_assessed_on = match field(record, 7, "late_fee_assessed_on")? {
        "" => None,
        _ => Some(parsed_field::<BillingPeriod>(record, 7, "late_fee_assessed_on")?),
    };
    Ok(MemberAccount {
        id: field(record, 0, "id")?.to_string(),
        name: field(record, 1, "name")?.to_string(),
        flat_number: field(record, 2, "flat_number")?.to_string(),
        email: field(record, 3, "email")?.to_string(),
        status: parsed_field::<MemberStatus>(record, 4, "status")?,
        dues: decimal_field(record, 5, "dues")?,
        paid: decimal_field(record, 6, "paid")?,
        late_fee_assessed_on,
        version: parsed_field::<u64>(record, 8, "version")?,
    })
}

pub(crate) fn read_accounts(path: &Path) -> Result<Vec<MemberAccount>> {
    let accounts = read_rows(path)?
        .iter()
        .map(parse_account)
        .collect::<Result<Vec<_>>>()?;
    debug!("Read {} accounts from {}", accounts.len(), path.display());
    Ok(accounts)
}

pub(crate) fn encode_accounts(accounts: &[MemberAccount]) -> Result<Vec<u8>> {
    encode_rows(
        &ACCOUNT_HEADER,
        accounts.iter().map(|account| {
            vec![
                account.id.clone(),
                account.name.clone(),
                account.flat_number.clone(),
                account.email.clone(),
                account.status.as_str().to_string(),
                account.dues.to_string(),
                account.paid.to_string(),
                account
                    .late_fee_assessed_on
                    .map(|period| period.to_string())
                    .unwrap_or_default(),
                account.version.to_string(),
            ]
        }),
    )
}

#[async_trait]
impl AccountStorage for AccountRepository {
    async fn get_account(&self, account_id: &str) -> Result<Option<MemberAccount>> {
        let accounts = read_accounts(&self.connection.accounts_file_path())?;
        Ok(accounts.into_iter().find(|account| account.id == account_id))
    }

    async fn list_accounts(&self) -> Result<Vec<MemberAccount>> {
        read_accounts(&self.connection.accounts_file_path())
    }
}
