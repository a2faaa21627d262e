//! # CSV Roster Repository
//!
//! The legacy flat roster `roster.csv`, kept from before members had
//! credentialed accounts. It has no version or late-fee columns:
//!
//! ```csv
//! id,name,flat_number,email,status,dues,paid
//! ```

use anyhow::Result;
use async_trait::async_trait;
use csv::StringRecord;
use std::path::Path;

use super::connection::CsvConnection;
use super::rows::{decimal_field, encode_rows, field, parsed_field, read_rows};
use crate::domain::models::{MemberAccount, MemberStatus};
use crate::storage::traits::RosterStorage;

pub(crate) const ROSTER_HEADER: [&str; 7] = ["id", "name", "flat_number", "email", "status", "dues", "paid"];

#[derive(Clone)]
pub struct RosterRepository {
    connection: CsvConnection,
}

impl RosterRepository {
    pub fn new(connection: CsvConnection) -> Self {
        Self { connection }
    }
}

fn parse_roster_entry(record: &StringRecord) -> Result<MemberAccount> {
    let status = match field(record, 4, "status")? {
        "" => MemberStatus::Active,
        _ => parsed_field::<MemberStatus>(record, 4, "status")?,
    };
    Ok(MemberAccount {
        id: field(record, 0, "id")?.to_string(),
        name: field(record, 1, "name")?.to_string(),
        flat_number: field(record, 2, "flat_number")?.to_string(),
        email: field(record, 3, "email")?.to_string(),
        status,
        dues: decimal_field(record, 5, "dues")?,
        paid: decimal_field(record, 6, "paid")?,
        late_fee_assessed_on: None,
        version: 0,
    })
}

pub(crate) fn read_roster(path: &Path) -> Result<Vec<MemberAccount>> {
    read_rows(path)?.iter().map(parse_roster_entry).collect()
}

pub(crate) fn encode_roster(entries: &[MemberAccount]) -> Result<Vec<u8>> {
    encode_rows(
        &ROSTER_HEADER,
        entries.iter().map(|entry| {
            vec![
                entry.id.clone(),
                entry.name.clone(),
                entry.flat_number.clone(),
                entry.email.clone(),
                entry.status.as_str().to_string(),
                entry.dues.to_string(),
                entry.paid.to_string(),
            ]
        }),
    )
}

#[async_trait]
impl RosterStorage for RosterRepository {
    async fn get_roster_entry(&self, account_id: &str) -> Result<Option<MemberAccount>> {
        let entries = read_roster(&self.connection.roster_file_path())?;
        Ok(entries.into_iter().find(|entry| entry.id == account_id))
    }

    async fn list_roster(&self) -> Result<Vec<MemberAccount>> {
        read_roster(&self.connection.roster_file_path())
    }
}
