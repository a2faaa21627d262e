//! Process configuration read from `SOCIETY_LEDGER_*` environment variables.

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::storage::CsvConnection;

pub const DATA_DIR_VAR: &str = "SOCIETY_LEDGER_DATA_DIR";
pub const BIND_VAR: &str = "SOCIETY_LEDGER_BIND";
pub const CORS_ORIGIN_VAR: &str = "SOCIETY_LEDGER_CORS_ORIGIN";
pub const CURRENCY_VAR: &str = "SOCIETY_LEDGER_CURRENCY";
pub const SOCIETY_NAME_VAR: &str = "SOCIETY_LEDGER_SOCIETY_NAME";

const DEFAULT_BIND: &str = "127.0.0.1:3000";
const DEFAULT_CORS_ORIGIN: &str = "http://localhost:8080";
const DEFAULT_CURRENCY: &str = "₹";
const DEFAULT_SOCIETY_NAME: &str = "FlatMate Society";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub bind_address: SocketAddr,
    /// Frontend origin allowed by CORS
    pub cors_origin: String,
    /// Symbol printed before amounts on receipts
    pub currency: String,
    pub society_name: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unset or blank keys take their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let data_dir = match value(DATA_DIR_VAR) {
            Some(dir) => PathBuf::from(dir),
            None => CsvConnection::default_data_directory()?,
        };
        let bind = value(BIND_VAR).unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind_address = bind
            .parse::<SocketAddr>()
            .with_context(|| format!("{} is not a socket address: {}", BIND_VAR, bind))?;

        Ok(Self {
            data_dir,
            bind_address,
            cors_origin: value(CORS_ORIGIN_VAR).unwrap_or_else(|| DEFAULT_CORS_ORIGIN.to_string()),
            currency: value(CURRENCY_VAR).unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            society_name: value(SOCIETY_NAME_VAR).unwrap_or_else(|| DEFAULT_SOCIETY_NAME.to_string()),
        })
    }
}
