use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use super::{
    AccountRepository, BillingConfigRepository, LedgerRepository, PaymentRepository, RosterRepository,
};
use crate::storage::traits::Connection;

pub const ACCOUNTS_FILE: &str = "accounts.csv";
pub const ROSTER_FILE: &str = "roster.csv";
pub const PAYMENTS_FILE: &str = "payments.csv";
pub const BILLING_CONFIG_FILE: &str = "billing_config.yaml";

/// CsvConnection owns the data directory and serializes every write to it
#[derive(Clone)]
pub struct CsvConnection {
    base_directory: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl CsvConnection {
    /// Create a new CSV connection with a base directory
    pub fn new<P: AsRef<Path>>(base_directory: P) -> Result<Self> {
        let base_path = base_directory.as_ref().to_path_buf();

        if !base_path.exists() {
            fs::create_dir_all(&base_path)
                .with_context(|| format!("creating data directory {}", base_path.display()))?;
            info!("Created data directory: {}", base_path.display());
        }

        Ok(Self {
            base_directory: base_path,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    /// ~/Documents/Society Ledger
    pub fn default_data_directory() -> Result<PathBuf> {
        let home_dir = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .map_err(|_| anyhow::anyhow!("Could not determine home directory"))?;
        Ok(PathBuf::from(home_dir).join("Documents").join("Society Ledger"))
    }

    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    pub fn accounts_file_path(&self) -> PathBuf {
        self.base_directory.join(ACCOUNTS_FILE)
    }

    pub fn roster_file_path(&self) -> PathBuf {
        self.base_directory.join(ROSTER_FILE)
    }

    pub fn payments_file_path(&self) -> PathBuf {
        self.base_directory.join(PAYMENTS_FILE)
    }

    pub fn billing_config_file_path(&self) -> PathBuf {
        self.base_directory.join(BILLING_CONFIG_FILE)
    }

    /// Held for the whole read-check-write of any mutation
    pub async fn write_guard(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().await
    }
}

/// Write `contents` to `path` through a temp file and rename.
pub(crate) fn write_atomically(path: &Path, contents: &[u8]) -> Result<()> {
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, contents).with_context(|| format!("writing {}", temp_path.display()))?;
    fs::rename(&temp_path, path).with_context(|| format!("replacing {}", path.display()))?;
    debug!("Wrote {} bytes to {}", contents.len(), path.display());
    Ok(())
}

/// Current bytes of `path`, or `None` if it does not exist yet.
pub(crate) fn read_if_exists(path: &Path) -> Result<Option<Vec<u8>>> {
    if !path.exists() {
        return Ok(None);
    }
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(Some(bytes))
}

/// Put a file back the way [`read_if_exists`] found it.
pub(crate) fn restore(path: &Path, previous: Option<&[u8]>) -> Result<()> {
    match previous {
        Some(bytes) => write_atomically(path, bytes),
        None => {
            if path.exists() {
                fs::remove_file(path).with_context(|| format!("removing {}", path.display()))?;
            }
            Ok(())
        }
    }
}

impl Connection for CsvConnection {
    type AccountRepository = AccountRepository;
    type RosterRepository = RosterRepository;
    type PaymentRepository = PaymentRepository;
    type BillingConfigRepository = BillingConfigRepository;
    type LedgerRepository = LedgerRepository;

    fn create_account_repository(&self) -> Self::AccountRepository {
        AccountRepository::new(self.clone())
    }

    fn create_roster_repository(&self) -> Self::RosterRepository {
        RosterRepository::new(self.clone())
    }

    fn create_payment_repository(&self) -> Self::PaymentRepository {
        PaymentRepository::new(self.clone())
    }

    fn create_billing_config_repository(&self) -> Self::BillingConfigRepository {
        BillingConfigRepository::new(self.clone())
    }

    fn create_ledger_repository(&self) -> Self::LedgerRepository {
        LedgerRepository::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_new_creates_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("a").join("b");
        let connection = CsvConnection::new(&nested).unwrap();
        assert!(nested.exists());
        assert_eq!(connection.accounts_file_path(), nested.join("accounts.csv"));
    }

    #[test]
    fn test_restore_removes_file_that_did_not_exist() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("payments.csv");
        write_atomically(&path, b"header\n").unwrap();
        restore(&path, None).unwrap();
        assert!(!path.exists());

        write_atomically(&path, b"new\n").unwrap();
        restore(&path, Some(b"old\n")).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"old\n");
        assert!(!path.with_extension("tmp").exists());
    }
}
