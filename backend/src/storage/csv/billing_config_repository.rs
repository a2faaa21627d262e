//! # Billing Config Repository
//!
//! The society's single billing configuration, stored as
//! `billing_config.yaml` at the root of the data directory:
//!
//! ```yaml
//! maintenance_charge: '1000.00'
//! water_charge: '300.00'
//! sinking_fund: '200.00'
//! late_fee: '50.00'
//! due_day: 20
//! due_date_iso: 2025-03-20
//! contact_email: office@society.in
//! updated_at: 2025-03-01T09:30:00Z
//! ```

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::fs;
use tracing::{debug, info};

use super::connection::{write_atomically, CsvConnection};
use crate::domain::models::BillingConfig;
use crate::storage::traits::BillingConfigStorage;

#[derive(Clone)]
pub struct BillingConfigRepository {
    connection: CsvConnection,
}

impl BillingConfigRepository {
    pub fn new(connection: CsvConnection) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl BillingConfigStorage for BillingConfigRepository {
    async fn get_billing_config(&self) -> Result<Option<BillingConfig>> {
        let path = self.connection.billing_config_file_path();
        if !path.exists() {
            debug!("No billing config at {}", path.display());
            return Ok(None);
        }
        let yaml_content = fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
        let config: BillingConfig =
            serde_yaml::from_str(&yaml_content).with_context(|| format!("parsing {}", path.display()))?;
        Ok(Some(config))
    }

    async fn save_billing_config(&self, config: &BillingConfig) -> Result<()> {
        let _guard = self.connection.write_guard().await;
        let path = self.connection.billing_config_file_path();
        let yaml_content = serde_yaml::to_string(config)?;
        write_atomically(&path, yaml_content.as_bytes())?;
        info!("Saved billing config to {}", path.display());
        Ok(())
    }
}
