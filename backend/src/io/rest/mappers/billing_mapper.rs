//! Mappers for converting between the billing configuration and shared DTOs.

use crate::domain::commands::billing::SaveBillingConfigCommand;
use crate::domain::errors::ValidationError;
use crate::domain::models::{BillingConfig as DomainBillingConfig, BillingConfigDraft};
use shared::{BillingConfig as SharedBillingConfig, SaveBillingConfigRequest};

pub struct BillingMapper;

impl BillingMapper {
    pub fn to_dto(domain: DomainBillingConfig) -> Result<SharedBillingConfig, ValidationError> {
        let monthly_total = domain.monthly_total()?;
        Ok(SharedBillingConfig {
            maintenance_charge: domain.maintenance_charge,
            water_charge: domain.water_charge,
            sinking_fund: domain.sinking_fund,
            late_fee: domain.late_fee,
            due_date: domain.due_day.map(|day| day.to_string()),
            due_date_iso: domain.due_date_iso.map(|date| date.format("%Y-%m-%d").to_string()),
            contact_email: domain.contact_email,
            monthly_total,
            updated_at: domain.updated_at,
        })
    }

    /// Saving from the admin form charges the new cycle unless told otherwise
    pub fn save_command(request: SaveBillingConfigRequest) -> SaveBillingConfigCommand {
        SaveBillingConfigCommand {
            apply_cycle_charge: request.apply_cycle_charge.unwrap_or(true),
            draft: BillingConfigDraft {
                maintenance_charge: request.maintenance_charge,
                water_charge: request.water_charge,
                sinking_fund: request.sinking_fund,
                late_fee: request.late_fee,
                due_date: request.due_date,
                due_date_iso: request.due_date_iso,
                contact_email: request.contact_email,
            },
        }
    }
}
