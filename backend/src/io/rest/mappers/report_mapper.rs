//! Mappers for the member bill and dashboard read models.

use crate::domain::commands::reports::{DashboardStats as DomainDashboardStats, MemberBill as DomainMemberBill};
use shared::{DashboardStats as SharedDashboardStats, MemberBill as SharedMemberBill};

pub struct ReportMapper;

impl ReportMapper {
    pub fn bill_to_dto(domain: DomainMemberBill) -> SharedMemberBill {
        SharedMemberBill {
            account_id: domain.account_id,
            as_of: domain.as_of,
            period: domain.period.to_string(),
            dues: domain.dues,
            paid: domain.paid,
            maintenance_charge: domain.maintenance_charge,
            water_charge: domain.water_charge,
            sinking_fund: domain.sinking_fund,
            monthly_total: domain.monthly_total,
            due_day: domain.due_day,
            is_late: domain.is_late,
            late_fee_applies: domain.late_fee_applies,
            late_fee: domain.late_fee,
            max_payable: domain.max_payable,
        }
    }

    pub fn stats_to_dto(domain: DomainDashboardStats) -> SharedDashboardStats {
        SharedDashboardStats {
            total_members: domain.total_members,
            active_members: domain.active_members,
            total_collected: domain.total_collected,
            total_dues: domain.total_dues,
            overdue_members: domain.overdue_members,
        }
    }
}
