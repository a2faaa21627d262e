//! Mappers for converting between member account domain models and shared DTOs.

use crate::domain::commands::members::AddMemberCommand;
use crate::domain::ledger::DuesCorrection;
use crate::domain::models::{MemberAccount as DomainMemberAccount, MemberStatus as DomainMemberStatus};
use shared::{
    CorrectDuesRequest, CreateMemberRequest, MemberAccount as SharedMemberAccount,
    MemberStatus as SharedMemberStatus,
};

pub struct AccountMapper;

impl AccountMapper {
    pub fn to_dto(domain: DomainMemberAccount) -> SharedMemberAccount {
        SharedMemberAccount {
            id: domain.id,
            name: domain.name,
            flat_number: domain.flat_number,
            email: domain.email,
            status: Self::status_to_dto(domain.status),
            dues: domain.dues,
            paid: domain.paid,
            late_fee_assessed_on: domain.late_fee_assessed_on.map(|period| period.to_string()),
            version: domain.version,
        }
    }

    pub fn status_to_dto(status: DomainMemberStatus) -> SharedMemberStatus {
        match status {
            DomainMemberStatus::Active => SharedMemberStatus::Active,
            DomainMemberStatus::Inactive => SharedMemberStatus::Inactive,
        }
    }

    pub fn status_to_domain(status: SharedMemberStatus) -> DomainMemberStatus {
        match status {
            SharedMemberStatus::Active => DomainMemberStatus::Active,
            SharedMemberStatus::Inactive => DomainMemberStatus::Inactive,
        }
    }

    pub fn add_member_command(request: CreateMemberRequest) -> AddMemberCommand {
        AddMemberCommand {
            id: request.id,
            name: request.name,
            flat_number: request.flat_number,
            email: request.email,
            initial_dues: request.initial_dues,
            status: request.status.map(Self::status_to_domain),
        }
    }

    pub fn correction_to_domain(request: CorrectDuesRequest) -> DuesCorrection {
        DuesCorrection {
            new_dues: request.new_dues,
            name: request.name,
            flat_number: request.flat_number,
            email: request.email,
            status: request.status.map(Self::status_to_domain),
        }
    }
}
