//! Mappers for converting between payment domain models and shared DTOs.

use crate::domain::commands::payments::PaymentSearchQuery as DomainPaymentSearchQuery;
use crate::domain::models::{PaymentMethod as DomainPaymentMethod, PaymentRecord as DomainPaymentRecord};
use crate::domain::validation::non_blank;
use shared::{
    PaymentMethod as SharedPaymentMethod, PaymentRecord as SharedPaymentRecord,
    PaymentSearchQuery as SharedPaymentSearchQuery,
};

pub struct PaymentMapper;

impl PaymentMapper {
    /// Flattens the member snapshot into the record DTO
    pub fn to_dto(domain: DomainPaymentRecord) -> SharedPaymentRecord {
        SharedPaymentRecord {
            receipt_id: domain.receipt_id,
            account_id: domain.account_id,
            member_name: domain.member.name,
            flat_number: domain.member.flat_number,
            email: domain.member.email,
            amount: domain.amount,
            method: Self::method_to_dto(domain.method),
            date: domain.date,
            created_at: domain.created_at,
            late_fee_added_to_dues: domain.late_fee_added_to_dues,
            was_late_payment: domain.was_late_payment,
        }
    }

    pub fn method_to_dto(method: DomainPaymentMethod) -> SharedPaymentMethod {
        match method {
            DomainPaymentMethod::Upi => SharedPaymentMethod::Upi,
            DomainPaymentMethod::Cash => SharedPaymentMethod::Cash,
            DomainPaymentMethod::Card => SharedPaymentMethod::Card,
            DomainPaymentMethod::BankTransfer => SharedPaymentMethod::BankTransfer,
            DomainPaymentMethod::ManualEdit => SharedPaymentMethod::ManualEdit,
        }
    }

    pub fn method_to_domain(method: SharedPaymentMethod) -> DomainPaymentMethod {
        match method {
            SharedPaymentMethod::Upi => DomainPaymentMethod::Upi,
            SharedPaymentMethod::Cash => DomainPaymentMethod::Cash,
            SharedPaymentMethod::Card => DomainPaymentMethod::Card,
            SharedPaymentMethod::BankTransfer => DomainPaymentMethod::BankTransfer,
            SharedPaymentMethod::ManualEdit => DomainPaymentMethod::ManualEdit,
        }
    }

    pub fn search_to_domain(query: SharedPaymentSearchQuery) -> DomainPaymentSearchQuery {
        DomainPaymentSearchQuery {
            text: non_blank(query.q),
            method: query.method.map(Self::method_to_domain),
            from: query.from,
            to: query.to,
        }
    }
}
