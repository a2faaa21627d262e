//! Domain-level command and query types.
//!
//! Services take and return these; they are not exposed over the API. The
//! REST layer maps the DTOs of the `shared` crate onto them.

pub mod billing {
    use crate::domain::models::{BillingConfig, BillingConfigDraft};
    use rust_decimal::Decimal;

    /// Input for saving the billing configuration.
    #[derive(Debug, Clone)]
    pub struct SaveBillingConfigCommand {
        pub draft: BillingConfigDraft,
        /// Charge every account the new monthly total once the config is stored
        pub apply_cycle_charge: bool,
    }

    #[derive(Debug, Clone)]
    pub struct SaveBillingConfigResult {
        pub config: BillingConfig,
        /// Number of accounts charged, when a cycle charge was requested
        pub charged_accounts: Option<usize>,
        pub success_message: String,
    }

    #[derive(Debug, Clone)]
    pub struct ApplyCycleChargeResult {
        pub count: usize,
        pub monthly_total: Decimal,
        pub success_message: String,
    }
}

pub mod members {
    use crate::domain::models::{MemberAccount, MemberStatus};
    use rust_decimal::Decimal;

    /// Input for adding a member to the account store.
    #[derive(Debug, Clone)]
    pub struct AddMemberCommand {
        /// Generated from the flat number when absent
        pub id: Option<String>,
        pub name: String,
        pub flat_number: String,
        pub email: String,
        pub initial_dues: Decimal,
        pub status: Option<MemberStatus>,
    }

    #[derive(Debug, Clone)]
    pub struct AddMemberResult {
        pub account: MemberAccount,
        pub success_message: String,
    }

    #[derive(Debug, Clone)]
    pub struct RemoveMemberResult {
        pub account_id: String,
        /// Payment records kept for the removed account
        pub retained_records: usize,
        pub success_message: String,
    }
}

pub mod payments {
    use crate::domain::ledger::DuesCorrection;
    use crate::domain::models::{MemberAccount, PaymentMethod, PaymentRecord};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    /// Input for recording a member payment.
    #[derive(Debug, Clone)]
    pub struct RecordPaymentCommand {
        pub account_id: String,
        pub amount: Decimal,
        pub method: PaymentMethod,
    }

    #[derive(Debug, Clone)]
    pub struct RecordPaymentResult {
        pub record: PaymentRecord,
        pub account: MemberAccount,
        pub success_message: String,
    }

    /// Input for the admin account editor.
    #[derive(Debug, Clone)]
    pub struct CorrectDuesCommand {
        pub account_id: String,
        pub correction: DuesCorrection,
    }

    #[derive(Debug, Clone)]
    pub struct CorrectDuesResult {
        pub account: MemberAccount,
        pub record: Option<PaymentRecord>,
        pub success_message: String,
    }

    /// Query for one account's payment history.
    #[derive(Debug, Clone)]
    pub struct PaymentListQuery {
        pub account_id: String,
        /// Keep only the most recent `limit` records
        pub limit: Option<usize>,
    }

    /// Filters of the admin payment search. Dates are inclusive.
    #[derive(Debug, Clone, Default)]
    pub struct PaymentSearchQuery {
        pub text: Option<String>,
        pub method: Option<PaymentMethod>,
        pub from: Option<NaiveDate>,
        pub to: Option<NaiveDate>,
    }

    #[derive(Debug, Clone)]
    pub struct PaymentSearchResult {
        /// Newest first
        pub records: Vec<PaymentRecord>,
        pub count: usize,
        pub total_amount: Decimal,
    }

    #[derive(Debug, Clone)]
    pub struct DeletePaymentResult {
        pub receipt_id: String,
        pub success_message: String,
    }
}

pub mod reports {
    use crate::domain::models::BillingPeriod;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    /// What a member sees on their dashboard
    #[derive(Debug, Clone, PartialEq)]
    pub struct MemberBill {
        pub account_id: String,
        pub as_of: NaiveDate,
        pub period: BillingPeriod,
        pub dues: Decimal,
        pub paid: Decimal,
        pub maintenance_charge: Decimal,
        pub water_charge: Decimal,
        pub sinking_fund: Decimal,
        pub monthly_total: Decimal,
        pub due_day: Option<u8>,
        pub is_late: bool,
        pub late_fee_applies: bool,
        pub late_fee: Decimal,
        pub max_payable: Decimal,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub struct DashboardStats {
        pub total_members: usize,
        pub active_members: usize,
        pub total_collected: Decimal,
        pub total_dues: Decimal,
        pub overdue_members: usize,
    }
}
