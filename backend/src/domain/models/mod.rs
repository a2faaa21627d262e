pub mod billing_config;
pub mod member_account;
pub mod payment_record;

pub use billing_config::{BillingConfig, BillingConfigDraft};
pub use member_account::{BillingPeriod, MemberAccount, MemberStatus};
pub use payment_record::{MemberSnapshot, PaymentMethod, PaymentRecord};
