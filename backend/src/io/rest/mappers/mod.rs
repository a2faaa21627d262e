pub mod account_mapper;
pub mod billing_mapper;
pub mod payment_mapper;
pub mod report_mapper;
