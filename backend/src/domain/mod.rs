//! # Domain Module
//!
//! Business logic of the society ledger, independent of HTTP and of the
//! storage backend.
//!
//! ## Module Organization
//!
//! - **models**: billing configuration, member accounts, payment records
//! - **ledger**: the pure reconciliation rules (cycle charge, payment
//!   allocation with late fees, manual correction)
//! - **identity**: merge of the legacy roster with the credentialed store
//! - **billing_service / member_service / payment_service / reporting_service**:
//!   read-modify-commit orchestration over a storage [`Connection`]
//! - **account_locks / change_feed / clock / receipt**: collaborators the
//!   services share
//!
//! ## Business Rules
//!
//! - Dues and paid never go negative
//! - A payment may not exceed dues plus the late fee it would assess
//! - A late fee is assessed at most once per account per billing period
//! - Every money movement produces exactly one payment record
//!
//! [`Connection`]: crate::storage::Connection

pub mod account_locks;
pub mod billing_service;
pub mod change_feed;
pub mod clock;
pub mod commands;
pub mod errors;
pub mod identity;
pub mod ledger;
pub mod member_service;
pub mod models;
pub mod payment_service;
pub mod receipt;
pub mod reporting_service;
pub mod validation;

/// Commit attempts before a version race is reported as a conflict
pub const MAX_COMMIT_ATTEMPTS: usize = 3;

pub use account_locks::AccountLocks;
pub use billing_service::BillingService;
pub use change_feed::{ChangeEvent, ChangeFeed, Collection, Subscription};
pub use clock::{Clock, FixedClock, SystemClock};
pub use errors::{LedgerError, LedgerResult, ValidationError};
pub use member_service::MemberService;
pub use payment_service::PaymentService;
pub use receipt::{ReceiptRenderer, TextReceiptRenderer};
pub use reporting_service::{ReceiptDocument, ReportingService};
