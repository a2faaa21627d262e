//! # CSV Storage Module
//!
//! File-based storage for the society ledger, kept in one data directory:
//!
//! ```text
//! Society Ledger/
//! ├── accounts.csv          credentialed account store (versioned)
//! ├── roster.csv            legacy flat roster, merged by id
//! ├── payments.csv          payment records in insertion order
//! └── billing_config.yaml   the billing configuration
//! ```
//!
//! Every file is replaced atomically (temp file + rename) and every write
//! holds the connection-wide write lock.

pub mod account_repository;
pub mod billing_config_repository;
pub mod connection;
pub mod ledger_repository;
pub mod payment_repository;
pub mod roster_repository;
mod rows;

#[cfg(test)]
pub mod test_utils;

pub use account_repository::AccountRepository;
pub use billing_config_repository::BillingConfigRepository;
pub use connection::CsvConnection;
pub use ledger_repository::LedgerRepository;
pub use payment_repository::PaymentRepository;
pub use roster_repository::RosterRepository;
