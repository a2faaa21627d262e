//! # Storage Module
//!
//! Persistence for the society ledger. The domain layer talks to the traits
//! in [`traits`]; [`csv`] is the file-based implementation (CSV for accounts,
//! roster and payments, YAML for the billing configuration).

pub mod csv;
pub mod traits;

pub use self::csv::CsvConnection;
pub use traits::*;
