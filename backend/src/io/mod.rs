//! # IO Module
//!
//! Interface layer exposing the ledger over HTTP. Handlers translate shared
//! DTOs into domain commands and domain errors into status codes; they hold no
//! business rules.

pub mod rest;
