//! # REST API Interface Layer
//!
//! HTTP endpoints of the society ledger, nested under `/api`:
//!
//! - **billing_apis**: billing configuration and the cycle charge
//! - **member_apis**: roster listing, add/remove member, admin dues correction
//! - **payment_apis**: payments, history, member bill, search, export, receipts
//! - **report_apis**: the admin dashboard
//!
//! Every request is attributed to a [`Caller`](auth::Caller) resolved from
//! the identity headers. Rejections use the JSON body of [`errors::ApiError`].

pub mod auth;
pub mod billing_apis;
pub mod errors;
pub mod mappers;
pub mod member_apis;
pub mod payment_apis;
pub mod report_apis;

#[cfg(test)]
pub(crate) mod test_support;
