//! # Society Ledger Backend
//!
//! Dues and payment ledger for a residential society's monthly maintenance.
//!
//! The backend is layered:
//! ```text
//! IO Layer (REST API, handlers)
//!     ↓
//! Domain Layer (ledger rules, services)
//!     ↓
//! Storage Layer (CSV/YAML files)
//! ```
//!
//! `initialize_backend` wires the services over the data directory and
//! `create_router` exposes them under `/api`.

pub mod config;
pub mod domain;
pub mod io;
pub mod storage;

use anyhow::{Context, Result};
use axum::{
    http::{HeaderValue, Method},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;
use crate::domain::{
    AccountLocks, BillingService, ChangeFeed, Clock, MemberService, PaymentService, ReportingService, SystemClock,
    TextReceiptRenderer,
};
use crate::io::rest::auth::{HeaderIdentityResolver, IdentityResolver};
use crate::io::rest::{billing_apis, member_apis, payment_apis, report_apis};
use crate::storage::CsvConnection;

/// Main application state that holds all services
#[derive(Clone)]
pub struct AppState {
    pub member_service: MemberService<CsvConnection>,
    pub billing_service: BillingService<CsvConnection>,
    pub payment_service: PaymentService<CsvConnection>,
    pub reporting_service: ReportingService<CsvConnection>,
    pub change_feed: ChangeFeed,
    pub identity_resolver: Arc<dyn IdentityResolver>,
}

/// Wire every service over one connection. Services share the account locks
/// and the change feed.
pub fn build_state(connection: CsvConnection, config: &AppConfig, clock: Arc<dyn Clock>) -> AppState {
    let locks = AccountLocks::new();
    let change_feed = ChangeFeed::new();

    let member_service = MemberService::new(&connection, clock.clone(), locks.clone(), change_feed.clone());
    let billing_service = BillingService::new(
        &connection,
        member_service.clone(),
        clock.clone(),
        locks.clone(),
        change_feed.clone(),
    );
    let payment_service = PaymentService::new(
        &connection,
        member_service.clone(),
        billing_service.clone(),
        clock.clone(),
        locks,
        change_feed.clone(),
    );
    let reporting_service = ReportingService::new(
        &connection,
        member_service.clone(),
        billing_service.clone(),
        clock,
        Arc::new(TextReceiptRenderer::new(
            config.society_name.clone(),
            config.currency.clone(),
        )),
    );

    AppState {
        member_service,
        billing_service,
        payment_service,
        reporting_service,
        change_feed,
        identity_resolver: Arc::new(HeaderIdentityResolver),
    }
}

/// Initialize the backend with all required services
pub async fn initialize_backend(config: &AppConfig) -> Result<AppState> {
    info!("Opening data directory {}", config.data_dir.display());
    let connection = CsvConnection::new(&config.data_dir)?;

    info!("Setting up domain services");
    Ok(build_state(connection, config, Arc::new(SystemClock)))
}

/// Create the Axum router with all routes configured
pub fn create_router(app_state: AppState, cors_origin: &str) -> Result<Router> {
    let origin = cors_origin
        .parse::<HeaderValue>()
        .with_context(|| format!("invalid CORS origin: {}", cors_origin))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    let api_routes = Router::new()
        .merge(billing_apis::router())
        .merge(member_apis::router())
        .merge(payment_apis::router())
        .merge(report_apis::router());

    Ok(Router::new()
        .nest("/api", api_routes)
        .layer(cors)
        .with_state(app_state))
}

/// Install the fmt subscriber. `RUST_LOG` overrides the default `info` level.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
