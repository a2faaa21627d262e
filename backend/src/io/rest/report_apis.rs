//! # REST API for Reports

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use tracing::info;

use crate::io::rest::auth::Caller;
use crate::io::rest::errors::ledger_failure;
use crate::io::rest::mappers::report_mapper::ReportMapper;
use crate::AppState;

/// Create a router for report related APIs
pub fn router() -> Router<AppState> {
    Router::new().route("/reports/dashboard", get(get_dashboard_stats))
}

/// Admin dashboard totals for today
pub async fn get_dashboard_stats(State(state): State<AppState>, caller: Caller) -> impl IntoResponse {
    info!("GET /api/reports/dashboard by {}", caller.user_id);
    if let Err(rejection) = caller.require_admin() {
        return rejection.into_response();
    }

    match state.reporting_service.dashboard_stats().await {
        Ok(stats) => (StatusCode::OK, Json(ReportMapper::stats_to_dto(stats))).into_response(),
        Err(e) => ledger_failure("compute dashboard stats", e),
    }
}
