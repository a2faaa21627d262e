//! # REST API for the Billing Configuration
//!
//! Endpoints for reading and saving the society's charge schedule and for
//! charging a billing cycle to every member.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use tracing::info;

use crate::io::rest::auth::Caller;
use crate::io::rest::errors::ledger_failure;
use crate::io::rest::mappers::billing_mapper::BillingMapper;
use crate::AppState;
use shared::{ApplyCycleChargeResponse, GetBillingConfigResponse, SaveBillingConfigRequest, SaveBillingConfigResponse};

/// Create a router for billing related APIs
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/config", get(get_billing_config).put(save_billing_config))
        .route("/config/cycle", post(apply_cycle_charge))
}

/// Get the billing configuration; `null` until an admin saves one
pub async fn get_billing_config(State(state): State<AppState>, caller: Caller) -> impl IntoResponse {
    info!("GET /api/config by {}", caller.user_id);

    let config = state
        .billing_service
        .get_billing_config()
        .await
        .and_then(|config| Ok(config.map(BillingMapper::to_dto).transpose()?));
    match config {
        Ok(config) => (StatusCode::OK, Json(GetBillingConfigResponse { config })).into_response(),
        Err(e) => ledger_failure("get billing config", e),
    }
}

/// Save the billing configuration, charging the new cycle unless the request opts out
pub async fn save_billing_config(
    State(state): State<AppState>,
    caller: Caller,
    Json(request): Json<SaveBillingConfigRequest>,
) -> impl IntoResponse {
    info!("PUT /api/config by {} - request: {:?}", caller.user_id, request);
    if let Err(rejection) = caller.require_admin() {
        return rejection.into_response();
    }

    let command = BillingMapper::save_command(request);
    let saved = state.billing_service.save_billing_config(command).await.and_then(|result| {
        Ok(SaveBillingConfigResponse {
            config: BillingMapper::to_dto(result.config)?,
            charged_accounts: result.charged_accounts,
            success_message: result.success_message,
        })
    });
    match saved {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => ledger_failure("save billing config", e),
    }
}

/// Charge every member the stored config's monthly total
pub async fn apply_cycle_charge(State(state): State<AppState>, caller: Caller) -> impl IntoResponse {
    info!("POST /api/config/cycle by {}", caller.user_id);
    if let Err(rejection) = caller.require_admin() {
        return rejection.into_response();
    }

    match state.billing_service.apply_stored_cycle_charge().await {
        Ok(result) => {
            let response = ApplyCycleChargeResponse {
                count: result.count,
                monthly_total: result.monthly_total,
                success_message: result.success_message,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => ledger_failure("apply cycle charge", e),
    }
}

#[cfg(test)]
mod tests {
    use crate::io::rest::test_support::{date, TestApp, ADMIN};
    use crate::storage::csv::test_utils::sample_account;
    use axum::http::{Method, StatusCode};
    use rust_decimal_macros::dec;
    use serde_json::json;
    use shared::{AccountListResponse, ErrorResponse, GetBillingConfigResponse, SaveBillingConfigResponse};

    fn config_body() -> serde_json::Value {
        json!({
            "maintenance_charge": "1000",
            "water_charge": "300",
            "sinking_fund": "200",
            "late_fee": "50",
            "due_date": null,
            "due_date_iso": "2025-03-10",
            "contact_email": "office@greenmeadows.in"
        })
    }

    #[tokio::test]
    async fn test_config_is_null_before_first_save() {
        let app = TestApp::on(date(2025, 3, 5)).await;
        let response = app.send(Method::GET, "/api/config", Some(("m1", "member")), None).await;
        assert_eq!(response.status, StatusCode::OK);
        let body: GetBillingConfigResponse = response.json();
        assert_eq!(body.config, None);
    }

    #[tokio::test]
    async fn test_save_charges_every_member() {
        let app = TestApp::on(date(2025, 3, 5)).await;
        app.env.seed_account(sample_account("m1", "Asha", dec!(0))).await.unwrap();
        app.env
            .seed_roster(&[sample_account("legacy", "Ravi", dec!(200))])
            .unwrap();

        let response = app.send(Method::PUT, "/api/config", Some(ADMIN), Some(config_body())).await;
        assert_eq!(response.status, StatusCode::OK);
        let saved: SaveBillingConfigResponse = response.json();
        assert_eq!(saved.charged_accounts, Some(2));
        assert_eq!(saved.config.monthly_total, dec!(1500));
        assert_eq!(saved.config.due_date.as_deref(), Some("10"));

        let accounts: AccountListResponse = app.send(Method::GET, "/api/accounts", Some(ADMIN), None).await.json();
        let dues: Vec<_> = accounts.accounts.iter().map(|a| (a.id.as_str(), a.dues)).collect();
        assert!(dues.contains(&("m1", dec!(1500))));
        assert!(dues.contains(&("legacy", dec!(1700))));
    }

    #[tokio::test]
    async fn test_save_can_skip_the_charge() {
        let app = TestApp::on(date(2025, 3, 5)).await;
        app.env.seed_account(sample_account("m1", "Asha", dec!(0))).await.unwrap();
        let mut body = config_body();
        body["apply_cycle_charge"] = json!(false);

        let saved: SaveBillingConfigResponse = app.send(Method::PUT, "/api/config", Some(ADMIN), Some(body)).await.json();
        assert_eq!(saved.charged_accounts, None);
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let app = TestApp::on(date(2025, 3, 5)).await;
        let mut body = config_body();
        body["water_charge"] = json!("-5");

        let response = app.send(Method::PUT, "/api/config", Some(ADMIN), Some(body)).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        let error: ErrorResponse = response.json();
        assert_eq!(error.error, "validation_error");

        let stored: GetBillingConfigResponse = app.send(Method::GET, "/api/config", Some(ADMIN), None).await.json();
        assert_eq!(stored.config, None);
    }

    #[tokio::test]
    async fn test_charge_beyond_ledger_range_is_rejected() {
        let app = TestApp::on(date(2025, 3, 5)).await;
        let mut body = config_body();
        body["maintenance_charge"] = json!("79228162514264337593543950335");
        body["water_charge"] = json!("1");

        let response = app.send(Method::PUT, "/api/config", Some(ADMIN), Some(body)).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        let error: ErrorResponse = response.json();
        assert_eq!(error.error, "validation_error");

        let stored: GetBillingConfigResponse = app.send(Method::GET, "/api/config", Some(ADMIN), None).await.json();
        assert_eq!(stored.config, None);
    }

    #[tokio::test]
    async fn test_members_cannot_save_config() {
        let app = TestApp::on(date(2025, 3, 5)).await;
        let response = app
            .send(Method::PUT, "/api/config", Some(("m1", "member")), Some(config_body()))
            .await;
        assert_eq!(response.status, StatusCode::FORBIDDEN);

        let response = app.send(Method::GET, "/api/config", None, None).await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_cycle_charge_requires_saved_config() {
        let app = TestApp::on(date(2025, 3, 5)).await;
        let response = app.send(Method::POST, "/api/config/cycle", Some(ADMIN), None).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
    }
}
