//! # REST API for Members
//!
//! Endpoints for the merged member roster, adding and removing members, and
//! the admin account editor.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, put},
    Router,
};
use tracing::info;

use crate::domain::commands::payments::CorrectDuesCommand;
use crate::io::rest::auth::Caller;
use crate::io::rest::errors::ledger_failure;
use crate::io::rest::mappers::account_mapper::AccountMapper;
use crate::io::rest::mappers::payment_mapper::PaymentMapper;
use crate::AppState;
use shared::{
    AccountListResponse, CorrectDuesRequest, CorrectDuesResponse, CreateMemberRequest, CreateMemberResponse,
    RemoveMemberResponse,
};

/// Create a router for member related APIs
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/accounts", get(list_accounts).post(add_member))
        .route("/accounts/export", get(export_roster_csv))
        .route("/accounts/:id", get(get_account).delete(remove_member))
        .route("/accounts/:id/dues", put(correct_dues))
}

/// List every member across the account store and the legacy roster
pub async fn list_accounts(State(state): State<AppState>, caller: Caller) -> impl IntoResponse {
    info!("GET /api/accounts by {}", caller.user_id);
    if let Err(rejection) = caller.require_admin() {
        return rejection.into_response();
    }

    match state.member_service.list_accounts().await {
        Ok(accounts) => {
            let response = AccountListResponse {
                accounts: accounts.into_iter().map(AccountMapper::to_dto).collect(),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => ledger_failure("list accounts", e),
    }
}

pub async fn add_member(
    State(state): State<AppState>,
    caller: Caller,
    Json(request): Json<CreateMemberRequest>,
) -> impl IntoResponse {
    info!("POST /api/accounts by {} - flat {}", caller.user_id, request.flat_number);
    if let Err(rejection) = caller.require_admin() {
        return rejection.into_response();
    }

    match state.member_service.add_member(AccountMapper::add_member_command(request)).await {
        Ok(result) => {
            let response = CreateMemberResponse {
                account: AccountMapper::to_dto(result.account),
                success_message: result.success_message,
            };
            (StatusCode::CREATED, Json(response)).into_response()
        }
        Err(e) => ledger_failure("add member", e),
    }
}

pub async fn get_account(
    State(state): State<AppState>,
    caller: Caller,
    Path(account_id): Path<String>,
) -> impl IntoResponse {
    info!("GET /api/accounts/{} by {}", account_id, caller.user_id);
    if let Err(rejection) = caller.require_self_or_admin(&account_id) {
        return rejection.into_response();
    }

    match state.member_service.get_account(&account_id).await {
        Ok(account) => (StatusCode::OK, Json(AccountMapper::to_dto(account))).into_response(),
        Err(e) => ledger_failure("get account", e),
    }
}

/// Remove a member; their payment records stay for audit
pub async fn remove_member(
    State(state): State<AppState>,
    caller: Caller,
    Path(account_id): Path<String>,
) -> impl IntoResponse {
    info!("DELETE /api/accounts/{} by {}", account_id, caller.user_id);
    if let Err(rejection) = caller.require_admin() {
        return rejection.into_response();
    }

    match state.member_service.remove_member(&account_id).await {
        Ok(result) => {
            let response = RemoveMemberResponse {
                account_id: result.account_id,
                retained_records: result.retained_records,
                success_message: result.success_message,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => ledger_failure("remove member", e),
    }
}

/// Admin account editor: set dues directly and update descriptive fields
pub async fn correct_dues(
    State(state): State<AppState>,
    caller: Caller,
    Path(account_id): Path<String>,
    Json(request): Json<CorrectDuesRequest>,
) -> impl IntoResponse {
    info!(
        "PUT /api/accounts/{}/dues by {} - new dues {}",
        account_id, caller.user_id, request.new_dues
    );
    if let Err(rejection) = caller.require_admin() {
        return rejection.into_response();
    }

    let command = CorrectDuesCommand {
        account_id,
        correction: AccountMapper::correction_to_domain(request),
    };
    match state.payment_service.correct_dues(command).await {
        Ok(result) => {
            let response = CorrectDuesResponse {
                account: AccountMapper::to_dto(result.account),
                record: result.record.map(PaymentMapper::to_dto),
                success_message: result.success_message,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => ledger_failure("correct dues", e),
    }
}

/// Download the merged roster as CSV
pub async fn export_roster_csv(State(state): State<AppState>, caller: Caller) -> impl IntoResponse {
    info!("GET /api/accounts/export by {}", caller.user_id);
    if let Err(rejection) = caller.require_admin() {
        return rejection.into_response();
    }

    match state.reporting_service.export_roster_csv().await {
        Ok(csv) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                (header::CONTENT_DISPOSITION, "attachment; filename=\"roster.csv\""),
            ],
            csv,
        )
            .into_response(),
        Err(e) => ledger_failure("export roster", e),
    }
}

#[cfg(test)]
mod tests {
    use crate::io::rest::test_support::{date, TestApp, ADMIN};
    use crate::storage::csv::test_utils::sample_account;
    use axum::http::{Method, StatusCode};
    use rust_decimal_macros::dec;
    use serde_json::json;
    use shared::{
        AccountListResponse, CorrectDuesResponse, CreateMemberResponse, MemberAccount, PaymentMethod,
        RemoveMemberResponse,
    };

    #[tokio::test]
    async fn test_add_then_list_member() {
        let app = TestApp::on(date(2025, 3, 5)).await;
        let body = json!({
            "id": null,
            "name": "Farah Khan",
            "flat_number": "C-302",
            "email": "farah@example.com",
            "initial_dues": "1500",
            "status": null
        });

        let response = app.send(Method::POST, "/api/accounts", Some(ADMIN), Some(body)).await;
        assert_eq!(response.status, StatusCode::CREATED);
        let created: CreateMemberResponse = response.json();
        assert!(created.account.id.starts_with("member::c302::"));
        assert_eq!(created.account.dues, dec!(1500));
        assert_eq!(created.account.paid, dec!(0));

        let listed: AccountListResponse = app.send(Method::GET, "/api/accounts", Some(ADMIN), None).await.json();
        assert_eq!(listed.accounts.len(), 1);
    }

    #[tokio::test]
    async fn test_member_reads_only_own_account() {
        let app = TestApp::on(date(2025, 3, 5)).await;
        app.env.seed_account(sample_account("m1", "Asha", dec!(900))).await.unwrap();
        app.env.seed_account(sample_account("m2", "Ravi", dec!(100))).await.unwrap();

        let response = app.send(Method::GET, "/api/accounts/m1", Some(("m1", "member")), None).await;
        assert_eq!(response.status, StatusCode::OK);
        let account: MemberAccount = response.json();
        assert_eq!(account.dues, dec!(900));

        let response = app.send(Method::GET, "/api/accounts/m2", Some(("m1", "member")), None).await;
        assert_eq!(response.status, StatusCode::FORBIDDEN);

        let response = app.send(Method::GET, "/api/accounts", Some(("m1", "member")), None).await;
        assert_eq!(response.status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_unknown_account_is_not_found() {
        let app = TestApp::on(date(2025, 3, 5)).await;
        let response = app.send(Method::GET, "/api/accounts/ghost", Some(ADMIN), None).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_correction_lowering_dues_returns_record() {
        let app = TestApp::on(date(2025, 3, 5)).await;
        app.env.seed_account(sample_account("m1", "Asha", dec!(1500))).await.unwrap();
        let body = json!({
            "new_dues": "1200",
            "name": null,
            "flat_number": null,
            "email": null,
            "status": "Inactive"
        });

        let response = app.send(Method::PUT, "/api/accounts/m1/dues", Some(ADMIN), Some(body)).await;
        assert_eq!(response.status, StatusCode::OK);
        let corrected: CorrectDuesResponse = response.json();
        assert_eq!(corrected.account.dues, dec!(1200));
        assert_eq!(corrected.account.paid, dec!(300));
        let record = corrected.record.unwrap();
        assert_eq!(record.method, PaymentMethod::ManualEdit);
        assert_eq!(record.amount, dec!(300));
    }

    #[tokio::test]
    async fn test_remove_member_keeps_records() {
        let app = TestApp::on(date(2025, 3, 5)).await;
        app.env.seed_account(sample_account("m1", "Asha", dec!(1500))).await.unwrap();
        let payment = json!({ "amount": "500", "method": "Cash" });
        let response = app
            .send(Method::POST, "/api/accounts/m1/payments", Some(ADMIN), Some(payment))
            .await;
        assert_eq!(response.status, StatusCode::CREATED);

        let response = app.send(Method::DELETE, "/api/accounts/m1", Some(ADMIN), None).await;
        assert_eq!(response.status, StatusCode::OK);
        let removed: RemoveMemberResponse = response.json();
        assert_eq!(removed.retained_records, 1);

        let response = app.send(Method::GET, "/api/accounts/m1", Some(ADMIN), None).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_roster_export_is_csv() {
        let app = TestApp::on(date(2025, 3, 5)).await;
        app.env.seed_account(sample_account("m1", "Asha", dec!(1500))).await.unwrap();

        let response = app.send(Method::GET, "/api/accounts/export", Some(ADMIN), None).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.content_type.as_deref(), Some("text/csv; charset=utf-8"));
        let text = response.text();
        assert!(text.starts_with("Id,Name,Flat,Email,Status,Dues,Paid"));
        assert!(text.contains("m1,Asha,FL-M1,m1@example.com"));
    }
}
