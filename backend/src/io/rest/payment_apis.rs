//! # REST API for Payments
//!
//! Endpoints for recording payments, a member's history and bill, the admin
//! payment search with CSV export, audit deletion and receipts.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    routing::{delete, get},
    Router,
};
use tracing::info;

use crate::domain::commands::payments::{PaymentListQuery, RecordPaymentCommand};
use crate::io::rest::auth::Caller;
use crate::io::rest::errors::ledger_failure;
use crate::io::rest::mappers::account_mapper::AccountMapper;
use crate::io::rest::mappers::payment_mapper::PaymentMapper;
use crate::io::rest::mappers::report_mapper::ReportMapper;
use crate::AppState;
use shared::{
    DeletePaymentResponse, PaymentHistoryQuery, PaymentListResponse, PaymentSearchQuery, PaymentSearchResponse,
    PaymentTotals, RecordPaymentRequest, RecordPaymentResponse,
};

/// Create a router for payment related APIs
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/accounts/:id/payments",
            get(list_payments_for_account).post(record_payment),
        )
        .route("/accounts/:id/bill", get(get_member_bill))
        .route("/payments", get(search_payments))
        .route("/payments/export", get(export_payments_csv))
        .route("/payments/:receipt_id", delete(delete_payment))
        .route("/payments/:receipt_id/receipt", get(download_receipt))
}

/// Record a payment against the account's dues
pub async fn record_payment(
    State(state): State<AppState>,
    caller: Caller,
    Path(account_id): Path<String>,
    Json(request): Json<RecordPaymentRequest>,
) -> impl IntoResponse {
    info!(
        "POST /api/accounts/{}/payments by {} - {} via {}",
        account_id, caller.user_id, request.amount, request.method
    );
    if let Err(rejection) = caller.require_self_or_admin(&account_id) {
        return rejection.into_response();
    }

    let command = RecordPaymentCommand {
        account_id,
        amount: request.amount,
        method: PaymentMapper::method_to_domain(request.method),
    };
    match state.payment_service.record_payment(command).await {
        Ok(result) => {
            let response = RecordPaymentResponse {
                record: PaymentMapper::to_dto(result.record),
                account: AccountMapper::to_dto(result.account),
                success_message: result.success_message,
            };
            (StatusCode::CREATED, Json(response)).into_response()
        }
        Err(e) => ledger_failure("record payment", e),
    }
}

/// Payment history of one account, oldest first
pub async fn list_payments_for_account(
    State(state): State<AppState>,
    caller: Caller,
    Path(account_id): Path<String>,
    Query(query): Query<PaymentHistoryQuery>,
) -> impl IntoResponse {
    info!(
        "GET /api/accounts/{}/payments by {} - limit {:?}",
        account_id, caller.user_id, query.limit
    );
    if let Err(rejection) = caller.require_self_or_admin(&account_id) {
        return rejection.into_response();
    }

    let query = PaymentListQuery {
        account_id,
        limit: query.limit,
    };
    match state.payment_service.list_payments_for_account(query).await {
        Ok(records) => {
            let response = PaymentListResponse {
                payments: records.into_iter().map(PaymentMapper::to_dto).collect(),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => ledger_failure("list payments", e),
    }
}

/// What the member owes today, with the late-fee preview
pub async fn get_member_bill(
    State(state): State<AppState>,
    caller: Caller,
    Path(account_id): Path<String>,
) -> impl IntoResponse {
    info!("GET /api/accounts/{}/bill by {}", account_id, caller.user_id);
    if let Err(rejection) = caller.require_self_or_admin(&account_id) {
        return rejection.into_response();
    }

    match state.payment_service.member_bill(&account_id).await {
        Ok(bill) => (StatusCode::OK, Json(ReportMapper::bill_to_dto(bill))).into_response(),
        Err(e) => ledger_failure("get member bill", e),
    }
}

/// Admin search over every payment, newest first
pub async fn search_payments(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<PaymentSearchQuery>,
) -> impl IntoResponse {
    info!("GET /api/payments by {} - query: {:?}", caller.user_id, query);
    if let Err(rejection) = caller.require_admin() {
        return rejection.into_response();
    }

    match state
        .reporting_service
        .search_payments(PaymentMapper::search_to_domain(query))
        .await
    {
        Ok(result) => {
            let response = PaymentSearchResponse {
                payments: result.records.into_iter().map(PaymentMapper::to_dto).collect(),
                totals: PaymentTotals {
                    count: result.count,
                    amount: result.total_amount,
                },
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => ledger_failure("search payments", e),
    }
}

/// The admin search as a CSV download
pub async fn export_payments_csv(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<PaymentSearchQuery>,
) -> impl IntoResponse {
    info!("GET /api/payments/export by {} - query: {:?}", caller.user_id, query);
    if let Err(rejection) = caller.require_admin() {
        return rejection.into_response();
    }

    match state
        .reporting_service
        .export_payments_csv(PaymentMapper::search_to_domain(query))
        .await
    {
        Ok(csv) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                (header::CONTENT_DISPOSITION, "attachment; filename=\"payments.csv\""),
            ],
            csv,
        )
            .into_response(),
        Err(e) => ledger_failure("export payments", e),
    }
}

/// Audit correction: delete a record without touching balances
pub async fn delete_payment(
    State(state): State<AppState>,
    caller: Caller,
    Path(receipt_id): Path<String>,
) -> impl IntoResponse {
    info!("DELETE /api/payments/{} by {}", receipt_id, caller.user_id);
    if let Err(rejection) = caller.require_admin() {
        return rejection.into_response();
    }

    match state.payment_service.delete_payment(&receipt_id, &caller.user_id).await {
        Ok(result) => {
            let response = DeletePaymentResponse {
                receipt_id: result.receipt_id,
                success_message: result.success_message,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => ledger_failure("delete payment", e),
    }
}

/// Receipt document for one record. Members may fetch their own receipts.
pub async fn download_receipt(
    State(state): State<AppState>,
    caller: Caller,
    Path(receipt_id): Path<String>,
) -> impl IntoResponse {
    info!("GET /api/payments/{}/receipt by {}", receipt_id, caller.user_id);

    if !caller.is_admin() {
        let record = match state.payment_service.get_payment(&receipt_id).await {
            Ok(record) => record,
            Err(e) => return ledger_failure("fetch receipt", e),
        };
        if let Err(rejection) = caller.require_self_or_admin(&record.account_id) {
            return rejection.into_response();
        }
    }

    match state.reporting_service.render_receipt(&receipt_id).await {
        Ok(document) => {
            let disposition = format!("attachment; filename=\"{}\"", document.file_name);
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, document.content_type.to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                document.body,
            )
                .into_response()
        }
        Err(e) => ledger_failure("render receipt", e),
    }
}
