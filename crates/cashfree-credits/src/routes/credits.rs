//! Credit read API and the admin/test surface.

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use bigdecimal::BigDecimal;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::error::AppError;
use crate::ledger::ReconcileReport;
use crate::models::{FailedPaymentRecord, HistoryEntry, NewPayment, PaymentRecord};

/// Headers that stop any cache between the ledger and the caller.
const NO_CACHE_HEADERS: [(header::HeaderName, &str); 3] = [
    (header::CACHE_CONTROL, "no-cache, no-store, must-revalidate"),
    (header::PRAGMA, "no-cache"),
    (header::EXPIRES, "0"),
];

const TEST_CREDIT_AMOUNT: i64 = 100;
const TEST_CREDIT_EMAIL: &str = "test@example.com";
const TEST_CREDIT_NAME: &str = "Test User";
const TEST_CREDIT_METHOD: &str = "test";

/// Response for the credits summary.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditsResponse {
    pub success: bool,
    pub total_credits: u64,
    pub payment_history: Vec<PaymentRecord>,
    pub failed_payments: Vec<FailedPaymentRecord>,
    pub total_failed_payments: usize,
    pub credit_history: Vec<HistoryEntry>,
}

/// Response for the failed payments listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedPaymentsResponse {
    pub success: bool,
    pub failed_payments: Vec<FailedPaymentRecord>,
    pub total_failed_payments: usize,
}

/// Body of admin requests that carry nothing but the shared secret.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminRequest {
    #[serde(default)]
    pub secret_key: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetResponse {
    pub success: bool,
    pub message: String,
    /// False when the reset only reached the in-memory ledger.
    pub persisted: bool,
}

/// Request body for inserting a synthetic test credit.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCreditRequest {
    #[serde(default)]
    pub secret_key: Option<String>,
    #[serde(default, deserialize_with = "crate::models::amount::deserialize_option")]
    pub amount: Option<BigDecimal>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCreditResponse {
    pub success: bool,
    pub message: String,
    pub total_credits: u64,
    pub credit_history: Vec<HistoryEntry>,
}

/// Request body for manually crediting an explicit payment.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessCreditRequest {
    #[serde(default)]
    pub secret_key: Option<String>,
    #[serde(flatten)]
    pub payment: NewPayment,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessCreditResponse {
    pub success: bool,
    pub order_id: String,
    pub total_credits: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileResponse {
    pub success: bool,
    #[serde(flatten)]
    pub report: ReconcileReport,
}

/// Creates the credits router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/credits", get(get_credits))
        .route("/failed-payments", get(get_failed_payments))
        .route("/credits/reset", post(reset_credits))
        .route("/credits/add-test-credit", post(add_test_credit))
        .route("/credits/reconcile", post(reconcile_credits))
        .route("/process-credit", post(process_credit))
        .with_state(state)
}

/// Builds the synthetic payment inserted by the test-credit endpoint.
fn test_payment(request: TestCreditRequest) -> NewPayment {
    let millis = Utc::now().timestamp_millis();
    NewPayment {
        order_id: format!("test_order_{}", millis),
        transaction_id: Some(format!("test_tx_{}", millis)),
        amount: request
            .amount
            .unwrap_or_else(|| BigDecimal::from(TEST_CREDIT_AMOUNT)),
        customer_email: Some(request.email.unwrap_or_else(|| TEST_CREDIT_EMAIL.to_string())),
        customer_name: Some(request.name.unwrap_or_else(|| TEST_CREDIT_NAME.to_string())),
        payment_method: Some(request.method.unwrap_or_else(|| TEST_CREDIT_METHOD.to_string())),
        environment: None,
        error_details: None,
    }
}

/// GET /api/payment/credits
///
/// Current totals and full history. Never cached.
async fn get_credits(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let ledger = state.with_ledger(|ledger| ledger.read()).await?;

    let response = CreditsResponse {
        success: true,
        total_credits: ledger.total_credits,
        total_failed_payments: ledger.failed_payments.len(),
        payment_history: ledger.payments,
        failed_payments: ledger.failed_payments,
        credit_history: ledger.credit_history,
    };

    Ok((NO_CACHE_HEADERS, Json(response)))
}

/// GET /api/payment/failed-payments
async fn get_failed_payments(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let failed_payments = state
        .with_ledger(|ledger| ledger.read().failed_payments)
        .await?;

    let response = FailedPaymentsResponse {
        success: true,
        total_failed_payments: failed_payments.len(),
        failed_payments,
    };

    Ok((NO_CACHE_HEADERS, Json(response)))
}

/// POST /api/payment/credits/reset
async fn reset_credits(
    State(state): State<AppState>,
    Json(request): Json<AdminRequest>,
) -> Result<Json<ResetResponse>, AppError> {
    state.authorize(request.secret_key.as_deref())?;

    let persisted = state.with_ledger(|ledger| ledger.reset()).await?;

    Ok(Json(ResetResponse {
        success: true,
        message: "Credits reset successfully".to_string(),
        persisted,
    }))
}

/// POST /api/payment/credits/add-test-credit
///
/// Inserts a synthetic payment so dashboards can be exercised without
/// going through the gateway.
async fn add_test_credit(
    State(state): State<AppState>,
    Json(request): Json<TestCreditRequest>,
) -> Result<Json<TestCreditResponse>, AppError> {
    state.authorize(request.secret_key.as_deref())?;

    let payment = test_payment(request);
    tracing::info!(order_id = %payment.order_id, "Adding test credit");

    let (total_credits, credit_history) = state
        .with_ledger(move |ledger| {
            let total = ledger.add_success(payment);
            (total, ledger.read().credit_history)
        })
        .await?;

    Ok(Json(TestCreditResponse {
        success: true,
        message: "Test credit added successfully".to_string(),
        total_credits,
        credit_history,
    }))
}

/// POST /api/payment/process-credit
///
/// Manual credit insertion for an explicit payment record.
async fn process_credit(
    State(state): State<AppState>,
    Json(request): Json<ProcessCreditRequest>,
) -> Result<Json<ProcessCreditResponse>, AppError> {
    state.authorize(request.secret_key.as_deref())?;

    let payment = request.payment.normalized();
    if !payment.has_order_id() {
        return Err(AppError::BadRequest("orderId is required".to_string()));
    }

    let order_id = payment.order_id.clone();
    let total_credits = state
        .with_ledger(move |ledger| ledger.add_success(payment))
        .await?;

    Ok(Json(ProcessCreditResponse {
        success: true,
        order_id,
        total_credits,
    }))
}

/// POST /api/payment/credits/reconcile
///
/// Debug endpoint: repairs a drifted credit total.
async fn reconcile_credits(
    State(state): State<AppState>,
    Json(request): Json<AdminRequest>,
) -> Result<Json<ReconcileResponse>, AppError> {
    state.authorize(request.secret_key.as_deref())?;

    let report = state.with_ledger(|ledger| ledger.reconcile()).await?;

    Ok(Json(ReconcileResponse {
        success: true,
        report,
    }))
}
