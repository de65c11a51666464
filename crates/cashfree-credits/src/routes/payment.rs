//! Checkout endpoints: order creation, status polling and the gateway webhook.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use bigdecimal::{BigDecimal, Zero};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::AppState;
use crate::error::AppError;
use crate::gateway::{
    generate_customer_id, generate_order_id, is_valid_order_id, CustomerDetails, GatewayError,
    NotificationOutcome, OrderRequest, PaymentNotification,
};

/// Request body for creating a checkout order.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[serde(default, deserialize_with = "crate::models::amount::deserialize_option")]
    pub amount: Option<BigDecimal>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_phone: Option<String>,
}

/// Response for a created order. Field names follow the checkout page's
/// expectations (snake_case).
#[derive(Debug, Serialize)]
pub struct CreateOrderResponse {
    pub success: bool,
    pub order_id: String,
    pub payment_session_id: Option<String>,
    pub order_token: Option<String>,
    pub environment: &'static str,
}

/// Creates the payment router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/create-order", post(create_order))
        .route("/status/{order_id}", get(payment_status))
        .route("/webhook", post(handle_webhook))
        .with_state(state)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Validates a create-order request, returning the order to place.
fn build_order(
    request: CreateOrderRequest,
    return_url: &str,
    notify_url: &str,
) -> Result<OrderRequest, AppError> {
    let missing = || {
        AppError::BadRequest(
            "Missing required fields: amount, customerName, customerEmail, customerPhone"
                .to_string(),
        )
    };

    let amount = request.amount.ok_or_else(missing)?;
    let customer_name = non_empty(request.customer_name).ok_or_else(missing)?;
    let customer_email = non_empty(request.customer_email).ok_or_else(missing)?;
    let customer_phone = non_empty(request.customer_phone).ok_or_else(missing)?;

    if amount <= BigDecimal::zero() {
        return Err(AppError::BadRequest("Amount must be positive".to_string()));
    }

    Ok(OrderRequest {
        order_id: generate_order_id(),
        amount,
        customer: CustomerDetails {
            customer_id: generate_customer_id(),
            customer_name,
            customer_email,
            customer_phone,
        },
        return_url: return_url.to_string(),
        notify_url: notify_url.to_string(),
    })
}

/// POST /api/payment/create-order
///
/// Creates a CashFree order and returns the payment session id the
/// checkout page needs to open the hosted payment form.
async fn create_order(
    State(state): State<AppState>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<Json<CreateOrderResponse>, AppError> {
    let order = build_order(request, &state.return_url, &state.notify_url)?;

    if !state.gateway.is_configured() {
        return Err(AppError::gateway(
            "CashFree credentials not configured. Please check your .env file.",
            GatewayError::NotConfigured,
        ));
    }

    let created = state
        .gateway
        .create_order(&order)
        .await
        .map_err(|e| AppError::gateway("Failed to create order", e))?;

    tracing::info!(order_id = %order.order_id, "Order created");

    Ok(Json(CreateOrderResponse {
        success: true,
        order_id: order.order_id,
        payment_session_id: created.payment_session_id,
        order_token: created.order_token,
        environment: state.environment.as_str(),
    }))
}

/// GET /api/payment/status/{order_id}
///
/// Polls the gateway for the order's payments. The most recent payment
/// attempt is fed to the ledger: SUCCESS credits, FAILED is recorded.
async fn payment_status(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    if !is_valid_order_id(&order_id) {
        return Err(AppError::BadRequest(format!("Invalid order id: {:?}", order_id)));
    }

    let payments = state
        .gateway
        .order_payments(&order_id)
        .await
        .map_err(|e| AppError::gateway("Failed to fetch payment status", e))?;

    if let Some(latest) = payments.first() {
        match serde_json::from_value::<PaymentNotification>(latest.clone()) {
            Ok(notification) => {
                let environment = state.environment.as_str();
                let poll_order = order_id.clone();
                let outcome = state
                    .with_ledger(move |ledger| {
                        notification.apply(ledger, Some(poll_order.as_str()), environment)
                    })
                    .await?;
                log_outcome(&order_id, &outcome);
            }
            Err(e) => {
                tracing::warn!(order_id = %order_id, error = %e, "Unrecognised payment payload");
            }
        }
    }

    Ok(Json(json!({
        "success": true,
        "payments": payments,
    })))
}

/// POST /api/payment/webhook
///
/// Payment notification pushed by the gateway. Duplicate deliveries are
/// absorbed by the ledger's dedup rule.
async fn handle_webhook(
    State(state): State<AppState>,
    Json(notification): Json<PaymentNotification>,
) -> Result<Json<Value>, AppError> {
    let order_id = notification.order_id.clone().unwrap_or_default();
    let environment = state.environment.as_str();

    let outcome = state
        .with_ledger(move |ledger| notification.apply(ledger, None, environment))
        .await?;
    log_outcome(&order_id, &outcome);

    Ok(Json(json!({ "message": "Webhook processed successfully" })))
}

fn log_outcome(order_id: &str, outcome: &NotificationOutcome) {
    match outcome {
        NotificationOutcome::Credited { total_credits } => {
            tracing::info!(order_id, total_credits, "Payment credited");
        }
        NotificationOutcome::FailureRecorded { failed_payments } => {
            tracing::info!(order_id, failed_payments, "Failed payment processed");
        }
        NotificationOutcome::Ignored { status } => {
            tracing::debug!(order_id, status = %status, "Payment status ignored");
        }
        NotificationOutcome::Malformed => {
            tracing::warn!(order_id, "Payment notification could not be applied");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn request(amount: Option<&str>, phone: Option<&str>) -> CreateOrderRequest {
        CreateOrderRequest {
            amount: amount.map(|a| BigDecimal::from_str(a).unwrap()),
            customer_name: Some("Asha".to_string()),
            customer_email: Some("asha@example.com".to_string()),
            customer_phone: phone.map(str::to_string),
        }
    }

    #[test]
    fn test_build_order_valid() {
        let order = build_order(
            request(Some("10.00"), Some("9999999999")),
            "http://localhost:3000/success",
            "http://localhost:3000/api/payment/webhook",
        )
        .unwrap();

        assert!(order.order_id.starts_with("ORDER_"));
        assert!(order.customer.customer_id.starts_with("CUST_"));
        assert_eq!(order.customer.customer_phone, "9999999999");
        assert_eq!(order.return_url, "http://localhost:3000/success");
    }

    #[test]
    fn test_build_order_missing_fields() {
        assert!(matches!(
            build_order(request(None, Some("9999999999")), "r", "n"),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            build_order(request(Some("10"), Some("  ")), "r", "n"),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_build_order_rejects_non_positive_amount() {
        assert!(matches!(
            build_order(request(Some("0"), Some("9999999999")), "r", "n"),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            build_order(request(Some("-5"), Some("9999999999")), "r", "n"),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_create_order_request_deserialization() {
        let request: CreateOrderRequest = serde_json::from_value(json!({
            "amount": 100,
            "customerName": "John Doe",
            "customerEmail": "john@example.com",
            "customerPhone": "9999999999"
        }))
        .unwrap();

        assert_eq!(request.amount, Some(BigDecimal::from(100)));
        assert_eq!(request.customer_name.as_deref(), Some("John Doe"));
    }
}
