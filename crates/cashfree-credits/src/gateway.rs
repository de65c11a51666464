//! CashFree payment gateway adapter.
//!
//! Covers the three touch points the ledger needs: creating an order,
//! polling an order's payments and turning a payment notification (poll
//! result or webhook body) into a ledger call.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use bigdecimal::{BigDecimal, ToPrimitive};
use rand::distributions::Alphanumeric;
use rand::Rng;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::ledger::CreditLedger;
use crate::models::NewPayment;

/// CashFree API version sent with every request.
const API_VERSION: &str = "2023-08-01";

/// Request timeout for gateway calls.
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Orders are always charged in rupees.
const ORDER_CURRENCY: &str = "INR";

/// Payment methods offered on the hosted checkout page.
const PAYMENT_METHODS: &str = "cc,dc,upi,nb,app,paylater,emi";

/// Gateway environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CashfreeEnvironment {
    Sandbox,
    Production,
}

impl CashfreeEnvironment {
    pub fn base_url(self) -> &'static str {
        match self {
            CashfreeEnvironment::Sandbox => "https://sandbox.cashfree.com/pg",
            CashfreeEnvironment::Production => "https://api.cashfree.com/pg",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CashfreeEnvironment::Sandbox => "SANDBOX",
            CashfreeEnvironment::Production => "PRODUCTION",
        }
    }
}

impl FromStr for CashfreeEnvironment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SANDBOX" => Ok(CashfreeEnvironment::Sandbox),
            "PRODUCTION" => Ok(CashfreeEnvironment::Production),
            other => Err(format!(
                "Unsupported CashFree environment: {}. Supported: SANDBOX, PRODUCTION",
                other
            )),
        }
    }
}

/// Gateway error type.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("CashFree credentials not configured")]
    NotConfigured,

    #[error("Gateway request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Gateway returned HTTP {status}")]
    Status { status: u16, body: Value },

    #[error("Invalid order id: {0:?}")]
    InvalidOrderId(String),
}

impl GatewayError {
    /// The `message` field of an upstream error body, if there is one.
    pub fn upstream_message(&self) -> Option<&str> {
        match self {
            GatewayError::Status { body, .. } => body.get("message").and_then(Value::as_str),
            _ => None,
        }
    }

    /// Best-effort diagnostic payload for the HTTP caller.
    pub fn details(&self) -> Value {
        match self {
            GatewayError::NotConfigured => {
                json!("CashFree credentials not configured. Please check your .env file.")
            }
            GatewayError::Http(e) => json!(e.to_string()),
            GatewayError::Status { status, body } => json!({ "status": status, "body": body }),
            GatewayError::InvalidOrderId(id) => json!({ "orderId": id }),
        }
    }
}

/// Customer details attached to an order.
#[derive(Debug, Clone, Serialize)]
pub struct CustomerDetails {
    pub customer_id: String,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
}

/// An order to create at the gateway.
#[derive(Debug, Clone)]
pub struct OrderRequest {
    pub order_id: String,
    pub amount: BigDecimal,
    pub customer: CustomerDetails,
    pub return_url: String,
    pub notify_url: String,
}

/// What the gateway hands back for a created order.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreatedOrder {
    #[serde(default)]
    pub payment_session_id: Option<String>,
    #[serde(default)]
    pub order_token: Option<String>,
}

/// Operations the API needs from a payment gateway.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Whether credentials are available.
    fn is_configured(&self) -> bool;

    /// Creates an order and returns the checkout session handle.
    async fn create_order(&self, order: &OrderRequest) -> Result<CreatedOrder, GatewayError>;

    /// Lists the payment attempts for an order, newest first, as returned by the gateway.
    async fn order_payments(&self, order_id: &str) -> Result<Vec<Value>, GatewayError>;
}

#[derive(Serialize)]
struct CashfreeOrderBody<'a> {
    order_id: &'a str,
    order_amount: f64,
    order_currency: &'static str,
    customer_details: &'a CustomerDetails,
    order_meta: CashfreeOrderMeta<'a>,
}

#[derive(Serialize)]
struct CashfreeOrderMeta<'a> {
    return_url: &'a str,
    notify_url: &'a str,
    payment_methods: &'static str,
}

/// HTTP client for the CashFree PG API.
pub struct CashfreeClient {
    http_client: Client,
    environment: CashfreeEnvironment,
    app_id: Option<String>,
    secret_key: Option<String>,
}

impl CashfreeClient {
    pub fn new(
        environment: CashfreeEnvironment,
        app_id: Option<String>,
        secret_key: Option<String>,
    ) -> Result<Self, GatewayError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http_client,
            environment,
            app_id,
            secret_key,
        })
    }

    fn credentials(&self) -> Result<(&str, &str), GatewayError> {
        match (self.app_id.as_deref(), self.secret_key.as_deref()) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => Ok((id, secret)),
            _ => Err(GatewayError::NotConfigured),
        }
    }

    fn request(
        &self,
        method: reqwest::Method,
        path: &str,
    ) -> Result<reqwest::RequestBuilder, GatewayError> {
        let (app_id, secret_key) = self.credentials()?;
        let url = format!("{}{}", self.environment.base_url(), path);

        Ok(self
            .http_client
            .request(method, url)
            .header("x-api-version", API_VERSION)
            .header("x-client-id", app_id)
            .header("x-client-secret", secret_key))
    }

    async fn send_json<T: serde::de::DeserializeOwned>(
        request: reqwest::RequestBuilder,
    ) -> Result<T, GatewayError> {
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.json::<Value>().await.unwrap_or(Value::Null);
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl PaymentGateway for CashfreeClient {
    fn is_configured(&self) -> bool {
        self.credentials().is_ok()
    }

    async fn create_order(&self, order: &OrderRequest) -> Result<CreatedOrder, GatewayError> {
        let body = CashfreeOrderBody {
            order_id: &order.order_id,
            order_amount: order.amount.to_f64().unwrap_or_default(),
            order_currency: ORDER_CURRENCY,
            customer_details: &order.customer,
            order_meta: CashfreeOrderMeta {
                return_url: &order.return_url,
                notify_url: &order.notify_url,
                payment_methods: PAYMENT_METHODS,
            },
        };

        tracing::info!(
            order_id = %order.order_id,
            environment = self.environment.as_str(),
            "Creating CashFree order"
        );

        let request = self.request(reqwest::Method::POST, "/orders")?.json(&body);
        Self::send_json(request).await
    }

    async fn order_payments(&self, order_id: &str) -> Result<Vec<Value>, GatewayError> {
        if !is_valid_order_id(order_id) {
            return Err(GatewayError::InvalidOrderId(order_id.to_string()));
        }
        let path = format!("/orders/{}/payments", order_id);
        let request = self.request(reqwest::Method::GET, &path)?;
        Self::send_json(request).await
    }
}

/// Whether `order_id` is safe to splice into a gateway URL path.
///
/// CashFree order ids are alphanumeric plus `_` and `-`.
pub fn is_valid_order_id(order_id: &str) -> bool {
    !order_id.is_empty()
        && order_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Generates a merchant order id: `ORDER_<unix millis>_<random suffix>`.
pub fn generate_order_id() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    format!("ORDER_{}_{}", chrono::Utc::now().timestamp_millis(), suffix)
}

/// Generates a gateway customer id.
pub fn generate_customer_id() -> String {
    format!("CUST_{}", chrono::Utc::now().timestamp_millis())
}

/// Payment status as reported by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentStatus {
    Success,
    Failed,
    /// PENDING, USER_DROPPED, ... - not acted upon.
    Other(String),
}

impl PaymentStatus {
    pub fn parse(status: Option<&str>) -> Self {
        match status.map(str::trim) {
            Some("SUCCESS") => PaymentStatus::Success,
            Some("FAILED") => PaymentStatus::Failed,
            Some(other) => PaymentStatus::Other(other.to_string()),
            None => PaymentStatus::Other(String::new()),
        }
    }
}

/// A payment outcome pushed by webhook or returned by a status poll.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentNotification {
    #[serde(default)]
    pub order_id: Option<String>,
    /// Numeric in poll responses, sometimes a string in webhooks.
    #[serde(default)]
    pub cf_payment_id: Option<Value>,
    #[serde(default)]
    pub payment_id: Option<Value>,
    #[serde(default, deserialize_with = "crate::models::amount::deserialize_option")]
    pub payment_amount: Option<BigDecimal>,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    /// A plain tag in webhooks, an object keyed by method in poll responses.
    #[serde(default)]
    pub payment_method: Option<Value>,
    #[serde(default)]
    pub error_details: Option<Value>,
}

/// What a notification did to the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationOutcome {
    Credited { total_credits: u64 },
    FailureRecorded { failed_payments: u64 },
    Ignored { status: String },
    /// Missing order id or amount.
    Malformed,
}

impl PaymentNotification {
    pub fn status(&self) -> PaymentStatus {
        PaymentStatus::parse(self.payment_status.as_deref())
    }

    /// Gateway payment reference; `cf_payment_id` wins over `payment_id`.
    pub fn payment_reference(&self) -> Option<String> {
        [&self.cf_payment_id, &self.payment_id]
            .into_iter()
            .flatten()
            .find_map(value_to_string)
    }

    /// Payment method tag.
    pub fn method_tag(&self) -> Option<String> {
        match self.payment_method.as_ref()? {
            Value::String(s) => Some(s.clone()),
            Value::Object(map) => map.keys().next().cloned(),
            _ => None,
        }
    }

    /// Converts the notification into a ledger record.
    ///
    /// `order_id` overrides the body's order id (status polls know the order
    /// from the URL). Returns `None` when the order id or amount is missing.
    pub fn to_new_payment(&self, order_id: Option<&str>, environment: &str) -> Option<NewPayment> {
        let order_id = order_id
            .map(str::to_string)
            .or_else(|| self.order_id.clone())
            .filter(|id| !id.trim().is_empty())?;
        let amount = self.payment_amount.clone()?;

        Some(NewPayment {
            order_id,
            transaction_id: self.payment_reference(),
            amount,
            customer_email: self.customer_email.clone(),
            customer_name: self.customer_name.clone(),
            payment_method: self.method_tag(),
            environment: Some(environment.to_string()),
            error_details: self.error_details.clone(),
        })
    }

    /// Dispatches the notification: SUCCESS credits, FAILED records a
    /// failure, anything else is ignored.
    pub fn apply(
        &self,
        ledger: &CreditLedger,
        order_id: Option<&str>,
        environment: &str,
    ) -> NotificationOutcome {
        let status = match self.status() {
            PaymentStatus::Other(status) => {
                tracing::info!(
                    order_id = ?order_id.or(self.order_id.as_deref()),
                    status = %status,
                    "Payment status not actionable"
                );
                return NotificationOutcome::Ignored { status };
            }
            actionable => actionable,
        };

        let Some(mut payment) = self.to_new_payment(order_id, environment) else {
            tracing::warn!("Payment notification missing order id or amount");
            return NotificationOutcome::Malformed;
        };

        match status {
            PaymentStatus::Success => {
                payment.error_details = None;
                NotificationOutcome::Credited {
                    total_credits: ledger.add_success(payment),
                }
            }
            _ => NotificationOutcome::FailureRecorded {
                failed_payments: ledger.add_failure(payment),
            },
        }
    }
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
