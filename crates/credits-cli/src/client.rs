// HTTP client for the credits API

use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const REQUEST_TIMEOUT_SECS: u64 = 15;

/// Ledger summary returned by `GET /api/payment/credits`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditsSummary {
    pub total_credits: u64,
    #[serde(default)]
    pub payment_history: Vec<PaymentRow>,
    #[serde(default)]
    pub failed_payments: Vec<PaymentRow>,
    #[serde(default)]
    pub total_failed_payments: usize,
    #[serde(default)]
    pub credit_history: Vec<HistoryRow>,
}

/// A successful or failed payment as listed by the server.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRow {
    pub order_id: String,
    #[serde(default)]
    pub transaction_id: String,
    /// Decimal string on the wire.
    pub amount: Value,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub payment_method: String,
    #[serde(default)]
    pub error_details: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRow {
    #[serde(rename = "type")]
    pub event_type: String,
    pub change: i64,
    pub order_id: String,
    pub amount: Value,
    #[serde(default)]
    pub timestamp: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedPaymentsSummary {
    pub failed_payments: Vec<PaymentRow>,
    pub total_failed_payments: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCreditResult {
    pub message: String,
    pub total_credits: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetResult {
    pub message: String,
    pub persisted: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileResult {
    pub previous_total: u64,
    pub total_credits: u64,
    pub adjusted: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatedOrder {
    pub order_id: String,
    pub payment_session_id: Option<String>,
    pub environment: String,
}

/// Parameters for a synthetic test credit. Unset fields use server defaults.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCreditParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderParams {
    pub amount: f64,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
}

/// Blocking client for one credits server.
pub struct ApiClient {
    agent: ureq::Agent,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build();

        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn health(&self) -> Result<Value> {
        self.get("/health")
    }

    pub fn credits(&self) -> Result<CreditsSummary> {
        self.get("/api/payment/credits")
    }

    pub fn credits_raw(&self) -> Result<Value> {
        self.get("/api/payment/credits")
    }

    pub fn failed_payments(&self) -> Result<FailedPaymentsSummary> {
        self.get("/api/payment/failed-payments")
    }

    pub fn payment_status(&self, order_id: &str) -> Result<Value> {
        self.get(&format!("/api/payment/status/{}", order_id))
    }

    pub fn add_test_credit(&self, secret: &str, params: &TestCreditParams) -> Result<TestCreditResult> {
        let mut body = serde_json::to_value(params)?;
        body["secretKey"] = Value::from(secret);
        self.post("/api/payment/credits/add-test-credit", &body)
    }

    pub fn reset(&self, secret: &str) -> Result<ResetResult> {
        self.post(
            "/api/payment/credits/reset",
            &serde_json::json!({ "secretKey": secret }),
        )
    }

    pub fn reconcile(&self, secret: &str) -> Result<ReconcileResult> {
        self.post(
            "/api/payment/credits/reconcile",
            &serde_json::json!({ "secretKey": secret }),
        )
    }

    pub fn create_order(&self, params: &OrderParams) -> Result<CreatedOrder> {
        self.post("/api/payment/create-order", &serde_json::to_value(params)?)
    }

    fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        read_response(&url, self.agent.get(&url).call())
    }

    fn post<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T> {
        let url = self.url(path);
        read_response(&url, self.agent.post(&url).send_json(body))
    }
}

fn read_response<T: DeserializeOwned>(
    url: &str,
    result: Result<ureq::Response, ureq::Error>,
) -> Result<T> {
    match result {
        Ok(response) => response
            .into_json::<T>()
            .map_err(|e| anyhow!("Failed to parse response from {}: {}", url, e)),
        Err(ureq::Error::Status(code, response)) => {
            let body = response.into_json::<Value>().unwrap_or(Value::Null);
            Err(anyhow!("Server returned {}: {}", code, error_message(&body)))
        }
        Err(e) => Err(anyhow!("Failed to reach {}: {}", url, e)),
    }
}

/// Extracts the `error` field of an API error body.
fn error_message(body: &Value) -> String {
    body.get("error")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| "unknown error".to_string())
}
