//! Payment records stored by the credit ledger.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder email for payments that arrive without customer details.
pub const DEFAULT_CUSTOMER_EMAIL: &str = "unknown@example.com";

/// Placeholder name for payments that arrive without customer details.
pub const DEFAULT_CUSTOMER_NAME: &str = "Unknown Customer";

/// Placeholder payment method tag.
pub const DEFAULT_PAYMENT_METHOD: &str = "unknown";

/// Environment tag used when the notifier does not say where a payment came from.
pub const DEFAULT_ENVIRONMENT: &str = "SANDBOX";

/// A successful payment that earned one credit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    /// Merchant-assigned order id (primary dedup key).
    pub order_id: String,
    /// Gateway-assigned payment id (secondary dedup key).
    pub transaction_id: String,
    /// Amount paid.
    #[serde(deserialize_with = "super::amount::deserialize")]
    pub amount: BigDecimal,
    pub customer_email: String,
    pub customer_name: String,
    /// Payment method tag (upi, card, manual, test, ...).
    pub payment_method: String,
    /// When the ledger accepted this payment (immutable).
    pub timestamp: DateTime<Utc>,
    /// Gateway environment the payment came from (SANDBOX or PRODUCTION).
    pub environment: String,
}

/// A failed payment attempt. Tracked for analytics, never credited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedPaymentRecord {
    pub order_id: String,
    pub transaction_id: String,
    #[serde(deserialize_with = "super::amount::deserialize")]
    pub amount: BigDecimal,
    pub customer_email: String,
    pub customer_name: String,
    pub payment_method: String,
    /// Opaque diagnostic payload from the gateway.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_details: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
    pub environment: String,
}

/// Data required to record a payment outcome.
///
/// Only `order_id` and `amount` are mandatory; everything else is filled with
/// placeholders by the ledger.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPayment {
    #[serde(default)]
    pub order_id: String,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(deserialize_with = "super::amount::deserialize")]
    pub amount: BigDecimal,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub environment: Option<String>,
    /// Only meaningful for failed payments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_details: Option<serde_json::Value>,
}

impl NewPayment {
    /// Create a payment with just the mandatory fields set.
    pub fn new(order_id: impl Into<String>, amount: BigDecimal) -> Self {
        Self {
            order_id: order_id.into(),
            amount,
            ..Default::default()
        }
    }

    /// Builder-style setter for the gateway transaction id.
    pub fn with_transaction_id(mut self, transaction_id: impl Into<String>) -> Self {
        self.transaction_id = Some(transaction_id.into());
        self
    }

    /// The transaction id, if one was supplied and is not blank.
    pub fn transaction_key(&self) -> Option<&str> {
        self.transaction_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    /// Strips surrounding whitespace from the order id so that `" A"` and
    /// `"A"` are the same order.
    pub fn normalized(mut self) -> Self {
        let trimmed = self.order_id.trim();
        if trimmed.len() != self.order_id.len() {
            self.order_id = trimmed.to_string();
        }
        self
    }

    /// Whether the record carries a usable order id.
    pub fn has_order_id(&self) -> bool {
        !self.order_id.trim().is_empty()
    }

    /// Fills defaults and stamps the record as a credited payment.
    pub fn into_payment(self, timestamp: DateTime<Utc>) -> PaymentRecord {
        let transaction_id = self.resolved_transaction_id(timestamp);
        PaymentRecord {
            order_id: self.order_id,
            transaction_id,
            amount: self.amount,
            customer_email: self
                .customer_email
                .unwrap_or_else(|| DEFAULT_CUSTOMER_EMAIL.to_string()),
            customer_name: self
                .customer_name
                .unwrap_or_else(|| DEFAULT_CUSTOMER_NAME.to_string()),
            payment_method: self
                .payment_method
                .unwrap_or_else(|| DEFAULT_PAYMENT_METHOD.to_string()),
            timestamp,
            environment: self
                .environment
                .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string()),
        }
    }

    /// Fills defaults and stamps the record as a failed payment.
    pub fn into_failed_payment(self, timestamp: DateTime<Utc>) -> FailedPaymentRecord {
        let transaction_id = self.resolved_transaction_id(timestamp);
        FailedPaymentRecord {
            order_id: self.order_id,
            transaction_id,
            amount: self.amount,
            customer_email: self
                .customer_email
                .unwrap_or_else(|| DEFAULT_CUSTOMER_EMAIL.to_string()),
            customer_name: self
                .customer_name
                .unwrap_or_else(|| DEFAULT_CUSTOMER_NAME.to_string()),
            payment_method: self
                .payment_method
                .unwrap_or_else(|| DEFAULT_PAYMENT_METHOD.to_string()),
            error_details: self.error_details,
            timestamp,
            environment: self
                .environment
                .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string()),
        }
    }

    fn resolved_transaction_id(&self, timestamp: DateTime<Utc>) -> String {
        match self.transaction_key() {
            Some(id) => id.to_string(),
            None => synthesize_transaction_id(timestamp),
        }
    }
}

/// Builds a transaction id for records the gateway did not give one.
pub fn synthesize_transaction_id(timestamp: DateTime<Utc>) -> String {
    format!("TXN_{}", timestamp.timestamp_millis())
}

/// Access to the two dedup keys shared by both record kinds.
pub trait DedupKeys {
    fn order_id(&self) -> &str;
    fn transaction_id(&self) -> &str;

    /// A record matches when the order id is equal, or when the incoming
    /// transaction id is present and equal.
    fn matches(&self, order_id: &str, transaction_id: Option<&str>) -> bool {
        self.order_id() == order_id || transaction_id == Some(self.transaction_id())
    }
}

impl DedupKeys for PaymentRecord {
    fn order_id(&self) -> &str {
        &self.order_id
    }

    fn transaction_id(&self) -> &str {
        &self.transaction_id
    }
}

impl DedupKeys for FailedPaymentRecord {
    fn order_id(&self) -> &str {
        &self.order_id
    }

    fn transaction_id(&self) -> &str {
        &self.transaction_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::str::FromStr;

    #[test]
    fn test_into_payment_fills_defaults() {
        let now = Utc::now();
        let record = NewPayment::new("ORDER_1", BigDecimal::from(100)).into_payment(now);

        assert_eq!(record.order_id, "ORDER_1");
        assert_eq!(record.transaction_id, format!("TXN_{}", now.timestamp_millis()));
        assert_eq!(record.customer_email, DEFAULT_CUSTOMER_EMAIL);
        assert_eq!(record.customer_name, DEFAULT_CUSTOMER_NAME);
        assert_eq!(record.payment_method, DEFAULT_PAYMENT_METHOD);
        assert_eq!(record.environment, DEFAULT_ENVIRONMENT);
        assert_eq!(record.timestamp, now);
    }

    #[test]
    fn test_into_payment_keeps_supplied_fields() {
        let now = Utc::now();
        let record = NewPayment {
            order_id: "ORDER_2".to_string(),
            transaction_id: Some("5114910".to_string()),
            amount: BigDecimal::from_str("249.50").unwrap(),
            customer_email: Some("asha@example.com".to_string()),
            customer_name: Some("Asha".to_string()),
            payment_method: Some("upi".to_string()),
            environment: Some("PRODUCTION".to_string()),
            error_details: None,
        }
        .into_payment(now);

        assert_eq!(record.transaction_id, "5114910");
        assert_eq!(record.customer_email, "asha@example.com");
        assert_eq!(record.payment_method, "upi");
        assert_eq!(record.environment, "PRODUCTION");
    }

    #[test]
    fn test_blank_transaction_id_is_synthesized() {
        let now = Utc::now();
        let payment = NewPayment::new("ORDER_3", BigDecimal::from(1)).with_transaction_id("  ");
        assert!(payment.transaction_key().is_none());
        assert!(payment.into_payment(now).transaction_id.starts_with("TXN_"));
    }

    #[test]
    fn test_failed_payment_keeps_error_details() {
        let details = json!({"error_code": "TRANSACTION_DECLINED"});
        let mut payment = NewPayment::new("ORDER_4", BigDecimal::from(10));
        payment.error_details = Some(details.clone());

        let failed = payment.into_failed_payment(Utc::now());
        assert_eq!(failed.error_details, Some(details));
    }

    #[test]
    fn test_matches_on_order_or_transaction() {
        let record = NewPayment::new("A", BigDecimal::from(1))
            .with_transaction_id("T1")
            .into_payment(Utc::now());

        assert!(record.matches("A", None));
        assert!(record.matches("A", Some("other")));
        assert!(record.matches("B", Some("T1")));
        assert!(!record.matches("B", None));
        assert!(!record.matches("B", Some("T2")));
    }

    #[test]
    fn test_new_payment_deserializes_numeric_amount() {
        let payment: NewPayment = serde_json::from_value(json!({
            "orderId": "ORDER_5",
            "amount": 100,
            "paymentMethod": "card"
        }))
        .unwrap();

        assert_eq!(payment.amount, BigDecimal::from(100));
        assert_eq!(payment.payment_method.as_deref(), Some("card"));
        assert!(payment.transaction_id.is_none());
    }

    #[test]
    fn test_normalized_trims_order_id() {
        let payment = NewPayment::new("  ORDER_7 ", BigDecimal::from(1)).normalized();
        assert_eq!(payment.order_id, "ORDER_7");

        let blank = NewPayment::new("   ", BigDecimal::from(1)).normalized();
        assert!(!blank.has_order_id());
    }

    #[test]
    fn test_float_amount_keeps_decimal_text() {
        let payment: NewPayment = serde_json::from_value(json!({
            "orderId": "ORDER_8",
            "amount": 249.99
        }))
        .unwrap();
        let record = payment.into_payment(Utc::now());

        assert_eq!(serde_json::to_value(&record).unwrap()["amount"], "249.99");
    }

    #[test]
    fn test_payment_record_serializes_camel_case() {
        let record = NewPayment::new("ORDER_6", BigDecimal::from(5)).into_payment(Utc::now());
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["orderId"], "ORDER_6");
        assert!(value.get("transactionId").is_some());
        assert!(value.get("customerEmail").is_some());
        assert!(value.get("order_id").is_none());
    }
}
