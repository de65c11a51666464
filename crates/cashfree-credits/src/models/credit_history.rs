//! Append-only credit history log.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::payment_record::{FailedPaymentRecord, PaymentRecord};

/// Kind of ledger mutation a history entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryEventType {
    /// A payment was credited.
    Success,
    /// A failed payment was recorded.
    Failed,
}

impl HistoryEventType {
    /// How many credits an event of this kind adds to the total.
    pub fn credit_change(self) -> i64 {
        match self {
            HistoryEventType::Success => 1,
            HistoryEventType::Failed => 0,
        }
    }
}

/// One entry of the credit history. Written exactly once per accepted
/// payment or failure, never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    #[serde(rename = "type")]
    pub event_type: HistoryEventType,
    /// +1 for credited payments, 0 for failures.
    pub change: i64,
    pub order_id: String,
    pub transaction_id: String,
    #[serde(deserialize_with = "super::amount::deserialize")]
    pub amount: BigDecimal,
    pub timestamp: DateTime<Utc>,
    pub customer_name: String,
    pub payment_method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_details: Option<serde_json::Value>,
}

impl HistoryEntry {
    /// History entry for a credited payment.
    pub fn success(record: &PaymentRecord) -> Self {
        Self {
            event_type: HistoryEventType::Success,
            change: HistoryEventType::Success.credit_change(),
            order_id: record.order_id.clone(),
            transaction_id: record.transaction_id.clone(),
            amount: record.amount.clone(),
            timestamp: record.timestamp,
            customer_name: record.customer_name.clone(),
            payment_method: record.payment_method.clone(),
            error_details: None,
        }
    }

    /// History entry for a failed payment.
    pub fn failed(record: &FailedPaymentRecord) -> Self {
        Self {
            event_type: HistoryEventType::Failed,
            change: HistoryEventType::Failed.credit_change(),
            order_id: record.order_id.clone(),
            transaction_id: record.transaction_id.clone(),
            amount: record.amount.clone(),
            timestamp: record.timestamp,
            customer_name: record.customer_name.clone(),
            payment_method: record.payment_method.clone(),
            error_details: record.error_details.clone(),
        }
    }
}
