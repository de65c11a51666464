//! The ledger aggregate as it is persisted.

use serde::{Deserialize, Serialize};

use super::credit_history::HistoryEntry;
use super::payment_record::{DedupKeys, FailedPaymentRecord, PaymentRecord};

/// Whole ledger state. Persisted as a single JSON document.
///
/// `failed_payments` and `credit_history` default to empty so that files
/// written before those fields existed still load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerState {
    /// Always equal to `payments.len()` after an accepted write.
    pub total_credits: u64,
    pub payments: Vec<PaymentRecord>,
    #[serde(default)]
    pub failed_payments: Vec<FailedPaymentRecord>,
    #[serde(default)]
    pub credit_history: Vec<HistoryEntry>,
}

impl LedgerState {
    /// Whether a credited payment already matches the given dedup keys.
    pub fn has_payment(&self, order_id: &str, transaction_id: Option<&str>) -> bool {
        self.payments
            .iter()
            .any(|p| p.matches(order_id, transaction_id))
    }

    /// Whether a failed payment already matches the given dedup keys.
    pub fn has_failed_payment(&self, order_id: &str, transaction_id: Option<&str>) -> bool {
        self.failed_payments
            .iter()
            .any(|p| p.matches(order_id, transaction_id))
    }

    /// Appends a credited payment and its history entry, then recomputes the total.
    pub fn push_payment(&mut self, record: PaymentRecord) {
        self.credit_history.push(HistoryEntry::success(&record));
        self.payments.push(record);
        self.total_credits = self.payments.len() as u64;
    }

    /// Appends a failed payment and its history entry. The total is untouched.
    pub fn push_failed_payment(&mut self, record: FailedPaymentRecord) {
        self.credit_history.push(HistoryEntry::failed(&record));
        self.failed_payments.push(record);
    }

    /// Number of failed payments recorded.
    pub fn failed_count(&self) -> u64 {
        self.failed_payments.len() as u64
    }

    /// The total the ledger should report, derived from the payments list.
    pub fn expected_total(&self) -> u64 {
        self.payments.len() as u64
    }

    /// Whether the stored total has drifted from the payments list.
    pub fn is_consistent(&self) -> bool {
        self.total_credits == self.expected_total()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HistoryEventType, NewPayment};
    use bigdecimal::BigDecimal;
    use chrono::Utc;
    use serde_json::json;

    #[test]
    fn test_default_is_empty() {
        let state = LedgerState::default();
        assert_eq!(state.total_credits, 0);
        assert!(state.payments.is_empty());
        assert!(state.failed_payments.is_empty());
        assert!(state.credit_history.is_empty());
    }

    #[test]
    fn test_push_payment_keeps_total_in_sync() {
        let mut state = LedgerState::default();
        state.push_payment(NewPayment::new("A", BigDecimal::from(100)).into_payment(Utc::now()));
        state.push_payment(NewPayment::new("B", BigDecimal::from(200)).into_payment(Utc::now()));

        assert_eq!(state.total_credits, 2);
        assert_eq!(state.credit_history.len(), 2);
        assert!(state.is_consistent());
    }

    #[test]
    fn test_push_failed_payment_leaves_total() {
        let mut state = LedgerState::default();
        state.push_payment(NewPayment::new("A", BigDecimal::from(100)).into_payment(Utc::now()));
        state.push_failed_payment(
            NewPayment::new("C", BigDecimal::from(10)).into_failed_payment(Utc::now()),
        );

        assert_eq!(state.total_credits, 1);
        assert_eq!(state.failed_count(), 1);
        let kinds: Vec<HistoryEventType> =
            state.credit_history.iter().map(|e| e.event_type).collect();
        assert_eq!(kinds, vec![HistoryEventType::Success, HistoryEventType::Failed]);
    }

    #[test]
    fn test_dedup_lookup_is_per_sequence() {
        let mut state = LedgerState::default();
        state.push_failed_payment(
            NewPayment::new("C", BigDecimal::from(10)).into_failed_payment(Utc::now()),
        );

        assert!(state.has_failed_payment("C", None));
        assert!(!state.has_payment("C", None));
    }

    #[test]
    fn test_legacy_file_without_failures_or_history() {
        let state: LedgerState = serde_json::from_value(json!({
            "totalCredits": 0,
            "payments": []
        }))
        .unwrap();

        assert_eq!(state, LedgerState::default());
    }

    #[test]
    fn test_drift_detection() {
        let mut state = LedgerState::default();
        state.push_payment(NewPayment::new("A", BigDecimal::from(1)).into_payment(Utc::now()));
        state.total_credits = 7;

        assert!(!state.is_consistent());
        assert_eq!(state.expected_total(), 1);
    }
}
