//! The credit ledger.
//!
//! Records payment outcomes exactly once per order/transaction id and keeps
//! `total_credits` equal to the number of credited payments. Every operation
//! is a whole-state read-mutate-write against a [`LedgerStore`].
//!
//! Storage failures never surface to callers. A failed read yields an empty
//! ledger; a failed write switches the ledger to memory-only mode, where the
//! last good in-memory state is the source of truth until a write succeeds
//! again.

use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;

use crate::models::{LedgerState, NewPayment};
use crate::storage::LedgerStore;

/// Outcome of a [`CreditLedger::reconcile`] run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    /// Stored total before reconciling.
    pub previous_total: u64,
    /// Total after reconciling (always the number of payments).
    pub total_credits: u64,
    /// Whether the stored total had drifted and was rewritten.
    pub adjusted: bool,
}

/// In-memory view kept next to the backing store.
#[derive(Default)]
struct MemoryView {
    /// Set while the backing store rejects writes.
    fallback: Option<LedgerState>,
}

pub struct CreditLedger {
    store: Box<dyn LedgerStore>,
    // Serializes read-mutate-write cycles within this process.
    memory: Mutex<MemoryView>,
}

impl CreditLedger {
    /// Creates the ledger, writing an empty state if nothing is persisted yet.
    pub fn new(store: Box<dyn LedgerStore>) -> Self {
        let ledger = Self {
            store,
            memory: Mutex::new(MemoryView::default()),
        };

        match ledger.store.load() {
            Ok(Some(state)) => {
                tracing::info!(
                    store = %ledger.store.describe(),
                    total_credits = state.total_credits,
                    "Credit ledger loaded"
                );
            }
            Ok(None) => {
                let mut view = ledger.memory.lock();
                ledger.persist(&mut view, LedgerState::default());
                tracing::info!(store = %ledger.store.describe(), "Credit ledger initialized");
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to load credit ledger; starting from empty state");
            }
        }

        ledger
    }

    /// Credits a successful payment.
    ///
    /// Returns the total number of credits afterwards. Duplicates (same order
    /// id, or same transaction id when one is given) and records without an
    /// order id leave the ledger untouched and return the current total.
    pub fn add_success(&self, payment: NewPayment) -> u64 {
        let payment = payment.normalized();
        let mut view = self.memory.lock();
        let mut state = self.current(&view);

        if !payment.has_order_id() {
            tracing::warn!("Ignoring payment without an order id");
            return state.total_credits;
        }

        if state.has_payment(&payment.order_id, payment.transaction_key()) {
            tracing::info!(order_id = %payment.order_id, "Payment already credited");
            return state.total_credits;
        }

        let record = payment.into_payment(Utc::now());
        let order_id = record.order_id.clone();
        state.push_payment(record);
        let total = state.total_credits;

        self.persist(&mut view, state);
        tracing::info!(order_id = %order_id, total_credits = total, "Credit added");
        total
    }

    /// Records a failed payment. Never changes the credit total.
    ///
    /// Returns the number of failed payments afterwards, with the same
    /// duplicate and missing-order-id handling as [`Self::add_success`].
    pub fn add_failure(&self, payment: NewPayment) -> u64 {
        let payment = payment.normalized();
        let mut view = self.memory.lock();
        let mut state = self.current(&view);

        if !payment.has_order_id() {
            tracing::warn!("Ignoring failed payment without an order id");
            return state.failed_count();
        }

        if state.has_failed_payment(&payment.order_id, payment.transaction_key()) {
            tracing::info!(order_id = %payment.order_id, "Failed payment already recorded");
            return state.failed_count();
        }

        let record = payment.into_failed_payment(Utc::now());
        let order_id = record.order_id.clone();
        state.push_failed_payment(record);
        let failed = state.failed_count();

        self.persist(&mut view, state);
        tracing::info!(order_id = %order_id, failed_payments = failed, "Failed payment recorded");
        failed
    }

    /// Current ledger state. Never fails; storage errors yield an empty ledger.
    pub fn read(&self) -> LedgerState {
        let view = self.memory.lock();
        self.current(&view)
    }

    /// Replaces the ledger with an empty one.
    ///
    /// Returns `false` when the empty state could only be kept in memory.
    pub fn reset(&self) -> bool {
        let mut view = self.memory.lock();
        let persisted = self.persist(&mut view, LedgerState::default());
        tracing::info!(persisted, "Credit ledger reset");
        persisted
    }

    /// Recomputes the total from the payments list and rewrites the state if
    /// the two had drifted apart.
    pub fn reconcile(&self) -> ReconcileReport {
        let mut view = self.memory.lock();
        let mut state = self.current(&view);
        let previous_total = state.total_credits;

        if state.is_consistent() {
            return ReconcileReport {
                previous_total,
                total_credits: previous_total,
                adjusted: false,
            };
        }

        state.total_credits = state.expected_total();
        let total_credits = state.total_credits;
        tracing::warn!(previous_total, total_credits, "Credit total drifted; reconciling");
        self.persist(&mut view, state);

        ReconcileReport {
            previous_total,
            total_credits,
            adjusted: true,
        }
    }

    /// Whether writes are currently only kept in memory.
    pub fn is_degraded(&self) -> bool {
        self.memory.lock().fallback.is_some()
    }

    fn current(&self, view: &MemoryView) -> LedgerState {
        if let Some(state) = &view.fallback {
            return state.clone();
        }

        match self.store.load() {
            Ok(state) => state.unwrap_or_default(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to read credit ledger; using empty state");
                LedgerState::default()
            }
        }
    }

    fn persist(&self, view: &mut MemoryView, state: LedgerState) -> bool {
        match self.store.save(&state) {
            Ok(()) => {
                if view.fallback.take().is_some() {
                    tracing::info!(store = %self.store.describe(), "Ledger persistence recovered");
                }
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to persist credit ledger; continuing in memory");
                view.fallback = Some(state);
                false
            }
        }
    }
}
