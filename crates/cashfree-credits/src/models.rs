//! Ledger data model.

pub mod amount;
pub mod credit_history;
pub mod ledger_state;
pub mod payment_record;

pub use credit_history::{HistoryEntry, HistoryEventType};
pub use ledger_state::LedgerState;
pub use payment_record::{DedupKeys, FailedPaymentRecord, NewPayment, PaymentRecord};
