//! CashFree Credits - checkout and credit tracking API
//!
//! This crate creates CashFree orders, turns payment notifications into
//! credits, and keeps an idempotent ledger of successful and failed
//! payments on disk (or in a temp-dir cache on serverless hosts).

pub mod config;
pub mod error;
pub mod gateway;
pub mod ledger;
pub mod models;
pub mod routes;
pub mod storage;

pub use error::AppError;
pub use ledger::CreditLedger;
pub use routes::{create_router, AppState};
