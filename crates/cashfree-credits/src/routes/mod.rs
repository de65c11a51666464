//! API routes for the credits server.

pub mod credits;
pub mod payment;

use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::gateway::{CashfreeEnvironment, PaymentGateway};
use crate::ledger::CreditLedger;

/// Shared handler state. Built once at startup and cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<CreditLedger>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub environment: CashfreeEnvironment,
    pub admin_secret: Arc<str>,
    pub return_url: Arc<str>,
    pub notify_url: Arc<str>,
}

impl AppState {
    /// Checks an admin request's shared secret.
    ///
    /// Plain equality: the admin surface is test tooling only.
    pub fn authorize(&self, secret_key: Option<&str>) -> Result<(), AppError> {
        if secret_key == Some(&*self.admin_secret) {
            Ok(())
        } else {
            tracing::warn!("Rejected admin request with invalid secret");
            Err(AppError::Unauthorized)
        }
    }

    /// Runs a ledger operation off the async executor (the ledger does
    /// blocking file I/O).
    pub async fn with_ledger<F, T>(&self, op: F) -> Result<T, AppError>
    where
        F: FnOnce(&CreditLedger) -> T + Send + 'static,
        T: Send + 'static,
    {
        let ledger = self.ledger.clone();
        tokio::task::spawn_blocking(move || op(ledger.as_ref()))
            .await
            .map_err(|e| AppError::Internal(format!("Ledger task failed: {}", e)))
    }
}

/// Creates the main router with all routes mounted.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/payment", api_routes(state))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn api_routes(state: AppState) -> Router {
    payment::router(state.clone()).merge(credits::router(state))
}

/// GET /health
async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
