use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;

use cashfree_credits::config::Config;
use cashfree_credits::gateway::CashfreeClient;
use cashfree_credits::storage::open_store;
use cashfree_credits::{create_router, AppState, CreditLedger};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    let store = open_store(&config.storage);
    tracing::info!(storage = %store.describe(), "Opening credit ledger");
    let ledger = CreditLedger::new(store);

    let gateway = CashfreeClient::new(
        config.environment,
        config.cashfree_app_id.clone(),
        config.cashfree_secret_key.clone(),
    )
    .context("Failed to build CashFree client")?;

    if config.cashfree_app_id.is_none() || config.cashfree_secret_key.is_none() {
        tracing::warn!("CashFree credentials not set; order creation will fail");
    }

    let state = AppState {
        ledger: Arc::new(ledger),
        gateway: Arc::new(gateway),
        environment: config.environment,
        admin_secret: config.admin_secret.into(),
        return_url: config.return_url.into(),
        notify_url: config.notify_url.into(),
    };

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!(
        %addr,
        environment = config.environment.as_str(),
        "CashFree credits server listening"
    );

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
