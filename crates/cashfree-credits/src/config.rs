//! Server configuration, read from the environment.

use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};

use crate::gateway::CashfreeEnvironment;
use crate::storage::StorageBackend;

/// Shared secret accepted by the admin endpoints when none is configured.
pub const DEFAULT_ADMIN_SECRET: &str = "test-credit-key";

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DATA_FILE: &str = "data/credits.json";
const LEDGER_FILE_NAME: &str = "credits.json";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub storage: StorageBackend,
    pub environment: CashfreeEnvironment,
    pub cashfree_app_id: Option<String>,
    pub cashfree_secret_key: Option<String>,
    pub return_url: String,
    pub notify_url: String,
    pub admin_secret: String,
}

impl Config {
    /// Loads `.env` (if present) and reads the process environment.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match var("PORT") {
            Some(port) => port
                .trim()
                .parse()
                .with_context(|| format!("PORT must be a valid port number, got {:?}", port))?,
            None => DEFAULT_PORT,
        };

        let serverless = ["VERCEL", "NETLIFY"]
            .iter()
            .any(|key| var(key).map(|v| is_truthy(&v)).unwrap_or(false));

        let data_file = var("CREDITS_DATA_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_FILE));
        let temp_file = var("CREDITS_TEMP_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| env::temp_dir().join(LEDGER_FILE_NAME));

        let storage = match var("CREDITS_STORAGE").as_deref().map(str::trim) {
            None if serverless => StorageBackend::Ephemeral(temp_file),
            None => StorageBackend::File(data_file),
            Some(kind) if kind.eq_ignore_ascii_case("file") => StorageBackend::File(data_file),
            Some(kind) if kind.eq_ignore_ascii_case("ephemeral") => {
                StorageBackend::Ephemeral(temp_file)
            }
            Some(other) => {
                return Err(anyhow!(
                    "CREDITS_STORAGE must be 'file' or 'ephemeral', got {:?}",
                    other
                ))
            }
        };

        let environment = match var("CASHFREE_ENVIRONMENT") {
            Some(env) => env.parse::<CashfreeEnvironment>().map_err(|e| anyhow!(e))?,
            None => CashfreeEnvironment::Sandbox,
        };

        let return_url = var("RETURN_URL")
            .unwrap_or_else(|| format!("http://localhost:{}/success", port));
        let notify_url = var("NOTIFY_URL")
            .unwrap_or_else(|| format!("http://localhost:{}/api/payment/webhook", port));

        Ok(Self {
            port,
            storage,
            environment,
            cashfree_app_id: var("CASHFREE_APP_ID"),
            cashfree_secret_key: var("CASHFREE_SECRET_KEY"),
            return_url,
            notify_url,
            admin_secret: var("CREDITS_ADMIN_SECRET")
                .unwrap_or_else(|| DEFAULT_ADMIN_SECRET.to_string()),
        })
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.port, 3000);
        assert_eq!(
            config.storage,
            StorageBackend::File(PathBuf::from("data/credits.json"))
        );
        assert_eq!(config.environment, CashfreeEnvironment::Sandbox);
        assert!(config.cashfree_app_id.is_none());
        assert_eq!(config.admin_secret, DEFAULT_ADMIN_SECRET);
        assert_eq!(config.return_url, "http://localhost:3000/success");
    }

    #[test]
    fn test_serverless_defaults_to_ephemeral() {
        let config = config_from(&[("VERCEL", "1")]).unwrap();
        assert!(matches!(config.storage, StorageBackend::Ephemeral(_)));

        let config = config_from(&[("NETLIFY", "true")]).unwrap();
        assert!(matches!(config.storage, StorageBackend::Ephemeral(_)));
    }

    #[test]
    fn test_explicit_storage_wins() {
        let config = config_from(&[
            ("VERCEL", "1"),
            ("CREDITS_STORAGE", "file"),
            ("CREDITS_DATA_FILE", "/var/lib/credits/ledger.json"),
        ])
        .unwrap();

        assert_eq!(
            config.storage,
            StorageBackend::File(PathBuf::from("/var/lib/credits/ledger.json"))
        );
    }

    #[test]
    fn test_ephemeral_temp_file_override() {
        let config = config_from(&[
            ("CREDITS_STORAGE", "ephemeral"),
            ("CREDITS_TEMP_FILE", "/tmp/ledger.json"),
        ])
        .unwrap();

        assert_eq!(
            config.storage,
            StorageBackend::Ephemeral(PathBuf::from("/tmp/ledger.json"))
        );
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(config_from(&[("PORT", "http")]).is_err());
        assert!(config_from(&[("CREDITS_STORAGE", "s3")]).is_err());
        assert!(config_from(&[("CASHFREE_ENVIRONMENT", "staging")]).is_err());
    }

    #[test]
    fn test_gateway_settings() {
        let config = config_from(&[
            ("PORT", "8080"),
            ("CASHFREE_ENVIRONMENT", "PRODUCTION"),
            ("CASHFREE_APP_ID", "app-id"),
            ("CASHFREE_SECRET_KEY", "secret"),
            ("NOTIFY_URL", "https://shop.example.com/api/payment/webhook"),
            ("CREDITS_ADMIN_SECRET", "s3cret"),
        ])
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.environment, CashfreeEnvironment::Production);
        assert_eq!(config.cashfree_app_id.as_deref(), Some("app-id"));
        assert_eq!(config.notify_url, "https://shop.example.com/api/payment/webhook");
        assert_eq!(config.return_url, "http://localhost:8080/success");
        assert_eq!(config.admin_secret, "s3cret");
    }
}
