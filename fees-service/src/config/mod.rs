//! Configuration module for fees-service.

use secrecy::Secret;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct FeesConfig {
    pub common: core_config::Config,
    pub service_name: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub database: DatabaseConfig,
    pub paystack: PaystackConfig,
    pub reconciliation: ReconciliationConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Mongo,
    Memory,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub backend: StoreBackend,
    pub url: Secret<String>,
    pub db_name: String,
}

#[derive(Debug, Clone)]
pub struct PaystackConfig {
    pub secret_key: Secret<String>,
    /// Overrides `secret_key` as the webhook HMAC key when set.
    pub webhook_secret: Option<Secret<String>>,
    pub api_base_url: String,
    pub callback_url: Option<String>,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ReconciliationConfig {
    /// Read-compute-write attempts before a conflict is surfaced as transient.
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            retry_delay: Duration::from_millis(25),
        }
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl FeesConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;

        let backend = match env::var("FEES_STORE_BACKEND")
            .unwrap_or_else(|_| "mongo".to_string())
            .to_lowercase()
            .as_str()
        {
            "mongo" => StoreBackend::Mongo,
            "memory" => StoreBackend::Memory,
            other => {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "FEES_STORE_BACKEND must be 'mongo' or 'memory', got '{}'",
                    other
                )))
            }
        };

        let db_url = match (env::var("FEES_DATABASE_URL"), backend) {
            (Ok(url), _) => url,
            (Err(_), StoreBackend::Memory) => String::new(),
            (Err(_), StoreBackend::Mongo) => {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "FEES_DATABASE_URL is required"
                )))
            }
        };

        let secret_key = env::var("PAYSTACK_SECRET_KEY").unwrap_or_default();

        let defaults = ReconciliationConfig::default();

        Ok(Self {
            common,
            service_name: env::var("SERVICE_NAME").unwrap_or_else(|_| "fees-service".to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
            database: DatabaseConfig {
                backend,
                url: Secret::new(db_url),
                db_name: env::var("FEES_DATABASE_NAME").unwrap_or_else(|_| "fees_db".to_string()),
            },
            paystack: PaystackConfig {
                secret_key: Secret::new(secret_key),
                webhook_secret: env::var("PAYSTACK_WEBHOOK_SECRET")
                    .ok()
                    .filter(|s| !s.is_empty())
                    .map(Secret::new),
                api_base_url: env::var("PAYSTACK_API_BASE_URL")
                    .unwrap_or_else(|_| "https://api.paystack.co".to_string())
                    .trim_end_matches('/')
                    .to_string(),
                callback_url: env::var("PAYSTACK_CALLBACK_URL").ok(),
                timeout: Duration::from_secs(parse_or("PAYSTACK_TIMEOUT_SECS", 10)),
            },
            reconciliation: ReconciliationConfig {
                max_attempts: parse_or("RECONCILE_MAX_ATTEMPTS", defaults.max_attempts).max(1),
                retry_delay: Duration::from_millis(parse_or(
                    "RECONCILE_RETRY_DELAY_MS",
                    defaults.retry_delay.as_millis() as u64,
                )),
            },
        })
    }
}
