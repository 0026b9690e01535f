//! Service configuration

use std::time::Duration;

use crate::service::OrderSettings;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone)]
pub struct Config {
    /// development | staging | production
    pub environment: String,
    /// PostgreSQL connection URL; the in-memory store is used when absent in development
    pub database_url: Option<String>,
    pub port: u16,
    /// HS256 secret for bearer tokens issued by the identity service
    pub jwt_secret: String,
    pub payment_api_base: String,
    pub payment_key_id: String,
    /// Shared secret for gateway API calls and confirmation signatures
    pub payment_key_secret: String,
    pub currency: String,
    pub tx_timeout: Duration,
    pub nats_url: Option<String>,
}

impl Config {
    /// Must be set and non-empty outside development.
    fn require_secret(name: &str, environment: &str) -> Result<String, BoxError> {
        let val = match std::env::var(name) {
            Ok(v) => v,
            Err(_) => {
                if environment != "development" {
                    return Err(format!("{name} must be set in {environment} environment").into());
                }
                format!("dev-{name}-not-for-production")
            }
        };
        if val.is_empty() && environment != "development" {
            return Err(format!("{name} must not be empty in {environment} environment").into());
        }
        Ok(val)
    }

    pub fn from_env() -> Result<Self, BoxError> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());
        let database_url = std::env::var("DATABASE_URL").ok().filter(|s| !s.is_empty());
        if database_url.is_none() && environment != "development" {
            return Err(format!("DATABASE_URL must be set in {environment} environment").into());
        }

        Ok(Self {
            database_url,
            port: std::env::var("PORT").ok().and_then(|p| p.parse().ok()).unwrap_or(8083),
            jwt_secret: Self::require_secret("JWT_SECRET", &environment)?,
            payment_api_base: std::env::var("PAYMENT_API_BASE")
                .unwrap_or_else(|_| "https://api.razorpay.com".into()),
            payment_key_id: Self::require_secret("PAYMENT_KEY_ID", &environment)?,
            payment_key_secret: Self::require_secret("PAYMENT_KEY_SECRET", &environment)?,
            currency: std::env::var("PAYMENT_CURRENCY").unwrap_or_else(|_| "INR".into()),
            tx_timeout: Duration::from_millis(
                std::env::var("ORDER_TX_TIMEOUT_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(5000),
            ),
            nats_url: std::env::var("NATS_URL").ok().filter(|s| !s.is_empty()),
            environment,
        })
    }

    pub fn order_settings(&self) -> OrderSettings {
        OrderSettings { currency: self.currency.clone(), tx_timeout: self.tx_timeout }
    }
}
