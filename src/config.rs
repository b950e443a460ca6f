use std::{env, time::Duration};

use anyhow::Context;

const DEFAULT_WEBHOOK_TOLERANCE_SECS: i64 = 300;
const DEFAULT_EXTERNAL_TIMEOUT_SECS: u64 = 10;
const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_FROM_ADDRESS: &str = "billetterie@ogticketing.local";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub public_base_url: String,
    pub stripe: StripeConfig,
    pub smtp: Option<SmtpConfig>,
    /// Upper bound for every outbound call (payment profile, ticket mail).
    pub external_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub api_key: String,
    pub api_base: String,
    pub endpoint_secret: String,
    /// Maximum age of a signed webhook timestamp, in seconds.
    pub webhook_tolerance_secs: i64,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub from_address: String,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET is not set")?;
        let public_base_url = env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("http://{host}:{port}"));
        let external_timeout = Duration::from_secs(
            env::var("EXTERNAL_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_EXTERNAL_TIMEOUT_SECS),
        );

        Ok(Self {
            port,
            database_url,
            host,
            jwt_secret,
            public_base_url,
            stripe: StripeConfig::from_env()?,
            smtp: SmtpConfig::from_env(),
            external_timeout,
        })
    }
}

impl StripeConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            api_key: env::var("STRIPE_API_KEY").unwrap_or_default(),
            api_base: env::var("STRIPE_API_BASE")
                .unwrap_or_else(|_| "https://api.stripe.com".to_string()),
            endpoint_secret: env::var("STRIPE_ENDPOINT_SECRET")
                .context("STRIPE_ENDPOINT_SECRET is not set")?,
            webhook_tolerance_secs: env::var("WEBHOOK_TOLERANCE_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_WEBHOOK_TOLERANCE_SECS),
        })
    }
}

impl SmtpConfig {
    /// Returns `None` when `SMTP_HOST` is unset; tickets are then only logged.
    pub fn from_env() -> Option<Self> {
        let host = env::var("SMTP_HOST").ok()?;
        Some(Self {
            host,
            port: env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            from_address: env::var("SMTP_FROM")
                .unwrap_or_else(|_| DEFAULT_FROM_ADDRESS.to_string()),
            user: env::var("SMTP_USER").ok(),
            password: env::var("SMTP_PASSWORD").ok(),
        })
    }
}
