use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result, bail};

use pmot_payments::razorpay::DEFAULT_API_BASE;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

/// Server settings, read from the environment (after `.env` is loaded).
#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub addr: SocketAddr,
    pub token_ttl_minutes: i64,
    pub upload_dir: PathBuf,
    pub premium_amount: i64,
    pub premium_currency: String,
    pub razorpay_key_id: String,
    pub razorpay_key_secret: String,
    pub razorpay_api_base: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let jwt_secret = std::env::var("PMOT_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("PMOT_JWT_SECRET is unset or still a placeholder");
        }

        let host = var_or("PMOT_HOST", "0.0.0.0");
        let port: u16 = parse_var("PMOT_PORT", 8000)?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("invalid bind address {}:{}", host, port))?;

        let token_ttl_minutes: i64 = parse_var("PMOT_TOKEN_TTL_MINUTES", 30)?;
        if token_ttl_minutes <= 0 {
            bail!("PMOT_TOKEN_TTL_MINUTES must be positive");
        }

        let premium_amount: i64 = parse_var("PMOT_PREMIUM_AMOUNT", 49900)?;
        if premium_amount <= 0 {
            bail!("PMOT_PREMIUM_AMOUNT must be positive");
        }

        Ok(Self {
            jwt_secret,
            db_path: var_or("PMOT_DB_PATH", "pmot.db").into(),
            addr,
            token_ttl_minutes,
            upload_dir: var_or("PMOT_UPLOAD_DIR", "./uploads").into(),
            premium_amount,
            premium_currency: var_or("PMOT_PREMIUM_CURRENCY", "INR"),
            razorpay_key_id: required("RAZORPAY_KEY_ID")?,
            razorpay_key_secret: required("RAZORPAY_KEY_SECRET")?,
            razorpay_api_base: var_or("RAZORPAY_API_BASE", DEFAULT_API_BASE),
        })
    }
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.into())
}

fn required(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => bail!("{} must be set", name),
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("{} has invalid value '{}'", name, raw)),
        Err(_) => Ok(default),
    }
}
