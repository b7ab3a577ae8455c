use crate::listing::DEFAULT_PAGE_SIZE;
use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub api_prefix: String,
    pub log_dir: String,

    pub listing_page_size: usize,
    pub tax_lookup_timeout_secs: u64,

    // Rate limiting
    pub rate_submit_per_min: u32,
    pub rate_admin_per_min: u32,
    pub rate_tax_per_min: u32,
    pub rate_protected_per_min: u32,
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{} must be set", key))
}

fn or_default<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("{} has an invalid value: {}", key, raw)),
        Err(_) => Ok(default),
    }
}

impl Config {
    /// Reads the process environment; `.env` is loaded by `main` beforehand.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),
            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),

            listing_page_size: or_default("LISTING_PAGE_SIZE", DEFAULT_PAGE_SIZE)?,
            tax_lookup_timeout_secs: or_default("TAX_LOOKUP_TIMEOUT_SECS", 20)?,

            rate_submit_per_min: or_default("RATE_SUBMIT_PER_MIN", 30)?,
            rate_admin_per_min: or_default("RATE_ADMIN_PER_MIN", 30)?,
            rate_tax_per_min: or_default("RATE_TAX_PER_MIN", 10)?,
            rate_protected_per_min: or_default("RATE_PROTECTED_PER_MIN", 1000)?,
        })
    }
}
