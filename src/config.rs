use crate::leave::engine::EngineSettings;
use crate::leave::retry::RetryPolicy;
use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub api_prefix: String,
    pub log_dir: String,

    // Database pool
    pub db_max_connections: u32,
    pub db_acquire_timeout: Duration,

    // Leave ledger
    pub public_base_url: String,
    pub approver_email: Option<String>,
    /// write usable decision links to the log at debug level
    pub notify_log_links: bool,
    pub default_leave_total: u32,
    pub storage_retry_attempts: u32,
    pub storage_retry_backoff: Duration,
    pub employee_cache_ttl: Duration,
    pub seed_leave_types: Vec<String>,

    // Rate limiting
    pub rate_protected_per_min: u32,
    pub rate_decision_link_per_min: u32,
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

fn parsed_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw:?}")),
        Err(_) => Ok(default),
    }
}

/// Comma separated list; blanks dropped.
fn list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),
            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),

            db_max_connections: parsed_or("DB_MAX_CONNECTIONS", 10)?,
            db_acquire_timeout: Duration::from_secs(parsed_or("DB_ACQUIRE_TIMEOUT_SECS", 5)?),

            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            approver_email: env::var("APPROVER_EMAIL").ok().filter(|s| !s.trim().is_empty()),
            notify_log_links: parsed_or("NOTIFY_LOG_LINKS", false)?,
            default_leave_total: parsed_or("DEFAULT_LEAVE_TOTAL", 20)?,
            storage_retry_attempts: parsed_or("STORAGE_RETRY_ATTEMPTS", 3)?,
            storage_retry_backoff: Duration::from_millis(parsed_or("STORAGE_RETRY_BACKOFF_MS", 25)?),
            employee_cache_ttl: Duration::from_secs(parsed_or("EMPLOYEE_CACHE_TTL_SECS", 60)?),
            seed_leave_types: list(&env::var("SEED_LEAVE_TYPES").unwrap_or_default()),

            rate_protected_per_min: parsed_or("RATE_PROTECTED_PER_MIN", 1000)?,
            rate_decision_link_per_min: parsed_or("RATE_DECISION_LINK_PER_MIN", 30)?,
        })
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            default_total: self.default_leave_total,
            retry: RetryPolicy {
                attempts: self.storage_retry_attempts,
                backoff: self.storage_retry_backoff,
            },
        }
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            database_url: "mysql://unused".to_string(),
            jwt_secret: "test-secret".to_string(),
            server_addr: "127.0.0.1:0".to_string(),
            api_prefix: "/api".to_string(),
            log_dir: "logs".to_string(),
            db_max_connections: 1,
            db_acquire_timeout: Duration::from_secs(1),
            public_base_url: "http://localhost:8080".to_string(),
            approver_email: Some("hr@company.com".to_string()),
            notify_log_links: false,
            default_leave_total: 20,
            storage_retry_attempts: 1,
            storage_retry_backoff: Duration::from_millis(1),
            employee_cache_ttl: Duration::from_secs(1),
            seed_leave_types: Vec::new(),
            rate_protected_per_min: 10_000,
            rate_decision_link_per_min: 10_000,
        }
    }
}
