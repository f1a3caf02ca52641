//! Runtime configuration, read from `KEYSHOP_*` environment variables.
//!
//! A `.env` file in the working directory is loaded first if present.
//! Missing variables take their defaults; malformed ones are an error.

use crate::fulfillment::RetryPolicy;
use crate::model::OperatorId;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} has invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub max_connections: u32,
    pub busy_timeout: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("keyshop.db"),
            max_connections: 5,
            busy_timeout: Duration::from_millis(5000),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub operators: Vec<OperatorId>,
    pub retry: RetryPolicy,
    pub session_ttl: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            operators: Vec::new(),
            retry: RetryPolicy::default(),
            session_ttl: Duration::from_secs(900),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a config from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Config::default();
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let database = DatabaseConfig {
            path: get("KEYSHOP_DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database.path),
            max_connections: non_zero(
                "KEYSHOP_DB_MAX_CONNECTIONS",
                parse_or(
                    "KEYSHOP_DB_MAX_CONNECTIONS",
                    get("KEYSHOP_DB_MAX_CONNECTIONS"),
                    defaults.database.max_connections,
                )?,
                "the pool needs at least one connection",
            )?,
            busy_timeout: Duration::from_millis(parse_or(
                "KEYSHOP_DB_BUSY_TIMEOUT_MS",
                get("KEYSHOP_DB_BUSY_TIMEOUT_MS"),
                defaults.database.busy_timeout.as_millis() as u64,
            )?),
        };

        let operators = match get("KEYSHOP_OPERATOR_IDS") {
            Some(raw) => parse_operators(&raw)?,
            None => defaults.operators,
        };

        let max_attempts = non_zero(
            "KEYSHOP_RETRY_MAX_ATTEMPTS",
            parse_or(
                "KEYSHOP_RETRY_MAX_ATTEMPTS",
                get("KEYSHOP_RETRY_MAX_ATTEMPTS"),
                defaults.retry.max_attempts,
            )?,
            "at least one attempt is required",
        )?;
        let retry = RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(parse_or(
                "KEYSHOP_RETRY_BASE_DELAY_MS",
                get("KEYSHOP_RETRY_BASE_DELAY_MS"),
                defaults.retry.base_delay.as_millis() as u64,
            )?),
            max_delay: Duration::from_millis(parse_or(
                "KEYSHOP_RETRY_MAX_DELAY_MS",
                get("KEYSHOP_RETRY_MAX_DELAY_MS"),
                defaults.retry.max_delay.as_millis() as u64,
            )?),
        };

        let session_ttl = Duration::from_secs(non_zero(
            "KEYSHOP_SESSION_TTL_SECS",
            parse_or(
                "KEYSHOP_SESSION_TTL_SECS",
                get("KEYSHOP_SESSION_TTL_SECS"),
                defaults.session_ttl.as_secs(),
            )?,
            "sessions would expire immediately",
        )?);

        Ok(Self {
            database,
            operators,
            retry,
            session_ttl,
        })
    }
}

fn parse_or<T>(name: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
            value,
        }),
    }
}

fn non_zero<T>(name: &'static str, value: T, reason: &str) -> Result<T, ConfigError>
where
    T: Default + PartialEq + std::fmt::Display,
{
    if value == T::default() {
        return Err(ConfigError::Invalid {
            name,
            value: value.to_string(),
            reason: reason.to_string(),
        });
    }
    Ok(value)
}

fn parse_operators(raw: &str) -> Result<Vec<OperatorId>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<i64>()
                .map(OperatorId)
                .map_err(|e| ConfigError::Invalid {
                    name: "KEYSHOP_OPERATOR_IDS",
                    value: part.to_string(),
                    reason: e.to_string(),
                })
        })
        .collect()
}
