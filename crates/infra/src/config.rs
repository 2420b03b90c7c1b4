//! Process configuration, read from environment variables.
//!
//! | variable                        | default               |
//! |---------------------------------|-----------------------|
//! | `STOCK_SERVICE_URL`             | required              |
//! | `RESERVATION_STOCK_SERVICE_URL` | `STOCK_SERVICE_URL`   |
//! | `STOCK_REQUEST_TIMEOUT_MS`      | none                  |
//! | `STOCK_SERVICE_UTC_OFFSET`      | process local zone    |
//! | `DATABASE_URL`                  | none (in-memory store)|
//! | `DATABASE_MAX_CONNECTIONS`      | 5                     |
//! | `STOCK_LOCK`                    | `in_process`          |
//! | `LOG_FORMAT`                    | `json`                |

use std::str::FromStr;
use std::time::Duration;

use chrono::FixedOffset;
use ordergate_stock::ServiceZone;
use reqwest::Url;
use thiserror::Error;

pub use ordergate_observability::LogFormat;

pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value '{value}': {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(name: &'static str, value: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            name,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// How the read-then-decrement sequence is serialised.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StockLockKind {
    #[default]
    InProcess,
    None,
}

impl FromStr for StockLockKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "in_process" | "in-process" => Ok(Self::InProcess),
            "none" | "off" => Ok(Self::None),
            _ => Err("expected 'in_process' or 'none'".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub stock_service_url: String,
    pub reservation_stock_service_url: String,
    pub stock_request_timeout: Option<Duration>,
    /// Zone of the stock service's zone-less `reservedAt` values.
    pub stock_service_zone: ServiceZone,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub stock_lock: StockLockKind,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let stock_service_url =
            get("STOCK_SERVICE_URL").ok_or(ConfigError::Missing("STOCK_SERVICE_URL"))?;
        validate_url("STOCK_SERVICE_URL", &stock_service_url)?;

        let reservation_stock_service_url = match get("RESERVATION_STOCK_SERVICE_URL") {
            Some(url) => {
                validate_url("RESERVATION_STOCK_SERVICE_URL", &url)?;
                url
            }
            None => stock_service_url.clone(),
        };

        let stock_request_timeout = get("STOCK_REQUEST_TIMEOUT_MS")
            .map(|raw| parse_number::<u64>("STOCK_REQUEST_TIMEOUT_MS", &raw))
            .transpose()?
            .map(Duration::from_millis);

        let stock_service_zone = match get("STOCK_SERVICE_UTC_OFFSET") {
            Some(raw) => raw
                .trim()
                .parse::<FixedOffset>()
                .map(ServiceZone::Fixed)
                .map_err(|e| ConfigError::invalid("STOCK_SERVICE_UTC_OFFSET", &raw, e.to_string()))?,
            None => ServiceZone::Local,
        };

        let database_max_connections = match get("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => {
                let n = parse_number::<u32>("DATABASE_MAX_CONNECTIONS", &raw)?;
                if n == 0 {
                    return Err(ConfigError::invalid(
                        "DATABASE_MAX_CONNECTIONS",
                        &raw,
                        "must be at least 1",
                    ));
                }
                n
            }
            None => DEFAULT_MAX_CONNECTIONS,
        };

        let stock_lock = parse_choice("STOCK_LOCK", get("STOCK_LOCK"))?;
        let log_format = parse_choice("LOG_FORMAT", get("LOG_FORMAT"))?;

        Ok(Self {
            stock_service_url,
            reservation_stock_service_url,
            stock_request_timeout,
            stock_service_zone,
            database_url: get("DATABASE_URL"),
            database_max_connections,
            stock_lock,
            log_format,
        })
    }
}

fn validate_url(name: &'static str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value.trim()).map_err(|e| ConfigError::invalid(name, value, e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::invalid(name, value, "expected an http(s) URL"));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(ConfigError::invalid(name, value, "URL has no host"));
    }
    Ok(())
}

fn parse_number<T>(name: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::invalid(name, raw, e.to_string()))
}

fn parse_choice<T>(name: &'static str, raw: Option<String>) -> Result<T, ConfigError>
where
    T: FromStr<Err = String> + Default,
{
    match raw {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|reason| ConfigError::invalid(name, &raw, reason)),
        None => Ok(T::default()),
    }
}
