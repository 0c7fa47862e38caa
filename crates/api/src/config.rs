//! Process configuration read from environment variables.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use stockroom_infra::AdjusterConfig;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a socket address, got '{value}'")]
    InvalidAddr { var: &'static str, value: String },

    /// Not a usable integer. Timeouts must also be non-zero.
    #[error("invalid value for {var}: '{value}'")]
    InvalidNumber { var: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// Postgres connection string; `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    /// Requests running longer than this are answered with 503.
    pub request_timeout: Duration,
    pub adjuster: AdjusterConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build the config from any variable source (the process env in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let bind_addr: SocketAddr = match get("STOCKROOM_BIND_ADDR") {
            Some(value) => value.trim().parse().map_err(|_| ConfigError::InvalidAddr {
                var: "STOCKROOM_BIND_ADDR",
                value,
            })?,
            None => DEFAULT_BIND_ADDR
                .parse()
                .map_err(|_| ConfigError::InvalidAddr {
                    var: "STOCKROOM_BIND_ADDR",
                    value: DEFAULT_BIND_ADDR.to_string(),
                })?,
        };

        let jwt_secret = get("JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            DEV_JWT_SECRET.to_string()
        });

        let defaults = AdjusterConfig::default();
        let number = |var: &'static str| -> Result<Option<u64>, ConfigError> {
            get(var)
                .map(|value| {
                    value
                        .trim()
                        .parse::<u64>()
                        .map_err(|_| ConfigError::InvalidNumber { var, value })
                })
                .transpose()
        };
        let timeout = |var: &'static str| -> Result<Option<Duration>, ConfigError> {
            match number(var)? {
                Some(0) => Err(ConfigError::InvalidNumber {
                    var,
                    value: "0".to_string(),
                }),
                ms => Ok(ms.map(Duration::from_millis)),
            }
        };

        let adjuster = AdjusterConfig {
            write_timeout: timeout("STOCKROOM_WRITE_TIMEOUT_MS")?.unwrap_or(defaults.write_timeout),
            record_retries: match number("STOCKROOM_RECORD_RETRIES")? {
                Some(n) => u32::try_from(n).map_err(|_| ConfigError::InvalidNumber {
                    var: "STOCKROOM_RECORD_RETRIES",
                    value: n.to_string(),
                })?,
                None => defaults.record_retries,
            },
            retry_backoff: number("STOCKROOM_RETRY_BACKOFF_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_backoff),
        };

        Ok(Self {
            bind_addr,
            database_url: get("DATABASE_URL"),
            jwt_secret,
            request_timeout: timeout("STOCKROOM_REQUEST_TIMEOUT_MS")?
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT),
            adjuster,
        })
    }
}
