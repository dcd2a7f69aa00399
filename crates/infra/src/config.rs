//! Service configuration read from environment variables.

use std::net::SocketAddr;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} is not valid: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("DATABASE_URL must be set when USE_PERSISTENT_STORES=true")]
    MissingDatabaseUrl,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub use_persistent_stores: bool,
    pub database_url: Option<String>,
    /// Buffer size of the SSE broadcast channel.
    pub realtime_channel_capacity: usize,
    /// Due date offset for invoices issued without an explicit due date.
    pub invoice_payment_terms_days: i64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            use_persistent_stores: false,
            database_url: None,
            realtime_channel_capacity: 256,
            invoice_payment_terms_days: 30,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source. Unset or blank variables take defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let bind_addr = match get("BIND_ADDR") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                    name: "BIND_ADDR",
                    reason: e.to_string(),
                })?,
            None => defaults.bind_addr,
        };

        let use_persistent_stores = match get("USE_PERSISTENT_STORES") {
            Some(raw) => parse_flag("USE_PERSISTENT_STORES", &raw)?,
            None => defaults.use_persistent_stores,
        };

        let database_url = get("DATABASE_URL");
        if use_persistent_stores && database_url.is_none() {
            return Err(ConfigError::MissingDatabaseUrl);
        }

        let realtime_channel_capacity = match get("REALTIME_CHANNEL_CAPACITY") {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(0) | Err(_) => {
                    return Err(ConfigError::Invalid {
                        name: "REALTIME_CHANNEL_CAPACITY",
                        reason: format!("expected a positive integer, got {raw:?}"),
                    });
                }
                Ok(n) => n,
            },
            None => defaults.realtime_channel_capacity,
        };

        let invoice_payment_terms_days = match get("INVOICE_PAYMENT_TERMS_DAYS") {
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(days) if (0..=365).contains(&days) => days,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "INVOICE_PAYMENT_TERMS_DAYS",
                        reason: format!("expected 0..=365, got {raw:?}"),
                    });
                }
            },
            None => defaults.invoice_payment_terms_days,
        };

        Ok(Self {
            bind_addr,
            use_persistent_stores,
            database_url,
            realtime_channel_capacity,
            invoice_payment_terms_days,
        })
    }
}

fn parse_flag(name: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::Invalid {
            name,
            reason: format!("expected a boolean, got {other:?}"),
        }),
    }
}
