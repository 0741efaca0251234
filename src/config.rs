//! Application configuration, read from the environment (after `.env`).

use std::str::FromStr;

use rust_decimal::Decimal;

/// Environment variable for server port.
pub const PORT_ENV_VAR: &str = "PORT";
/// Environment variable for database URL.
pub const DATABASE_URL_ENV_VAR: &str = "DATABASE_URL";
/// Environment variable for the database pool size.
pub const DATABASE_MAX_CONNECTIONS_ENV_VAR: &str = "DATABASE_MAX_CONNECTIONS";
/// Environment variable for the NATS server URL.
pub const NATS_URL_ENV_VAR: &str = "NATS_URL";
/// Environment variable for the NATS subject prefix.
pub const NATS_SUBJECT_PREFIX_ENV_VAR: &str = "NATS_SUBJECT_PREFIX";
/// Environment variable for the custom print base price used without a database.
pub const CUSTOM_PRINT_BASE_PRICE_ENV_VAR: &str = "CUSTOM_PRINT_BASE_PRICE";
/// Environment variable for the shop currency.
pub const CURRENCY_ENV_VAR: &str = "CURRENCY";

pub const DEFAULT_PORT: u16 = 8083;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_CURRENCY: &str = "SGD";
pub const DEFAULT_SUBJECT_PREFIX: &str = "printshop";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub nats_url: Option<String>,
    pub subject_prefix: String,
    pub custom_print_base_price: Decimal,
    pub currency: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_url: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            nats_url: None,
            subject_prefix: DEFAULT_SUBJECT_PREFIX.to_string(),
            custom_print_base_price: Decimal::ZERO,
            currency: DEFAULT_CURRENCY.to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Builds the config from any variable source; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();
        Ok(Self {
            port: parse(PORT_ENV_VAR, get(PORT_ENV_VAR))?.unwrap_or(defaults.port),
            database_url: get(DATABASE_URL_ENV_VAR),
            max_connections: parse(DATABASE_MAX_CONNECTIONS_ENV_VAR, get(DATABASE_MAX_CONNECTIONS_ENV_VAR))?
                .unwrap_or(defaults.max_connections),
            nats_url: get(NATS_URL_ENV_VAR),
            subject_prefix: get(NATS_SUBJECT_PREFIX_ENV_VAR).unwrap_or(defaults.subject_prefix),
            custom_print_base_price: parse(CUSTOM_PRINT_BASE_PRICE_ENV_VAR, get(CUSTOM_PRINT_BASE_PRICE_ENV_VAR))?
                .unwrap_or(defaults.custom_print_base_price),
            currency: get(CURRENCY_ENV_VAR).map(|c| c.to_uppercase()).unwrap_or(defaults.currency),
        })
    }

    pub fn bind_address(&self) -> String { format!("0.0.0.0:{}", self.port) }
}

fn parse<T: FromStr>(var: &'static str, value: Option<String>) -> Result<Option<T>, ConfigError> {
    value
        .map(|v| v.parse::<T>().map_err(|_| ConfigError::Invalid { var, value: v }))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = from(&[]).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.bind_address(), "0.0.0.0:8083");
    }

    #[test]
    fn test_overrides() {
        let config = from(&[("PORT", "9000"), ("CUSTOM_PRINT_BASE_PRICE", "12.50"), ("CURRENCY", "myr"), ("DATABASE_URL", " ")]).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.custom_print_base_price, Decimal::new(1250, 2));
        assert_eq!(config.currency, "MYR");
        assert_eq!(config.database_url, None);
    }

    #[test]
    fn test_invalid_port() {
        assert!(matches!(from(&[("PORT", "eighty")]), Err(ConfigError::Invalid { var: "PORT", .. })));
    }
}
