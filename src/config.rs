// Process configuration, read once from the environment at startup

use std::net::SocketAddr;
use thiserror::Error;

pub const DEFAULT_AIRLINES_URL: &str =
    "https://raw.githubusercontent.com/jpatokal/openflights/master/data/airlines.dat";
pub const DEFAULT_PRICES_URL: &str = "https://api.travelpayouts.com/aviasales/v3/prices_for_dates";
pub const DEFAULT_CURRENCY: &str = "TWD";
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVariable(&'static str),

    #[error("Invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_token: String,
    pub airlines_url: String,
    pub prices_url: String,
    pub currency: String,
    pub timeout_ms: u64,
    pub bind_addr: SocketAddr,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    // Builds the config from an arbitrary variable source; blank values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        // No built-in fallback credential
        let api_token = var("TP_API_TOKEN").ok_or(ConfigError::MissingVariable("TP_API_TOKEN"))?;

        let timeout_ms = match var("HTTP_TIMEOUT_MS") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                name: "HTTP_TIMEOUT_MS",
                value: raw,
            })?,
            None => DEFAULT_TIMEOUT_MS,
        };

        let host = var("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port: u16 = match var("PORT") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                name: "PORT",
                value: raw,
            })?,
            None => 8080,
        };
        let bind_addr = format!("{}:{}", host, port)
            .parse()
            .map_err(|_| ConfigError::InvalidValue {
                name: "HOST",
                value: host.clone(),
            })?;

        Ok(Self {
            api_token,
            airlines_url: var("AIRLINES_URL").unwrap_or_else(|| DEFAULT_AIRLINES_URL.to_string()),
            prices_url: var("PRICES_URL").unwrap_or_else(|| DEFAULT_PRICES_URL.to_string()),
            currency: var("CURRENCY").unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            timeout_ms,
            bind_addr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn test_missing_token_fails_fast() {
        let result = AppConfig::from_lookup(lookup_from(&[("PORT", "3000")]));
        assert_eq!(
            result.unwrap_err(),
            ConfigError::MissingVariable("TP_API_TOKEN")
        );
    }

    #[test]
    fn test_blank_token_is_treated_as_missing() {
        let result = AppConfig::from_lookup(lookup_from(&[("TP_API_TOKEN", "   ")]));
        assert!(matches!(
            result,
            Err(ConfigError::MissingVariable("TP_API_TOKEN"))
        ));
    }

    #[test]
    fn test_defaults_applied() {
        let config = AppConfig::from_lookup(lookup_from(&[("TP_API_TOKEN", "secret")])).unwrap();

        assert_eq!(config.api_token, "secret");
        assert_eq!(config.airlines_url, DEFAULT_AIRLINES_URL);
        assert_eq!(config.prices_url, DEFAULT_PRICES_URL);
        assert_eq!(config.currency, "TWD");
        assert_eq!(config.timeout_ms, DEFAULT_TIMEOUT_MS);
        assert_eq!(config.bind_addr, "0.0.0.0:8080".parse().unwrap());
    }

    #[test]
    fn test_overrides_applied() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("TP_API_TOKEN", "secret"),
            ("CURRENCY", "USD"),
            ("HTTP_TIMEOUT_MS", "2500"),
            ("HOST", "127.0.0.1"),
            ("PORT", "3000"),
            ("PRICES_URL", "http://localhost:9000/prices"),
        ]))
        .unwrap();

        assert_eq!(config.currency, "USD");
        assert_eq!(config.timeout_ms, 2500);
        assert_eq!(config.bind_addr, "127.0.0.1:3000".parse().unwrap());
        assert_eq!(config.prices_url, "http://localhost:9000/prices");
    }

    #[test]
    fn test_invalid_port_rejected() {
        let result =
            AppConfig::from_lookup(lookup_from(&[("TP_API_TOKEN", "secret"), ("PORT", "http")]));
        assert_eq!(
            result.unwrap_err(),
            ConfigError::InvalidValue {
                name: "PORT",
                value: "http".to_string()
            }
        );
    }
}
