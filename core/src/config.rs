//! Client configuration sourced from the environment.

use std::time::Duration;

use url::Url;

use crate::error::ConfigError;

pub const BASE_URL_VAR: &str = "ORDER_API_URL";
pub const TIMEOUT_VAR: &str = "ORDER_API_TIMEOUT_MS";

pub const DEFAULT_BASE_URL: &str = "http://localhost:8088/api";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ClientConfig {
    /// Read `ORDER_API_URL` and `ORDER_API_TIMEOUT_MS`, loading a `.env` file
    /// first if one exists. Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(BASE_URL_VAR) {
            let url = Url::parse(&value).map_err(|e| ConfigError::InvalidBaseUrl {
                value: value.clone(),
                reason: e.to_string(),
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(ConfigError::InvalidBaseUrl {
                    reason: format!("unsupported scheme `{}`", url.scheme()),
                    value,
                });
            }
            config.base_url = value;
        }

        if let Some(value) = lookup(TIMEOUT_VAR) {
            let millis = value
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|millis| *millis > 0)
                .ok_or_else(|| ConfigError::InvalidTimeout(value.clone()))?;
            config.timeout = Duration::from_millis(millis);
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.base_url, "http://localhost:8088/api");
    }

    #[test]
    fn reads_base_url_and_timeout() {
        let config = ClientConfig::from_lookup(lookup(&[
            (BASE_URL_VAR, "https://orders.example.com/api"),
            (TIMEOUT_VAR, "2500"),
        ]))
        .unwrap();
        assert_eq!(config.base_url, "https://orders.example.com/api");
        assert_eq!(config.timeout, Duration::from_millis(2500));
    }

    #[test]
    fn rejects_relative_base_url() {
        let err = ClientConfig::from_lookup(lookup(&[(BASE_URL_VAR, "/api")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBaseUrl { .. }));
    }

    #[test]
    fn rejects_non_http_schemes() {
        let err = ClientConfig::from_lookup(lookup(&[(BASE_URL_VAR, "ftp://orders.example.com")]))
            .unwrap_err();
        match err {
            ConfigError::InvalidBaseUrl { reason, .. } => assert!(reason.contains("ftp"), "{reason}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn rejects_zero_and_garbage_timeouts() {
        for value in ["0", "soon", "-5"] {
            let err = ClientConfig::from_lookup(lookup(&[(TIMEOUT_VAR, value)])).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidTimeout(_)), "{value}");
        }
    }
}
