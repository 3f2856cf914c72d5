//! Server configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.
//! Reconciliation settings (data API, fetch limits, export) live in the
//! `reconcile.toml` file read by `etal_recon::ReconConfig`.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 8080;

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (default: 0.0.0.0)
    pub bind_addr: String,

    /// HTTP port
    pub port: u16,

    /// Path to `reconcile.toml`; platform config dir when unset
    pub config_path: Option<PathBuf>,

    /// A reconciliation running longer than this is abandoned
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_addr: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            config_path: None,
            request_timeout_secs: 120,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = ServerConfig::default();

        let config = ServerConfig {
            bind_addr: lookup("ETAL_BIND_ADDR").unwrap_or(defaults.bind_addr),

            port: match lookup("ETAL_PORT") {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue("ETAL_PORT".to_string()))?,
                None => defaults.port,
            },

            config_path: lookup("ETAL_CONFIG_PATH")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),

            request_timeout_secs: match lookup("ETAL_REQUEST_TIMEOUT_SECS") {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue("ETAL_REQUEST_TIMEOUT_SECS".to_string()))?,
                None => defaults.request_timeout_secs,
            },
        };

        if config.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "ETAL_REQUEST_TIMEOUT_SECS".to_string(),
            ));
        }

        Ok(config)
    }

    /// Returns the full bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("ETAL_BIND_ADDR", "127.0.0.1"),
            ("ETAL_PORT", "9000"),
            ("ETAL_CONFIG_PATH", "/etc/etal/reconcile.toml"),
            ("ETAL_REQUEST_TIMEOUT_SECS", "15"),
        ]))
        .unwrap();
        assert_eq!(config.bind_address(), "127.0.0.1:9000");
        assert_eq!(config.config_path, Some(PathBuf::from("/etc/etal/reconcile.toml")));
        assert_eq!(config.request_timeout(), Duration::from_secs(15));
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            ServerConfig::from_lookup(lookup(&[("ETAL_PORT", "http")])),
            Err(ConfigError::InvalidValue(key)) if key == "ETAL_PORT"
        ));
        assert!(ServerConfig::from_lookup(lookup(&[("ETAL_REQUEST_TIMEOUT_SECS", "0")])).is_err());
    }
}
