//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! - `CRM_HOST` - Bind address (default: 127.0.0.1)
//! - `CRM_PORT` - Listen port (default: 8000)
//! - `CRM_LOG_JSON` - Emit JSON log lines (default: false)
//! - `CRM_QUERY_DEPTH_LIMIT` - Maximum GraphQL query depth (default: 16)
//! - `RUST_LOG` - Log filter, read by the tracing subscriber

use std::net::{IpAddr, SocketAddr};

use thiserror::Error;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// JSON log output instead of human readable text
    pub log_json: bool,
    /// Maximum nesting depth accepted for a GraphQL document
    pub query_depth_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 8000,
            log_json: false,
            query_depth_limit: 16,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            host: parse_or("CRM_HOST", &lookup, defaults.host)?,
            port: parse_or("CRM_PORT", &lookup, defaults.port)?,
            log_json: parse_or("CRM_LOG_JSON", &lookup, defaults.log_json)?,
            query_depth_limit: parse_or(
                "CRM_QUERY_DEPTH_LIMIT",
                &lookup,
                defaults.query_depth_limit,
            )?,
        })
    }

    /// Returns the socket address for binding the server.
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parse_or<T>(
    key: &str,
    lookup: &impl Fn(&str) -> Option<String>,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:8000");
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("CRM_HOST", "0.0.0.0"),
            ("CRM_PORT", "9090"),
            ("CRM_LOG_JSON", "true"),
            ("CRM_QUERY_DEPTH_LIMIT", "8"),
        ]))
        .unwrap();
        assert_eq!(config.socket_addr().to_string(), "0.0.0.0:9090");
        assert!(config.log_json);
        assert_eq!(config.query_depth_limit, 8);
    }

    #[test]
    fn test_invalid_port() {
        let err = Config::from_lookup(lookup(&[("CRM_PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref key, _) if key == "CRM_PORT"));
    }
}
