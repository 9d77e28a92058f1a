//! Environment-based configuration for the Tempest pipeline
//!
//! Credentials and device identifiers are supplied externally as opaque
//! strings; a missing credential is fatal and never retried.

use std::env;
use thiserror::Error;

const DEFAULT_REST_BASE: &str = "https://swd.weatherflow.com/swd/rest";
const DEFAULT_WS_URL: &str = "wss://ws.weatherflow.com/swd/data";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} environment variable not set")]
    Missing(&'static str),

    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Bearer credential for both the REST and streaming APIs
    pub token: String,

    /// Device identifier for history paging and the live subscription
    pub device_id: String,

    /// Station identifier for time-range history (optional)
    pub station_id: Option<String>,

    pub rest_base: String,
    pub ws_url: String,

    /// Outbound request timeout in seconds (default: 10)
    pub fetch_timeout_secs: u64,

    /// Minimum interval between live deliveries in milliseconds
    /// (default: 60000)
    pub live_throttle_ms: u64,

    /// Fixed reconnect delay in seconds (default: 5)
    pub live_reconnect_secs: u64,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let token = env::var("TEMPEST_TOKEN").map_err(|_| ConfigError::Missing("TEMPEST_TOKEN"))?;
        let device_id =
            env::var("TEMPEST_DEVICE_ID").map_err(|_| ConfigError::Missing("TEMPEST_DEVICE_ID"))?;
        let station_id = env::var("TEMPEST_STATION_ID").ok();

        let rest_base =
            env::var("TEMPEST_REST_BASE").unwrap_or_else(|_| DEFAULT_REST_BASE.to_string());
        let ws_url = env::var("TEMPEST_WS_URL").unwrap_or_else(|_| DEFAULT_WS_URL.to_string());

        Ok(Self {
            token,
            device_id,
            station_id,
            rest_base,
            ws_url,
            fetch_timeout_secs: parse_var("FETCH_TIMEOUT_SECS", 10)?,
            live_throttle_ms: parse_var("LIVE_THROTTLE_MS", 60_000)?,
            live_reconnect_secs: parse_var("LIVE_RECONNECT_SECS", 5)?,
        })
    }
}

fn parse_var(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid(name, value)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Single test: the environment is process-global and these cases
    // would race under the parallel test runner.
    #[test]
    fn test_from_env() {
        env::remove_var("TEMPEST_TOKEN");
        env::remove_var("TEMPEST_DEVICE_ID");
        assert!(matches!(
            AppConfig::from_env(),
            Err(ConfigError::Missing("TEMPEST_TOKEN"))
        ));

        env::set_var("TEMPEST_TOKEN", "secret");
        env::set_var("TEMPEST_DEVICE_ID", "dev-1");

        let config = AppConfig::from_env().unwrap();

        assert_eq!(config.token, "secret");
        assert_eq!(config.device_id, "dev-1");
        assert_eq!(config.rest_base, DEFAULT_REST_BASE);
        assert_eq!(config.ws_url, DEFAULT_WS_URL);
        assert_eq!(config.fetch_timeout_secs, 10);
        assert_eq!(config.live_throttle_ms, 60_000);
        assert_eq!(config.live_reconnect_secs, 5);

        env::remove_var("TEMPEST_TOKEN");
        env::remove_var("TEMPEST_DEVICE_ID");
    }
}
