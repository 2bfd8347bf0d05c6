//! Configuration for the HTTP server.

use mediacat_error::ConfigError;
use std::time::Duration;

/// Server configuration resolved at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Socket address to listen on (e.g. "0.0.0.0:8080")
    pub bind_addr: String,
    /// Interval between keepalive pings on the event stream
    pub keepalive: Duration,
}

impl ServerConfig {
    /// Create a new server configuration.
    pub fn new(bind_addr: impl Into<String>) -> Self {
        Self {
            bind_addr: bind_addr.into(),
            keepalive: Duration::from_secs(30),
        }
    }

    /// Create config from environment variables.
    ///
    /// Reads:
    /// - `MEDIACAT_BIND_ADDR` (default: "0.0.0.0:8080")
    /// - `MEDIACAT_KEEPALIVE_SECS` (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind_addr =
            std::env::var("MEDIACAT_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let keepalive = match std::env::var("MEDIACAT_KEEPALIVE_SECS") {
            Ok(raw) => {
                let secs: u64 = raw.parse().map_err(|_| {
                    ConfigError::new(format!("MEDIACAT_KEEPALIVE_SECS is not a number: {}", raw))
                })?;
                Duration::from_secs(secs)
            }
            Err(_) => Duration::from_secs(30),
        };
        Ok(Self {
            bind_addr,
            keepalive,
        })
    }

    /// Set the keepalive interval.
    pub fn with_keepalive(mut self, keepalive: Duration) -> Self {
        self.keepalive = keepalive;
        self
    }
}
