//! Server configuration.
//!
//! Every knob is an environment variable with a CLI flag override, parsed
//! through clap. Validation runs once at startup; a bad value is a fatal
//! configuration error, never a runtime surprise.

use std::time::Duration;

use clap::Parser;
use thiserror::Error;

#[derive(Parser, Debug, Clone)]
#[clap(name = "collab-relay")]
#[clap(about = "Real-time collaboration relay for the web IDE", long_about = None)]
pub struct Settings {
    /// Port to listen on
    #[clap(long, env = "PORT", default_value_t = 1234)]
    pub port: u16,

    /// Host to bind to
    #[clap(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Deployment environment name
    #[clap(long, env = "NODE_ENV", default_value = "development")]
    pub environment: String,

    /// Maximum concurrent clients per room
    #[clap(long, env = "MAX_CLIENTS_PER_ROOM", default_value_t = 50)]
    pub max_clients_per_room: usize,

    /// Maximum concurrent connections per IP per room
    #[clap(long, env = "MAX_CONNECTIONS_PER_IP_PER_ROOM", default_value_t = 10)]
    pub max_connections_per_ip_per_room: u32,

    /// Heartbeat ping interval in milliseconds
    #[clap(long, env = "WEBSOCKET_PING_INTERVAL", default_value_t = 30_000)]
    pub ping_interval_ms: u64,

    /// Cleanup interval in milliseconds (informational, logged at startup;
    /// the reap cadence itself is fixed)
    #[clap(long, env = "CLEANUP_INTERVAL", default_value_t = 300_000)]
    pub cleanup_interval_ms: u64,

    /// Grace period before an empty code-editor room is destroyed, in
    /// milliseconds
    #[clap(long, env = "GRACE_PERIOD_MS", default_value_t = 120_000)]
    pub grace_period_ms: u64,

    /// Active-client count that triggers the emergency drain
    #[clap(long, env = "ANOMALY_THRESHOLD", default_value_t = 100)]
    pub anomaly_threshold: usize,

    /// Base URL of the persistence API
    #[clap(long, env = "API_BASE_URL", default_value = "http://localhost:3000/api")]
    pub api_base_url: String,

    /// Log level (error, warn, info, debug)
    #[clap(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Enable code-editor document replication and the save endpoint
    #[clap(
        long,
        env = "ENABLE_CODE_EDITOR_FEATURES",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    pub enable_code_editor_features: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("PORT must be between 1 and 65535")]
    InvalidPort,
    #[error("MAX_CLIENTS_PER_ROOM must be at least 1")]
    InvalidMaxClients,
    #[error("WEBSOCKET_PING_INTERVAL must be at least 1000 ms")]
    InvalidPingInterval,
    #[error("GRACE_PERIOD_MS must be at least 5000 ms")]
    InvalidGracePeriod,
    #[error("LOG_LEVEL must be one of error, warn, info, debug")]
    InvalidLogLevel,
    #[error("API_BASE_URL is not a valid URL: {0}")]
    InvalidApiBaseUrl(String),
}

impl Settings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidPort);
        }
        if self.max_clients_per_room < 1 {
            return Err(ConfigError::InvalidMaxClients);
        }
        if self.ping_interval_ms < 1000 {
            return Err(ConfigError::InvalidPingInterval);
        }
        if self.grace_period_ms < 5000 {
            return Err(ConfigError::InvalidGracePeriod);
        }
        if !matches!(self.log_level.as_str(), "error" | "warn" | "info" | "debug") {
            return Err(ConfigError::InvalidLogLevel);
        }
        // The save path is only reachable with code-editor features on, so
        // the URL only has to parse in that case.
        if self.enable_code_editor_features {
            reqwest::Url::parse(&self.api_base_url)
                .map_err(|e| ConfigError::InvalidApiBaseUrl(e.to_string()))?;
        }
        Ok(())
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_millis(self.ping_interval_ms)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> Settings {
        Settings::parse_from(["collab-relay"])
    }

    #[test]
    fn test_defaults_are_valid() {
        let settings = defaults();
        assert_eq!(settings.port, 1234);
        assert_eq!(settings.max_clients_per_room, 50);
        assert_eq!(settings.max_connections_per_ip_per_room, 10);
        assert_eq!(settings.ping_interval_ms, 30_000);
        assert_eq!(settings.grace_period_ms, 120_000);
        assert!(settings.enable_code_editor_features);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_port_zero_is_rejected() {
        let settings = Settings::parse_from(["collab-relay", "--port", "0"]);
        assert_eq!(settings.validate(), Err(ConfigError::InvalidPort));
    }

    #[test]
    fn test_zero_room_capacity_is_rejected() {
        let settings = Settings::parse_from(["collab-relay", "--max-clients-per-room", "0"]);
        assert_eq!(settings.validate(), Err(ConfigError::InvalidMaxClients));
    }

    #[test]
    fn test_sub_second_ping_interval_is_rejected() {
        let settings = Settings::parse_from(["collab-relay", "--ping-interval-ms", "999"]);
        assert_eq!(settings.validate(), Err(ConfigError::InvalidPingInterval));
    }

    #[test]
    fn test_short_grace_period_is_rejected() {
        let settings = Settings::parse_from(["collab-relay", "--grace-period-ms", "4999"]);
        assert_eq!(settings.validate(), Err(ConfigError::InvalidGracePeriod));
    }

    #[test]
    fn test_unknown_log_level_is_rejected() {
        let settings = Settings::parse_from(["collab-relay", "--log-level", "verbose"]);
        assert_eq!(settings.validate(), Err(ConfigError::InvalidLogLevel));
    }

    #[test]
    fn test_bad_api_url_only_matters_with_code_editor_features() {
        let mut settings = Settings::parse_from(["collab-relay", "--api-base-url", "not a url"]);
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::InvalidApiBaseUrl(_))
        ));

        settings.enable_code_editor_features = false;
        assert!(settings.validate().is_ok());
    }
}
