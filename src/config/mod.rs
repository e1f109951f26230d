//! Connection settings for the sensor gateway.
//!
//! Loaded from a JSON file (see [`default_config_path`](crate::consts::default_config_path)).
//! Missing fields fall back to defaults; CLI flags override whatever the file says.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::consts::{DEFAULT_ENDPOINT, DEFAULT_RECONNECT_DELAY, DEFAULT_UPDATE_INTERVAL};
use crate::error::{MonitorError, Result};

/// Bounds accepted for the update interval, in seconds.
const MIN_UPDATE_INTERVAL_SECS: u64 = 1;
const MAX_UPDATE_INTERVAL_SECS: u64 = 60;

/// Shortest reconnect delay accepted. Anything lower spins on a dead endpoint.
const MIN_RECONNECT_DELAY: Duration = Duration::from_millis(100);

/// Everything the update channel needs: where to connect and how long to wait
/// between reconnects. `update_interval` and `auto_connect` are front-end settings.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    pub endpoint: String,
    pub reconnect_delay: Duration,
    pub update_interval: Duration,
    pub auto_connect: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            update_interval: DEFAULT_UPDATE_INTERVAL,
            auto_connect: false,
        }
    }
}

/// On-disk shape. Every field is optional so partial files are fine.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    endpoint: Option<String>,
    reconnect_delay_ms: Option<u64>,
    update_interval_secs: Option<u64>,
    auto_connect: Option<bool>,
}

impl MonitorConfig {
    /// Parse a JSON config document on top of the defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let file: ConfigFile =
            serde_json::from_str(json).map_err(|e| MonitorError::Config(e.to_string()))?;
        let defaults = Self::default();
        let config = Self {
            endpoint: file.endpoint.unwrap_or(defaults.endpoint),
            reconnect_delay: file
                .reconnect_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.reconnect_delay),
            update_interval: file
                .update_interval_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.update_interval),
            auto_connect: file.auto_connect.unwrap_or(defaults.auto_connect),
        };
        config.validate()?;
        Ok(config)
    }

    /// Load from a file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(json) => Self::from_json(&json),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Serialize back to the on-disk shape.
    pub fn to_json(&self) -> Result<String> {
        let file = ConfigFile {
            endpoint: Some(self.endpoint.clone()),
            reconnect_delay_ms: Some(self.reconnect_delay.as_millis() as u64),
            update_interval_secs: Some(self.update_interval.as_secs()),
            auto_connect: Some(self.auto_connect),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    /// Reject settings the connection manager cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            return Err(MonitorError::Config("endpoint is required".to_string()));
        }
        if !(self.endpoint.starts_with("ws://") || self.endpoint.starts_with("wss://")) {
            return Err(MonitorError::Config(format!(
                "endpoint must be a ws:// or wss:// URL, got {}",
                self.endpoint
            )));
        }
        if self.reconnect_delay < MIN_RECONNECT_DELAY {
            return Err(MonitorError::Config(format!(
                "reconnect delay must be at least {} ms, got {} ms",
                MIN_RECONNECT_DELAY.as_millis(),
                self.reconnect_delay.as_millis()
            )));
        }
        let secs = self.update_interval.as_secs();
        if !(MIN_UPDATE_INTERVAL_SECS..=MAX_UPDATE_INTERVAL_SECS).contains(&secs) {
            return Err(MonitorError::Config(format!(
                "update interval must be between {MIN_UPDATE_INTERVAL_SECS} and {MAX_UPDATE_INTERVAL_SECS} seconds, got {secs}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_gateway_settings() {
        let config = MonitorConfig::default();
        assert_eq!(config.endpoint, "ws://localhost:8080");
        assert_eq!(config.reconnect_delay, Duration::from_millis(5000));
        assert_eq!(config.update_interval, Duration::from_secs(5));
        assert!(!config.auto_connect);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_object_yields_defaults() {
        let config = MonitorConfig::from_json("{}").unwrap();
        assert_eq!(config, MonitorConfig::default());
    }

    #[test]
    fn partial_file_overrides_only_given_fields() {
        let config =
            MonitorConfig::from_json(r#"{"endpoint": "ws://10.0.0.7:81", "autoConnect": true}"#)
                .unwrap();
        assert_eq!(config.endpoint, "ws://10.0.0.7:81");
        assert!(config.auto_connect);
        assert_eq!(config.reconnect_delay, DEFAULT_RECONNECT_DELAY);
    }

    #[test]
    fn reconnect_delay_in_millis() {
        let config = MonitorConfig::from_json(r#"{"reconnectDelayMs": 250}"#).unwrap();
        assert_eq!(config.reconnect_delay, Duration::from_millis(250));
    }

    #[test]
    fn rejects_zero_reconnect_delay() {
        let err = MonitorConfig::from_json(r#"{"reconnectDelayMs": 0}"#).unwrap_err();
        assert!(err.to_string().contains("reconnect delay"));
        assert!(MonitorConfig::from_json(r#"{"reconnectDelayMs": 99}"#).is_err());
        assert!(MonitorConfig::from_json(r#"{"reconnectDelayMs": 100}"#).is_ok());

        let flagged = MonitorConfig {
            reconnect_delay: Duration::ZERO,
            ..MonitorConfig::default()
        };
        assert!(matches!(flagged.validate(), Err(MonitorError::Config(_))));
    }

    #[test]
    fn rejects_empty_endpoint() {
        let err = MonitorConfig::from_json(r#"{"endpoint": ""}"#).unwrap_err();
        assert!(err.to_string().contains("endpoint is required"));
    }

    #[test]
    fn rejects_http_endpoint() {
        let err = MonitorConfig::from_json(r#"{"endpoint": "http://localhost"}"#).unwrap_err();
        assert!(matches!(err, MonitorError::Config(_)));
    }

    #[test]
    fn rejects_out_of_range_interval() {
        assert!(MonitorConfig::from_json(r#"{"updateIntervalSecs": 0}"#).is_err());
        assert!(MonitorConfig::from_json(r#"{"updateIntervalSecs": 61}"#).is_err());
        assert!(MonitorConfig::from_json(r#"{"updateIntervalSecs": 60}"#).is_ok());
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(
            MonitorConfig::from_json("not json"),
            Err(MonitorError::Config(_))
        ));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = MonitorConfig::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, MonitorConfig::default());
    }

    #[test]
    fn round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = MonitorConfig {
            endpoint: "wss://gateway.local/ws".to_string(),
            reconnect_delay: Duration::from_millis(1500),
            update_interval: Duration::from_secs(10),
            auto_connect: true,
        };
        std::fs::write(&path, config.to_json().unwrap()).unwrap();

        assert_eq!(MonitorConfig::load(&path).unwrap(), config);
    }
}
