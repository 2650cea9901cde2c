//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Port requested when none is configured.
pub const DEFAULT_PORT: u16 = 5000;

/// Root configuration for the service binary.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listening endpoint, announcement and dispatch settings.
    pub service: ServiceConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,
}

/// Service configuration.
///
/// The presence of `credential` decides whether the service is announced as
/// requiring authentication and whether handlers receive a credential.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServiceConfig {
    /// Name advertised on the local network.
    pub name: String,

    /// Optional shared secret clients must present.
    pub credential: Option<String>,

    /// Requested TCP port. Only a request: an OS-assigned port is used if busy.
    pub port: u16,

    /// Address to bind (e.g., "0.0.0.0").
    pub bind_host: String,

    /// Upper bound on a single accept wait, in milliseconds.
    /// This is also the worst-case latency of `stop()`.
    pub poll_timeout_ms: u64,

    /// Per-connection work pool settings.
    pub dispatch: DispatchConfig,
}

impl ServiceConfig {
    /// Create a config with the given name and defaults for everything else.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the credential, switching the service into authenticated mode.
    pub fn with_credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = Some(credential.into());
        self
    }

    /// Set the requested port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Whether clients must authenticate.
    pub fn auth_required(&self) -> bool {
        self.credential.is_some()
    }

    /// Poll timeout as a `Duration`.
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "servicekeeper".to_string(),
            credential: None,
            port: DEFAULT_PORT,
            bind_host: "0.0.0.0".to_string(),
            poll_timeout_ms: 1000,
            dispatch: DispatchConfig::default(),
        }
    }
}

/// Work pool sizes for handler and observer tasks.
///
/// Handlers and observers get separate pools, so long-lived handlers
/// cannot hold back observer notifications.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct DispatchConfig {
    /// Maximum handler tasks running at once. A handler holds its slot for
    /// the life of its connection; extra connections queue.
    pub max_concurrent_handlers: usize,

    /// Maximum observer notifications running at once. Extra ones queue.
    pub max_concurrent_observers: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent_handlers: 1024,
            max_concurrent_observers: 256,
        }
    }
}

/// Log output style.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Full,
    Compact,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log line layout.
    pub log_format: LogFormat,

    /// Enable Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Full,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = ServiceConfig::default();
        assert_eq!(config.port, 5000);
        assert_eq!(config.poll_timeout(), Duration::from_secs(1));
        assert!(config.credential.is_none());
        assert!(!config.auth_required());
    }

    #[test]
    fn credential_switches_auth_mode() {
        let config = ServiceConfig::new("Kitchen").with_credential("hunter2");
        assert!(config.auth_required());
        assert_eq!(config.name, "Kitchen");
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [service]
            name = "Living Room"
            port = 7000

            [observability]
            log_format = "compact"
            "#,
        )
        .unwrap();

        assert_eq!(config.service.name, "Living Room");
        assert_eq!(config.service.port, 7000);
        assert_eq!(config.service.bind_host, "0.0.0.0");
        assert_eq!(config.service.dispatch.max_concurrent_handlers, 1024);
        assert_eq!(config.service.dispatch.max_concurrent_observers, 256);
        assert_eq!(config.observability.log_format, LogFormat::Compact);
        assert_eq!(config.observability.log_level, "info");
    }
}
