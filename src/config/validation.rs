//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts, pool sizes, addresses)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is a pure function over the parsed config
//! - Runs before config is accepted into the system

use std::net::{IpAddr, SocketAddr};

use tokio::sync::Semaphore;

use crate::config::schema::{AppConfig, ObservabilityConfig, ServiceConfig};

/// Longest name that fits in a single DNS label.
const MAX_NAME_LEN: usize = 63;

/// Longest permitted accept wait.
const MAX_POLL_TIMEOUT_MS: u64 = 60_000;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    /// What is wrong with it.
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Validate the full application configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = service_errors(&config.service);
    errors.extend(observability_errors(&config.observability));

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate only the service section.
pub fn validate_service(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let errors = service_errors(config);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn service_errors(config: &ServiceConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.name.trim().is_empty() {
        errors.push(ValidationError::new("service.name", "must not be empty"));
    } else if config.name.len() > MAX_NAME_LEN {
        errors.push(ValidationError::new(
            "service.name",
            format!("must be at most {} bytes", MAX_NAME_LEN),
        ));
    }

    if matches!(config.credential.as_deref(), Some("")) {
        errors.push(ValidationError::new(
            "service.credential",
            "must not be empty; omit it to disable authentication",
        ));
    }

    if config.poll_timeout_ms == 0 || config.poll_timeout_ms > MAX_POLL_TIMEOUT_MS {
        errors.push(ValidationError::new(
            "service.poll_timeout_ms",
            format!("must be between 1 and {}", MAX_POLL_TIMEOUT_MS),
        ));
    }

    if config.bind_host.parse::<IpAddr>().is_err() {
        errors.push(ValidationError::new(
            "service.bind_host",
            format!("'{}' is not an IP address", config.bind_host),
        ));
    }

    let pools = [
        ("service.dispatch.max_concurrent_handlers", config.dispatch.max_concurrent_handlers),
        ("service.dispatch.max_concurrent_observers", config.dispatch.max_concurrent_observers),
    ];
    for (field, size) in pools {
        if size == 0 || size > Semaphore::MAX_PERMITS {
            errors.push(ValidationError::new(
                field,
                format!("must be between 1 and {}", Semaphore::MAX_PERMITS),
            ));
        }
    }

    errors
}

fn observability_errors(config: &ObservabilityConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if !LOG_LEVELS.contains(&config.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level '{}'", config.log_level),
        ));
    }

    if config.metrics_enabled && config.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.metrics_address),
        ));
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn reports_every_problem() {
        let mut config = AppConfig::default();
        config.service.name = String::new();
        config.service.credential = Some(String::new());
        config.service.poll_timeout_ms = 0;
        config.service.bind_host = "not-an-ip".into();
        config.service.dispatch.max_concurrent_handlers = 0;
        config.service.dispatch.max_concurrent_observers = 0;
        config.observability.log_level = "loud".into();
        config.observability.metrics_enabled = true;
        config.observability.metrics_address = "nowhere".into();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "service.name",
                "service.credential",
                "service.poll_timeout_ms",
                "service.bind_host",
                "service.dispatch.max_concurrent_handlers",
                "service.dispatch.max_concurrent_observers",
                "observability.log_level",
                "observability.metrics_address",
            ]
        );
    }

    #[test]
    fn overlong_name_rejected() {
        let config = ServiceConfig::new("x".repeat(64));
        let errors = validate_service(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "service.name");
    }

    #[test]
    fn metrics_address_ignored_when_disabled() {
        let mut config = AppConfig::default();
        config.observability.metrics_address = "nowhere".into();
        assert!(validate_config(&config).is_ok());
    }
}
