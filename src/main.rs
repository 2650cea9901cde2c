//! servicekeeper
//!
//! Announces a named service on the local network, accepts TCP
//! connections on it, and shuts down cleanly on SIGINT/SIGTERM.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────────┐
//!                 │                   servicekeeper                       │
//!                 │                                                       │
//!   Client ───────┼─▶ net::listener ──▶ service::runner ──┬─▶ handler     │
//!                 │   (bind/fallback,   (accept loop,     │   (own task)  │
//!                 │    poll timeout)     stop flag)       │               │
//!                 │                                       └─▶ dispatch    │
//!                 │                                           (observers, │
//!                 │                                            own tasks) │
//!                 │                                                       │
//!                 │   discovery (identity, announcement)                  │
//!                 │   lifecycle (shutdown signal)  observability (logs)   │
//!                 └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use servicekeeper::config::{self, AppConfig, ConfigError};
use servicekeeper::lifecycle::{signals, startup, Shutdown};
use servicekeeper::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "servicekeeper")]
#[command(about = "Announce a service and accept connections until told to stop", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Service name to announce.
    #[arg(short, long)]
    name: Option<String>,

    /// Require clients to authenticate with this password.
    #[arg(short, long)]
    password: Option<String>,

    /// Requested TCP port (an OS-assigned port is used if busy).
    #[arg(long)]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn apply(self, mut config: AppConfig) -> AppConfig {
        if let Some(name) = self.name {
            config.service.name = name;
        }
        if let Some(password) = self.password {
            config.service.credential = Some(password);
        }
        if let Some(port) = self.port {
            config.service.port = port;
        }
        if let Some(level) = self.log_level {
            config.observability.log_level = level;
        }
        config
    }

    /// File (or defaults), then CLI overrides, then one validation pass.
    fn into_config(self) -> Result<AppConfig, ConfigError> {
        let base = match &self.config {
            Some(path) => config::read_config(path)?,
            None => AppConfig::default(),
        };
        let config = self.apply(base);
        config::validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Cli::parse().into_config()?;

    logging::init_logging(&config.observability);

    tracing::info!("servicekeeper v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        name = %config.service.name,
        port = config.service.port,
        auth_required = config.service.auth_required(),
        poll_timeout_ms = config.service.poll_timeout_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(shutdown.clone());

    startup::run(config, shutdown).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn cli_overrides_fix_invalid_file_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[service]\nname = \"\"\nport = 5100\n").unwrap();
        let path = file.path().to_str().unwrap();

        let config = Cli::parse_from(["servicekeeper", "--config", path, "--name", "Den"])
            .into_config()
            .unwrap();
        assert_eq!(config.service.name, "Den");
        assert_eq!(config.service.port, 5100);
    }

    #[test]
    fn invalid_file_values_without_override_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[service]\nname = \"\"\n").unwrap();
        let path = file.path().to_str().unwrap();

        let err = Cli::parse_from(["servicekeeper", "--config", path])
            .into_config()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref errors) if errors.len() == 1));
    }

    #[test]
    fn password_switches_auth_mode() {
        let config = Cli::parse_from(["servicekeeper", "--password", "hunter2", "--port", "0"])
            .into_config()
            .unwrap();
        assert!(config.service.auth_required());
        assert_eq!(config.service.port, 0);
    }
}
