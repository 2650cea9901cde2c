//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::AppConfig;
use crate::config::validation::ValidationError;

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Read configuration from a TOML file.
///
/// Values are not validated here: callers apply their overrides first and
/// then run `validate_config` once on the result.
pub fn read_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    parse_config(&content)
}

/// Parse configuration from TOML text without validating it.
pub fn parse_config(content: &str) -> Result<AppConfig, ConfigError> {
    toml::from_str(content).map_err(ConfigError::Parse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::validate_config;
    use std::io::Write;

    #[test]
    fn loads_file_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[service]\nname = \"Study\"\ncredential = \"secret\"\nport = 5100\n"
        )
        .unwrap();

        let config = read_config(file.path()).unwrap();
        assert_eq!(config.service.name, "Study");
        assert_eq!(config.service.credential.as_deref(), Some("secret"));
        assert_eq!(config.service.port, 5100);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_config(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let err = parse_config("[service\nname = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn invalid_values_parse_and_fail_validation_later() {
        let config = parse_config("[service]\nname = \"\"\npoll_timeout_ms = 0\n").unwrap();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(
            ConfigError::Validation(errors).to_string(),
            "Validation failed: service.name: must not be empty, \
             service.poll_timeout_ms: must be between 1 and 60000"
        );
    }
}
