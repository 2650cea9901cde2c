//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → CLI overrides (binary only)
//!     → validation.rs (semantic checks, once)
//!     → AppConfig (validated, immutable)
//!     → ServiceConfig handed to the service handle
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; a running service never re-reads it
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{parse_config, read_config, ConfigError};
pub use schema::{AppConfig, DispatchConfig, LogFormat, ObservabilityConfig, ServiceConfig};
pub use validation::{validate_config, validate_service, ValidationError};
