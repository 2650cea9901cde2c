//! Network service lifecycle manager.
//!
//! Owns a listening socket, accepts connections on a background task, hands
//! each one to a connection handler and to any number of observers, and
//! shuts down cleanly on `stop()` or a shutdown signal.

pub mod config;
pub mod discovery;
pub mod dispatch;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod service;

pub use config::{AppConfig, ServiceConfig};
pub use dispatch::ConnectionObserver;
pub use lifecycle::Shutdown;
pub use net::{Connection, ConnectionInfo};
pub use service::{ConnectionHandler, ServiceError, ServiceHandle};

/// Error type returned by user-supplied handlers and observers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
