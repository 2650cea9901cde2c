//! Service error types.

use thiserror::Error;

use crate::config::ValidationError;
use crate::net::ListenerError;

/// Errors surfaced to the embedding application.
///
/// Only fatal conditions appear here. Identity, announcement and
/// per-connection failures are logged where they happen.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Neither the configured port nor an OS-assigned one could be bound.
    #[error("failed to bind any port: {0}")]
    Bind(#[source] std::io::Error),

    /// Accepting failed for a reason other than the poll timeout.
    #[error("accept failed: {0}")]
    Accept(#[source] std::io::Error),

    #[error("service already started")]
    AlreadyStarted,

    #[error("start() must be called from within a tokio runtime")]
    NoRuntime,

    #[error("invalid configuration: {}", join_errors(.0))]
    InvalidConfig(Vec<ValidationError>),

    /// The runner task panicked or was cancelled.
    #[error("service runner aborted: {0}")]
    RunnerAborted(String),
}

impl From<ListenerError> for ServiceError {
    fn from(err: ListenerError) -> Self {
        match err {
            ListenerError::Bind(e) => ServiceError::Bind(e),
            ListenerError::Accept(e) => ServiceError::Accept(e),
        }
    }
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
