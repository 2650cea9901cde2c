//! Startup orchestration for the binary.
//!
//! # Responsibilities
//! - Build the service from validated configuration
//! - Attach the connection log observer
//! - Run until the shutdown signal or a fatal error, then stop and join

use std::sync::Arc;

use crate::config::AppConfig;
use crate::dispatch::SharedObserver;
use crate::lifecycle::Shutdown;
use crate::net::ConnectionInfo;
use crate::service::{DrainHandler, ServiceError, ServiceHandle};
use crate::BoxError;

/// Observer that logs every accepted connection.
pub fn connection_logger() -> SharedObserver {
    Arc::new(|info: Arc<ConnectionInfo>| -> Result<(), BoxError> {
        tracing::info!(
            connection_id = %info.id,
            peer_addr = %info.peer_addr,
            local_addr = %info.local_addr,
            "accepted connection from {}",
            info.peer_addr
        );
        Ok(())
    })
}

/// Run the service until `shutdown` fires or the accept loop fails.
pub async fn run(config: AppConfig, shutdown: Shutdown) -> Result<(), ServiceError> {
    let service = ServiceHandle::builder(config.service, Arc::new(DrainHandler::default()))
        .shutdown(shutdown.clone())
        .build()?;

    service.subscribe(connection_logger());
    service.start()?;

    tokio::select! {
        addr = service.bound_addr() => {
            if let Some(addr) = addr {
                tracing::info!(address = %addr, "Ready for connections");
            }
        }
        () = shutdown.cancelled() => {}
    }

    let result = tokio::select! {
        result = service.wait() => result,
        () = shutdown.cancelled() => {
            service.stop();
            service.wait().await
        }
    };

    tracing::info!(
        active_connections = service.active_connections(),
        "Shutdown complete"
    );
    result
}
