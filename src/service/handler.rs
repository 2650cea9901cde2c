//! Per-connection protocol handlers.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;

use crate::net::Connection;
use crate::BoxError;

/// Speaks the application protocol on one accepted connection.
///
/// Invoked once per accept on its own task. The handler owns the socket
/// and closes it by dropping `connection`. `credential` is `Some` exactly
/// when the service is configured with one.
#[async_trait]
pub trait ConnectionHandler: Send + Sync + 'static {
    async fn handle(
        &self,
        identity: String,
        connection: Connection,
        credential: Option<String>,
    ) -> Result<(), BoxError>;
}

pub type SharedHandler = Arc<dyn ConnectionHandler>;

/// Reads and discards everything the peer sends, then closes.
///
/// Used by the binary when no protocol is plugged in.
#[derive(Debug, Clone)]
pub struct DrainHandler {
    idle_timeout: Duration,
}

impl DrainHandler {
    pub fn new(idle_timeout: Duration) -> Self {
        Self { idle_timeout }
    }
}

impl Default for DrainHandler {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

#[async_trait]
impl ConnectionHandler for DrainHandler {
    async fn handle(
        &self,
        identity: String,
        mut connection: Connection,
        credential: Option<String>,
    ) -> Result<(), BoxError> {
        let id = connection.id();
        tracing::debug!(
            connection_id = %id,
            identity = %identity,
            auth_required = credential.is_some(),
            "Draining connection"
        );

        let mut buf = [0u8; 8192];
        let mut total = 0usize;
        loop {
            let read = tokio::time::timeout(self.idle_timeout, connection.stream().read(&mut buf)).await;
            match read {
                Err(_) => {
                    tracing::debug!(connection_id = %id, "Idle timeout, closing");
                    break;
                }
                Ok(Ok(0)) => break,
                Ok(Ok(n)) => total += n,
                Ok(Err(e)) => return Err(e.into()),
            }
        }

        tracing::debug!(connection_id = %id, bytes = total, "Connection drained");
        Ok(())
    }
}
