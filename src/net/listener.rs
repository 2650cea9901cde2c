//! TCP listener with port fallback and bounded accept waits.
//!
//! # Responsibilities
//! - Bind to the configured port, falling back to an OS-assigned one
//! - Accept incoming TCP connections with a poll timeout
//! - Distinguish "nothing arrived yet" from a real accept failure

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};

use crate::observability::metrics;

/// Error type for listener operations.
#[derive(Debug)]
pub enum ListenerError {
    /// Failed to bind to the requested port and to any fallback port.
    Bind(std::io::Error),
    /// Failed to accept connection.
    Accept(std::io::Error),
}

impl std::fmt::Display for ListenerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenerError::Bind(e) => write!(f, "Failed to bind: {}", e),
            ListenerError::Accept(e) => write!(f, "Failed to accept: {}", e),
        }
    }
}

impl std::error::Error for ListenerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ListenerError::Bind(e) | ListenerError::Accept(e) => Some(e),
        }
    }
}

/// A listener together with the address it actually ended up on.
#[derive(Debug)]
pub struct BoundListener {
    pub listener: TcpListener,
    pub local_addr: SocketAddr,
    /// True when the requested port was busy and the OS picked another.
    pub fell_back: bool,
}

/// Bind `host:port`, or `host:0` if that fails.
///
/// The configured port is only a request; callers must read `local_addr`.
pub async fn bind_with_fallback(host: &str, port: u16) -> Result<BoundListener, ListenerError> {
    let ip: IpAddr = host
        .parse()
        .map_err(|e| ListenerError::Bind(std::io::Error::new(std::io::ErrorKind::InvalidInput, e)))?;

    let (listener, fell_back) = match TcpListener::bind(SocketAddr::new(ip, port)).await {
        Ok(listener) => (listener, false),
        Err(e) => {
            tracing::warn!(port, error = %e, "port busy, using an OS-assigned port");
            metrics::record_port_fallback();
            let listener = TcpListener::bind(SocketAddr::new(ip, 0))
                .await
                .map_err(ListenerError::Bind)?;
            (listener, true)
        }
    };

    let local_addr = listener.local_addr().map_err(ListenerError::Bind)?;

    tracing::info!(
        address = %local_addr,
        requested_port = port,
        fell_back,
        "Listener bound"
    );

    Ok(BoundListener {
        listener,
        local_addr,
        fell_back,
    })
}

/// Wait at most `timeout` for one connection.
///
/// Returns `Ok(None)` when the wait elapsed with nothing to accept.
pub async fn accept_with_timeout(
    listener: &TcpListener,
    timeout: Duration,
) -> Result<Option<(TcpStream, SocketAddr)>, ListenerError> {
    match tokio::time::timeout(timeout, listener.accept()).await {
        Err(_elapsed) => Ok(None),
        Ok(Ok((stream, addr))) => {
            tracing::debug!(peer_addr = %addr, "Connection accepted");
            Ok(Some((stream, addr)))
        }
        Ok(Err(e)) => Err(ListenerError::Accept(e)),
    }
}
