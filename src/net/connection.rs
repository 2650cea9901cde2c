//! Accepted connections and their lifetime tracking.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Describe an accepted connection to observers (`ConnectionInfo`)
//! - Hand the socket itself to exactly one owner (`Connection`)
//! - Count connections whose socket is still open

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use tokio::net::TcpStream;

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Read-only description of an accepted connection.
///
/// Shared between the handler and every observer of the same accept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub id: ConnectionId,
    pub peer_addr: SocketAddr,
    pub local_addr: SocketAddr,
    pub accepted_at: SystemTime,
}

impl ConnectionInfo {
    pub fn new(peer_addr: SocketAddr, local_addr: SocketAddr) -> Self {
        Self {
            id: ConnectionId::new(),
            peer_addr,
            local_addr,
            accepted_at: SystemTime::now(),
        }
    }
}

/// An accepted connection, owned by the connection handler.
///
/// The handler is the only party holding the socket; dropping the
/// `Connection` closes it. Observers see the same `info`.
#[derive(Debug)]
pub struct Connection {
    stream: TcpStream,
    info: Arc<ConnectionInfo>,
    _guard: Option<ConnectionGuard>,
}

impl Connection {
    pub fn new(stream: TcpStream, info: Arc<ConnectionInfo>) -> Self {
        Self {
            stream,
            info,
            _guard: None,
        }
    }

    /// Attach a tracker guard so the connection counts as open until dropped.
    pub fn tracked(mut self, tracker: &ConnectionTracker) -> Self {
        self._guard = Some(tracker.track(self.info.id));
        self
    }

    pub fn id(&self) -> ConnectionId {
        self.info.id
    }

    pub fn info(&self) -> &Arc<ConnectionInfo> {
        &self.info
    }

    pub fn stream(&mut self) -> &mut TcpStream {
        &mut self.stream
    }
}

/// Counts connections whose handler still holds the socket.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    active_count: Arc<AtomicU64>,
}

impl ConnectionTracker {
    /// Create a new connection tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new active connection. Returns a guard that decrements on drop.
    pub fn track(&self, id: ConnectionId) -> ConnectionGuard {
        self.active_count.fetch_add(1, Ordering::SeqCst);
        ConnectionGuard {
            active_count: Arc::clone(&self.active_count),
            id,
        }
    }

    /// Get current active connection count.
    pub fn active_count(&self) -> u64 {
        self.active_count.load(Ordering::SeqCst)
    }
}

/// Guard that tracks a connection's lifetime.
/// Decrements active count when dropped.
#[derive(Debug)]
pub struct ConnectionGuard {
    active_count: Arc<AtomicU64>,
    id: ConnectionId,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.active_count.fetch_sub(1, Ordering::SeqCst);
        tracing::trace!(connection_id = %self.id, "Connection closed");
    }
}
