//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Configured port
//!     → listener.rs (bind, fall back to OS-assigned port if busy)
//!     → listener.rs (accept with poll timeout)
//!     → connection.rs (ConnectionInfo for observers, Connection for the handler)
//!     → Hand off to the service runner
//! ```
//!
//! # Design Decisions
//! - Accept waits are bounded so the caller can re-check its stop flag
//! - A busy port is not fatal; only failing to bind any port is
//! - The socket has a single owner (the handler); observers get metadata

pub mod connection;
pub mod listener;

pub use connection::{Connection, ConnectionId, ConnectionInfo, ConnectionTracker};
pub use listener::{accept_with_timeout, bind_with_fallback, BoundListener, ListenerError};
