//! Connection dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! Accepted connection (ConnectionInfo)
//!     → dispatcher.rs (snapshot of observer.rs set)
//!     → pool.rs (one bounded, isolated task per observer)
//!     → observer.on_connection()
//! ```
//!
//! # Design Decisions
//! - Dispatch never waits for observers
//! - Observer set is copy-on-write; a subscription racing an in-flight
//!   dispatch may or may not see that connection
//! - Observer identity is the `Arc` allocation, not value equality

pub mod dispatcher;
pub mod observer;
pub mod pool;

pub use dispatcher::ConnectionDispatcher;
pub use observer::{ConnectionObserver, ObserverSet, SharedObserver};
pub use pool::{TaskKind, TaskOutcome, WorkPool};
