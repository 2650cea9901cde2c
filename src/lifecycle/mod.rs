//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validated config → Build service → Subscribe observers → Start
//!
//! Shutdown (shutdown.rs):
//!     Signal triggered → Runner stops accepting → Release socket + announcement
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger shutdown
//! ```
//!
//! # Design Decisions
//! - The core never installs OS handlers itself; the host wires signals
//!   into a `Shutdown`
//! - In-flight connections are not cancelled on shutdown

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
