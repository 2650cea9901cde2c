//! Service lifecycle subsystem.
//!
//! # Data Flow
//! ```text
//! ServiceHandle::start()
//!     → runner.rs on its own task
//!         → identity, announcement, bind
//!         → accept loop
//!             → dispatch (observers)
//!             → handler.rs (one task per connection)
//!     → state.rs releases listener + announcement once
//!
//! ServiceHandle::stop() / Drop / Shutdown signal
//!     → StopFlag set → loop exits within one poll timeout
//! ```
//!
//! # Design Decisions
//! - Fatal errors (bind, accept) surface through `ServiceHandle::wait`
//! - Identity, announcement, handler and observer failures are logged only
//! - The handler owns the socket; observers get `ConnectionInfo`

pub mod error;
pub mod handle;
pub mod handler;
pub mod runner;
pub mod state;

pub use error::ServiceError;
pub use handle::{ServiceBuilder, ServiceHandle};
pub use handler::{ConnectionHandler, DrainHandler, SharedHandler};
pub use runner::ServiceRunner;
pub use state::{ServiceResources, StopFlag};
