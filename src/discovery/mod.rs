//! Discovery collaborators.
//!
//! # Data Flow
//! ```text
//! identity.rs  → stable host identifier (hardware address hex)
//! announcer.rs → advertise (name, identity, port, auth flag); stop on shutdown
//! ```
//!
//! # Design Decisions
//! - Both are traits so embedders can plug in their own backends
//! - Failures here never stop the listener from running

pub mod announcer;
pub mod identity;

pub use announcer::{AnnounceError, Announcement, Announcer, AnnouncerFactory, LogAnnouncer};
pub use identity::{IdentityError, IdentityResolver, InterfaceIdentityResolver, StaticIdentity};
