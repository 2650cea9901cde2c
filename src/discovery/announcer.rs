//! Service announcement on the local network.
//!
//! The announcement backend is pluggable: an `AnnouncerFactory` starts an
//! announcement and returns an `Announcer` handle whose `stop` withdraws it.

use std::io;

use thiserror::Error;

/// What gets advertised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    pub service_name: String,
    pub identity: String,
    pub port: u16,
    pub auth_required: bool,
}

impl std::fmt::Display for Announcement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} @ {}", self.service_name, self.identity)
    }
}

/// Errors raised while starting an announcement.
#[derive(Debug, Error)]
pub enum AnnounceError {
    #[error("announcement transport failed: {0}")]
    Io(#[from] io::Error),

    #[error("announcement rejected: {0}")]
    Rejected(String),
}

/// Starts announcements.
pub trait AnnouncerFactory: Send + Sync {
    fn start(&self, announcement: &Announcement) -> Result<Box<dyn Announcer>, AnnounceError>;
}

/// A running announcement.
pub trait Announcer: Send {
    /// Withdraw the announcement.
    fn stop(&mut self) -> io::Result<()>;
}

/// Announces by logging only. Stands in where no discovery backend is wired.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAnnouncer;

impl AnnouncerFactory for LogAnnouncer {
    fn start(&self, announcement: &Announcement) -> Result<Box<dyn Announcer>, AnnounceError> {
        tracing::info!(
            port = announcement.port,
            auth_required = announcement.auth_required,
            "announced [{}]",
            announcement
        );
        Ok(Box::new(LoggedAnnouncement {
            announcement: announcement.clone(),
            stopped: false,
        }))
    }
}

struct LoggedAnnouncement {
    announcement: Announcement,
    stopped: bool,
}

impl Announcer for LoggedAnnouncement {
    fn stop(&mut self) -> io::Result<()> {
        if !self.stopped {
            self.stopped = true;
            tracing::info!("withdrew announcement [{}]", self.announcement);
        }
        Ok(())
    }
}
