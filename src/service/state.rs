//! Shared runner state: the stop flag and the release-once resources.
//!
//! # Invariants
//! - `StopFlag` only ever goes from unset to set
//! - Listener and announcer are released at most once, by whichever of
//!   loop exit and the termination hook gets there first

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::net::TcpListener;

use crate::discovery::Announcer;

/// Monotonic stop request shared by the handle, the loop and the hook.
#[derive(Debug, Default)]
pub struct StopFlag(AtomicBool);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop. Returns true only for the call that set the flag.
    pub fn request(&self) -> bool {
        !self.0.swap(true, Ordering::SeqCst)
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Listener and announcement owned by one runner.
#[derive(Default)]
pub struct ServiceResources {
    released: AtomicBool,
    listener: Mutex<Option<Arc<TcpListener>>>,
    announcer: Mutex<Option<Box<dyn Announcer>>>,
}

impl ServiceResources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand over the running announcement.
    ///
    /// If resources were already released, the announcement is withdrawn
    /// immediately and false is returned.
    pub fn install_announcer(&self, mut announcer: Box<dyn Announcer>) -> bool {
        let mut slot = lock(&self.announcer);
        if self.is_released() {
            drop(slot);
            stop_announcer(announcer.as_mut());
            return false;
        }
        *slot = Some(announcer);
        true
    }

    /// Hand over the bound listener and get back a handle for accepting.
    ///
    /// Returns `None` (and closes the socket) if resources were already released.
    pub fn install_listener(&self, listener: TcpListener) -> Option<Arc<TcpListener>> {
        let mut slot = lock(&self.listener);
        if self.is_released() {
            return None;
        }
        let listener = Arc::new(listener);
        *slot = Some(Arc::clone(&listener));
        Some(listener)
    }

    /// Withdraw the announcement and close the listener, once.
    ///
    /// Returns false if another path already did it. Close failures are
    /// logged and swallowed. The socket is closed once the accept loop has
    /// also dropped its handle.
    pub fn release(&self, reason: &'static str) -> bool {
        if self
            .released
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }

        if let Some(mut announcer) = lock(&self.announcer).take() {
            stop_announcer(announcer.as_mut());
        }
        let listener = lock(&self.listener).take();
        drop(listener);

        tracing::info!(reason, "service stopped.");
        true
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for ServiceResources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceResources")
            .field("released", &self.is_released())
            .field("listener", &lock(&self.listener).is_some())
            .field("announcer", &lock(&self.announcer).is_some())
            .finish()
    }
}

fn stop_announcer(announcer: &mut dyn Announcer) {
    if let Err(e) = announcer.stop() {
        tracing::warn!(error = %e, "Failed to withdraw announcement");
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
