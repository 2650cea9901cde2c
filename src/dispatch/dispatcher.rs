//! Fan-out of accepted connections to observers.

use std::sync::Arc;

use crate::dispatch::observer::{ObserverSet, SharedObserver};
use crate::dispatch::pool::{TaskKind, WorkPool};
use crate::net::ConnectionInfo;
use crate::observability::metrics;

/// Delivers each accepted connection to every subscribed observer.
///
/// Each delivery is its own task on the observer pool: `dispatch` returns as
/// soon as the tasks are spawned, and a failing or panicking observer affects
/// no one else. The pool is not shared with connection handlers.
#[derive(Debug)]
pub struct ConnectionDispatcher {
    observers: ObserverSet,
    pool: WorkPool,
}

impl ConnectionDispatcher {
    pub fn new(pool: WorkPool) -> Self {
        Self {
            observers: ObserverSet::new(),
            pool,
        }
    }

    /// Register `observer`. Returns false if that instance is already registered.
    pub fn subscribe(&self, observer: SharedObserver) -> bool {
        let added = self.observers.insert(observer);
        if added {
            metrics::record_observer_count(self.observers.len());
        }
        added
    }

    /// Deregister `observer`. Returns whether it was registered.
    pub fn unsubscribe(&self, observer: &SharedObserver) -> bool {
        let removed = self.observers.remove(observer);
        if removed {
            metrics::record_observer_count(self.observers.len());
        }
        removed
    }

    /// Notify every current observer about `connection`.
    ///
    /// Must be called from within a tokio runtime. Returns the number of
    /// observers notified.
    pub fn dispatch(&self, connection: Arc<ConnectionInfo>) -> usize {
        let observers = self.observers.snapshot();
        for observer in observers.iter() {
            let observer = Arc::clone(observer);
            let connection = Arc::clone(&connection);
            let id = connection.id;
            self.pool.spawn(TaskKind::Observer, id, async move {
                observer.on_connection(connection).await
            });
        }

        tracing::trace!(
            connection_id = %connection.id,
            observers = observers.len(),
            free_slots = self.pool.available_permits(),
            "Connection dispatched"
        );
        observers.len()
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }
}
