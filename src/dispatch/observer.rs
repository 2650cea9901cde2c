//! Connection observers and the set that holds them.

use std::sync::Arc;

use arc_swap::ArcSwap;
use async_trait::async_trait;

use crate::net::ConnectionInfo;
use crate::BoxError;

/// Notified once for every accepted connection.
///
/// Observers see connection metadata only; the socket belongs to the
/// connection handler.
#[async_trait]
pub trait ConnectionObserver: Send + Sync + 'static {
    async fn on_connection(&self, connection: Arc<ConnectionInfo>) -> Result<(), BoxError>;
}

#[async_trait]
impl<F> ConnectionObserver for F
where
    F: Fn(Arc<ConnectionInfo>) -> Result<(), BoxError> + Send + Sync + 'static,
{
    async fn on_connection(&self, connection: Arc<ConnectionInfo>) -> Result<(), BoxError> {
        (self)(connection)
    }
}

pub type SharedObserver = Arc<dyn ConnectionObserver>;

/// Whether two handles point at the same observer instance.
pub fn same_observer(a: &SharedObserver, b: &SharedObserver) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

/// Ordered, identity-unique observer list.
///
/// Copy-on-write: readers take a snapshot without locking, writers swap in
/// a new vector. A dispatch that already took its snapshot does not see
/// later changes.
pub struct ObserverSet {
    observers: ArcSwap<Vec<SharedObserver>>,
}

impl ObserverSet {
    pub fn new() -> Self {
        Self {
            observers: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// Add `observer` unless that same instance is already present.
    pub fn insert(&self, observer: SharedObserver) -> bool {
        let mut added = false;
        self.observers.rcu(|current| {
            if current.iter().any(|o| same_observer(o, &observer)) {
                added = false;
                Arc::clone(current)
            } else {
                added = true;
                let mut next = Vec::with_capacity(current.len() + 1);
                next.extend(current.iter().cloned());
                next.push(Arc::clone(&observer));
                Arc::new(next)
            }
        });
        added
    }

    /// Remove `observer` by identity. Returns whether it was present.
    pub fn remove(&self, observer: &SharedObserver) -> bool {
        let mut removed = false;
        self.observers.rcu(|current| {
            let next: Vec<SharedObserver> = current
                .iter()
                .filter(|o| !same_observer(o, observer))
                .cloned()
                .collect();
            removed = next.len() != current.len();
            if removed {
                Arc::new(next)
            } else {
                Arc::clone(current)
            }
        });
        removed
    }

    /// Current observers, in subscription order.
    pub fn snapshot(&self) -> Arc<Vec<SharedObserver>> {
        self.observers.load_full()
    }

    pub fn len(&self) -> usize {
        self.observers.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ObserverSet {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ObserverSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverSet").field("len", &self.len()).finish()
    }
}
