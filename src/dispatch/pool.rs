//! Bounded pool for per-connection work.
//!
//! Every handler and observer invocation runs as its own task. A semaphore
//! caps how many run at once; the permit is taken inside the spawned task so
//! the accept loop never waits for the pool. Handlers and observers use
//! separate pools.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::net::ConnectionId;
use crate::observability::metrics;
use crate::BoxError;

/// Which consumer a task serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Handler,
    Observer,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Handler => "handler",
            TaskKind::Observer => "observer",
        }
    }
}

/// How a pool task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed,
    /// The task returned an error.
    Failed,
    Panicked,
}

impl TaskOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskOutcome::Completed => "completed",
            TaskOutcome::Failed => "failed",
            TaskOutcome::Panicked => "panicked",
        }
    }
}

/// Spawns isolated, concurrency-limited tasks.
#[derive(Debug, Clone)]
pub struct WorkPool {
    permits: Arc<Semaphore>,
}

impl WorkPool {
    pub fn new(max_concurrent_tasks: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_concurrent_tasks)),
        }
    }

    /// Run `task` on its own tokio task.
    ///
    /// Errors and panics are logged and reported through the returned
    /// outcome; they never reach the caller.
    pub fn spawn<F>(&self, kind: TaskKind, connection_id: ConnectionId, task: F) -> JoinHandle<TaskOutcome>
    where
        F: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        let permits = Arc::clone(&self.permits);
        tokio::spawn(async move {
            // The semaphore is never closed, so this always holds a permit.
            let _permit = permits.acquire_owned().await;

            let outcome = match AssertUnwindSafe(task).catch_unwind().await {
                Ok(Ok(())) => TaskOutcome::Completed,
                Ok(Err(e)) => {
                    tracing::warn!(
                        connection_id = %connection_id,
                        kind = kind.as_str(),
                        error = %e,
                        "Connection task failed"
                    );
                    TaskOutcome::Failed
                }
                Err(payload) => {
                    tracing::error!(
                        connection_id = %connection_id,
                        kind = kind.as_str(),
                        panic = panic_message(payload.as_ref()),
                        "Connection task panicked"
                    );
                    TaskOutcome::Panicked
                }
            };

            metrics::record_task(kind.as_str(), outcome.as_str());
            outcome
        })
    }

    /// Free slots right now.
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
