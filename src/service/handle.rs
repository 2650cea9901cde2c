//! The embedding application's entry point.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::{validate_service, ServiceConfig};
use crate::discovery::{AnnouncerFactory, IdentityResolver, InterfaceIdentityResolver, LogAnnouncer};
use crate::dispatch::{ConnectionDispatcher, SharedObserver, WorkPool};
use crate::lifecycle::Shutdown;
use crate::net::ConnectionTracker;
use crate::service::error::ServiceError;
use crate::service::handler::SharedHandler;
use crate::service::runner::ServiceRunner;
use crate::service::state::StopFlag;

/// Assembles a [`ServiceHandle`].
pub struct ServiceBuilder {
    config: ServiceConfig,
    handler: SharedHandler,
    announcer: Arc<dyn AnnouncerFactory>,
    identity: Arc<dyn IdentityResolver>,
    shutdown: Shutdown,
}

impl ServiceBuilder {
    /// Announcement backend. Defaults to [`LogAnnouncer`].
    pub fn announcer(mut self, announcer: Arc<dyn AnnouncerFactory>) -> Self {
        self.announcer = announcer;
        self
    }

    /// Host identity source. Defaults to [`InterfaceIdentityResolver`].
    pub fn identity_resolver(mut self, identity: Arc<dyn IdentityResolver>) -> Self {
        self.identity = identity;
        self
    }

    /// Shutdown signal acting as the termination hook.
    pub fn shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Validate the configuration and create the handle. Nothing runs yet.
    pub fn build(self) -> Result<ServiceHandle, ServiceError> {
        validate_service(&self.config).map_err(ServiceError::InvalidConfig)?;

        let config = Arc::new(self.config);
        let observers = WorkPool::new(config.dispatch.max_concurrent_observers);
        let dispatcher = Arc::new(ConnectionDispatcher::new(observers));
        let runner = ServiceRunner::new(
            Arc::clone(&config),
            self.handler,
            Arc::clone(&dispatcher),
            self.announcer,
            self.identity,
            self.shutdown,
        );

        Ok(ServiceHandle {
            config,
            dispatcher,
            stop: runner.stop_flag(),
            bound: runner.bound_addr(),
            tracker: runner.tracker(),
            runner: Mutex::new(Some(runner)),
            task: Mutex::new(None),
            started: AtomicBool::new(false),
        })
    }
}

/// A network service that can be started once and stopped any number of times.
///
/// # Policies
/// - A second `start()` fails with [`ServiceError::AlreadyStarted`].
/// - `start()` after `stop()` is a no-op: nothing binds, `wait()` returns `Ok`.
/// - `stop()` is safe before `start()`, safe to repeat, and returns without
///   waiting; the loop exits within one poll timeout.
/// - Dropping the handle stops the service.
pub struct ServiceHandle {
    config: Arc<ServiceConfig>,
    dispatcher: Arc<ConnectionDispatcher>,
    stop: Arc<StopFlag>,
    bound: watch::Receiver<Option<SocketAddr>>,
    tracker: ConnectionTracker,
    runner: Mutex<Option<ServiceRunner>>,
    task: Mutex<Option<JoinHandle<Result<(), ServiceError>>>>,
    started: AtomicBool,
}

impl ServiceHandle {
    pub fn builder(config: ServiceConfig, handler: SharedHandler) -> ServiceBuilder {
        ServiceBuilder {
            config,
            handler,
            announcer: Arc::new(LogAnnouncer),
            identity: Arc::new(InterfaceIdentityResolver::new()),
            shutdown: Shutdown::new(),
        }
    }

    /// Launch the accept loop on the current tokio runtime.
    pub fn start(&self) -> Result<(), ServiceError> {
        let runtime = Handle::try_current().map_err(|_| ServiceError::NoRuntime)?;
        let runner = lock(&self.runner).take().ok_or(ServiceError::AlreadyStarted)?;

        if self.stop.is_requested() {
            tracing::debug!(name = %self.config.name, "start() after stop(), not starting");
            return Ok(());
        }

        *lock(&self.task) = Some(runtime.spawn(runner.run()));
        self.started.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Request the accept loop to exit. Does not wait for it.
    pub fn stop(&self) {
        if self.stop.request() {
            tracing::info!(name = %self.config.name, "stop requested");
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_requested()
    }

    /// Whether `start()` actually launched the runner.
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Register an observer for every future connection.
    pub fn subscribe(&self, observer: SharedObserver) -> bool {
        self.dispatcher.subscribe(observer)
    }

    pub fn unsubscribe(&self, observer: &SharedObserver) -> bool {
        self.dispatcher.unsubscribe(observer)
    }

    /// The address actually bound, while the loop is running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.bound.borrow()
    }

    /// Wait until the listener is bound.
    ///
    /// Returns `None` if the runner ended (or was discarded) without binding.
    pub async fn bound_addr(&self) -> Option<SocketAddr> {
        let mut bound = self.bound.clone();
        let addr = match bound.wait_for(Option::is_some).await {
            Ok(addr) => *addr,
            Err(_) => None,
        };
        addr
    }

    /// Wait for the runner to finish and return its outcome.
    ///
    /// Only the first call observes the outcome; later calls, and calls on a
    /// handle that never launched, return `Ok(())`.
    pub async fn wait(&self) -> Result<(), ServiceError> {
        let task = lock(&self.task).take();
        match task {
            None => Ok(()),
            Some(task) => match task.await {
                Ok(result) => result,
                Err(e) if e.is_panic() => Err(ServiceError::RunnerAborted("runner panicked".into())),
                Err(e) => Err(ServiceError::RunnerAborted(e.to_string())),
            },
        }
    }

    /// Connections whose handler still holds the socket.
    pub fn active_connections(&self) -> u64 {
        self.tracker.active_count()
    }

    pub fn observer_count(&self) -> usize {
        self.dispatcher.observer_count()
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }
}

impl Drop for ServiceHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for ServiceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceHandle")
            .field("name", &self.config.name)
            .field("started", &self.is_started())
            .field("stopped", &self.is_stopped())
            .field("local_addr", &self.local_addr())
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::StaticIdentity;
    use crate::service::handler::DrainHandler;
    use std::time::Duration;

    fn handle(config: ServiceConfig) -> ServiceHandle {
        ServiceHandle::builder(config, Arc::new(DrainHandler::default()))
            .identity_resolver(Arc::new(StaticIdentity("a1b2c3d4e5f6".into())))
            .build()
            .unwrap()
    }

    fn local_config() -> ServiceConfig {
        let mut config = ServiceConfig::new("Office").with_port(0);
        config.bind_host = "127.0.0.1".into();
        config.poll_timeout_ms = 50;
        config
    }

    #[test]
    fn build_rejects_invalid_config() {
        let err = ServiceHandle::builder(ServiceConfig::new(""), Arc::new(DrainHandler::default()))
            .build()
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidConfig(_)));
    }

    #[test]
    fn start_outside_runtime_is_rejected() {
        let service = handle(local_config());
        assert!(matches!(service.start(), Err(ServiceError::NoRuntime)));
        assert!(!service.is_started());
    }

    #[tokio::test]
    async fn second_start_is_rejected() {
        let service = handle(local_config());
        service.start().unwrap();
        assert!(matches!(service.start(), Err(ServiceError::AlreadyStarted)));

        service.bound_addr().await.expect("bound");
        service.stop();
        service.wait().await.unwrap();
    }

    #[tokio::test]
    async fn stop_before_start_makes_start_a_noop() {
        let service = handle(local_config());
        service.stop();
        service.stop();

        service.start().unwrap();
        assert!(!service.is_started());
        assert!(service.local_addr().is_none());
        assert_eq!(service.bound_addr().await, None);
        tokio::time::timeout(Duration::from_secs(1), service.wait())
            .await
            .expect("wait hung")
            .unwrap();
    }

    #[tokio::test]
    async fn wait_without_start_returns_immediately() {
        let service = handle(local_config());
        service.wait().await.unwrap();
    }
}
