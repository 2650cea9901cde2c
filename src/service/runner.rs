//! The accept loop and its lifecycle.
//!
//! # Lifecycle
//! ```text
//! run()
//!     → spawn termination hook (waits on Shutdown)
//!     → resolve identity          (failure: log, empty identity)
//!     → start announcement        (failure: log, keep going)
//!     → bind port, else OS port   (failure: fatal)
//!     → loop until stop requested:
//!           accept ≤ poll_timeout → dispatch to observers, spawn handler
//!     → release announcer + listener (once)
//! ```
//!
//! Stop is cooperative: the flag is checked once per poll timeout, so a
//! `stop()` takes effect within one `poll_timeout`. The shutdown signal
//! wakes the loop immediately. In-flight handler and observer tasks are
//! never cancelled.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::config::ServiceConfig;
use crate::discovery::{Announcement, AnnouncerFactory, IdentityResolver};
use crate::dispatch::{ConnectionDispatcher, TaskKind, WorkPool};
use crate::lifecycle::Shutdown;
use crate::net::{accept_with_timeout, bind_with_fallback, Connection, ConnectionInfo, ConnectionTracker};
use crate::observability::metrics;
use crate::service::error::ServiceError;
use crate::service::handler::SharedHandler;
use crate::service::state::{ServiceResources, StopFlag};

/// Owns one listening endpoint from bind to close.
pub struct ServiceRunner {
    config: Arc<ServiceConfig>,
    handler: SharedHandler,
    dispatcher: Arc<ConnectionDispatcher>,
    handlers: WorkPool,
    announcer: Arc<dyn AnnouncerFactory>,
    identity: Arc<dyn IdentityResolver>,
    shutdown: Shutdown,
    stop: Arc<StopFlag>,
    resources: Arc<ServiceResources>,
    tracker: ConnectionTracker,
    bound_tx: watch::Sender<Option<SocketAddr>>,
}

impl ServiceRunner {
    pub fn new(
        config: Arc<ServiceConfig>,
        handler: SharedHandler,
        dispatcher: Arc<ConnectionDispatcher>,
        announcer: Arc<dyn AnnouncerFactory>,
        identity: Arc<dyn IdentityResolver>,
        shutdown: Shutdown,
    ) -> Self {
        let (bound_tx, _) = watch::channel(None);
        let handlers = WorkPool::new(config.dispatch.max_concurrent_handlers);
        Self {
            config,
            handler,
            dispatcher,
            handlers,
            announcer,
            identity,
            shutdown,
            stop: Arc::new(StopFlag::new()),
            resources: Arc::new(ServiceResources::new()),
            tracker: ConnectionTracker::new(),
            bound_tx,
        }
    }

    /// Ask the loop to exit. Returns immediately; idempotent.
    pub fn stop(&self) {
        self.stop.request();
    }

    pub fn stop_flag(&self) -> Arc<StopFlag> {
        Arc::clone(&self.stop)
    }

    /// Address updates: `Some` once bound, back to `None` when the runner exits.
    pub fn bound_addr(&self) -> watch::Receiver<Option<SocketAddr>> {
        self.bound_tx.subscribe()
    }

    pub fn tracker(&self) -> ConnectionTracker {
        self.tracker.clone()
    }

    /// Run to completion.
    ///
    /// Returns an error only for fatal conditions: no port could be bound,
    /// or accept failed with something other than a timeout.
    pub async fn run(self) -> Result<(), ServiceError> {
        tracing::info!(name = %self.config.name, "starting service...");

        let finished = CancellationToken::new();
        self.spawn_termination_hook(finished.clone());
        let _finished = finished.drop_guard();

        let result = self.serve().await;
        if let Err(e) = &result {
            tracing::error!(error = %e, "service terminated");
        }

        self.resources.release("accept loop exited");
        self.bound_tx.send_replace(None);
        result
    }

    async fn serve(&self) -> Result<(), ServiceError> {
        let identity = self.resolve_identity().await;
        self.announce(&identity);

        let bound = bind_with_fallback(&self.config.bind_host, self.config.port).await?;
        let local_addr = bound.local_addr;
        if bound.fell_back {
            tracing::warn!(
                requested_port = self.config.port,
                port = local_addr.port(),
                "announced port differs from the bound port"
            );
        }
        let Some(listener) = self.resources.install_listener(bound.listener) else {
            tracing::info!("shutdown requested during startup");
            return Ok(());
        };

        self.bound_tx.send_replace(Some(local_addr));
        tracing::info!(address = %local_addr, "service started.");

        let poll_timeout = self.config.poll_timeout();
        while !self.stop.is_requested() {
            let accepted = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                accepted = accept_with_timeout(&listener, poll_timeout) => accepted?,
            };

            if let Some((stream, peer_addr)) = accepted {
                self.on_accept(stream, peer_addr, local_addr, &identity);
            }
        }

        tracing::debug!("accept loop finished");
        Ok(())
    }

    /// Resolvers may do blocking I/O, so they run on the blocking pool.
    async fn resolve_identity(&self) -> String {
        let resolver = Arc::clone(&self.identity);
        match tokio::task::spawn_blocking(move || resolver.resolve()).await {
            Ok(Ok(identity)) => identity,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "could not resolve host identity, continuing without one");
                String::new()
            }
            Err(e) => {
                tracing::warn!(error = %e, "identity resolver aborted, continuing without one");
                String::new()
            }
        }
    }

    fn announce(&self, identity: &str) {
        let announcement = Announcement {
            service_name: self.config.name.clone(),
            identity: identity.to_string(),
            port: self.config.port,
            auth_required: self.config.auth_required(),
        };

        match self.announcer.start(&announcement) {
            Ok(handle) => {
                self.resources.install_announcer(handle);
            }
            Err(e) => {
                metrics::record_announce_failure();
                tracing::warn!(
                    error = %e,
                    "announcement failed, serving without discovery [{}]",
                    announcement
                );
            }
        }
    }

    fn on_accept(&self, stream: TcpStream, peer_addr: SocketAddr, local_addr: SocketAddr, identity: &str) {
        metrics::record_connection_accepted();
        let info = Arc::new(ConnectionInfo::new(peer_addr, local_addr));
        let id = info.id;
        tracing::info!(connection_id = %id, peer_addr = %peer_addr, "accepted connection");

        self.dispatcher.dispatch(Arc::clone(&info));

        let connection = Connection::new(stream, info).tracked(&self.tracker);
        let handler = Arc::clone(&self.handler);
        let identity = identity.to_string();
        let credential = self.config.credential.clone();
        self.handlers.spawn(TaskKind::Handler, id, async move {
            handler.handle(identity, connection, credential).await
        });
    }

    fn spawn_termination_hook(&self, finished: CancellationToken) {
        let shutdown = self.shutdown.clone();
        let stop = Arc::clone(&self.stop);
        let resources = Arc::clone(&self.resources);

        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("shutting down...");
                    stop.request();
                    resources.release("shutdown signal");
                }
                _ = finished.cancelled() => {}
            }
        });
    }
}

impl std::fmt::Debug for ServiceRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRunner")
            .field("config", &self.config)
            .field("stop_requested", &self.stop.is_requested())
            .field("resources", &self.resources)
            .finish()
    }
}
