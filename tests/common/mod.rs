//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use servicekeeper::discovery::{AnnounceError, Announcement, Announcer, AnnouncerFactory, StaticIdentity};
use servicekeeper::{BoxError, Connection, ConnectionHandler, ConnectionInfo, ConnectionObserver, ServiceConfig, ServiceHandle};
use tokio::sync::mpsc;

pub const IDENTITY: &str = "a1b2c3d4e5f6";

/// Loopback config with a short poll timeout.
pub fn local_config(port: u16) -> ServiceConfig {
    let mut config = ServiceConfig::new("Integration Speaker").with_port(port);
    config.bind_host = "127.0.0.1".into();
    config.poll_timeout_ms = 100;
    config
}

/// A port that was free a moment ago.
pub fn free_port() -> u16 {
    let probe = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    probe.local_addr().unwrap().port()
}

/// What a handler saw for one connection.
#[derive(Debug, Clone)]
pub struct HandledConnection {
    pub identity: String,
    pub credential: Option<String>,
    pub info: Arc<ConnectionInfo>,
}

/// Handler that reports each invocation and closes the socket.
pub struct RecordingHandler {
    tx: mpsc::UnboundedSender<HandledConnection>,
}

impl RecordingHandler {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<HandledConnection>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }
}

#[async_trait]
impl ConnectionHandler for RecordingHandler {
    async fn handle(&self, identity: String, connection: Connection, credential: Option<String>) -> Result<(), BoxError> {
        let _ = self.tx.send(HandledConnection {
            identity,
            credential,
            info: Arc::clone(connection.info()),
        });
        Ok(())
    }
}

/// Observer that forwards a label for every connection it sees.
pub struct LabelObserver {
    pub label: &'static str,
    pub tx: mpsc::UnboundedSender<&'static str>,
}

#[async_trait]
impl ConnectionObserver for LabelObserver {
    async fn on_connection(&self, _connection: Arc<ConnectionInfo>) -> Result<(), BoxError> {
        let _ = self.tx.send(self.label);
        Ok(())
    }
}

/// Announcer that records starts and counts stops.
#[derive(Default)]
pub struct RecordingAnnouncer {
    pub started: Mutex<Vec<Announcement>>,
    pub stops: Arc<AtomicUsize>,
}

impl RecordingAnnouncer {
    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn announcements(&self) -> Vec<Announcement> {
        self.started.lock().unwrap().clone()
    }
}

struct CountingStop(Arc<AtomicUsize>);

impl Announcer for CountingStop {
    fn stop(&mut self) -> std::io::Result<()> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl AnnouncerFactory for RecordingAnnouncer {
    fn start(&self, announcement: &Announcement) -> Result<Box<dyn Announcer>, AnnounceError> {
        self.started.lock().unwrap().push(announcement.clone());
        Ok(Box::new(CountingStop(Arc::clone(&self.stops))))
    }
}

/// Build a service with a fixed identity.
pub fn build_service(
    config: ServiceConfig,
    handler: Arc<dyn ConnectionHandler>,
    announcer: Arc<RecordingAnnouncer>,
) -> ServiceHandle {
    ServiceHandle::builder(config, handler)
        .identity_resolver(Arc::new(StaticIdentity(IDENTITY.into())))
        .announcer(announcer)
        .build()
        .unwrap()
}

/// Start `service` and wait until it is bound.
pub async fn start_and_bind(service: &ServiceHandle) -> SocketAddr {
    service.start().unwrap();
    tokio::time::timeout(Duration::from_secs(2), service.bound_addr())
        .await
        .expect("service did not bind in time")
        .expect("service exited before binding")
}

/// Receive one item or fail the test.
pub async fn recv<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> T {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("nothing received in time")
        .expect("channel closed")
}
