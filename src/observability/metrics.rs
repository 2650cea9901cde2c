//! Metrics collection and exposition.
//!
//! # Metrics
//! - `servicekeeper_connections_accepted_total` (counter)
//! - `servicekeeper_tasks_total` (counter): handler/observer tasks by `kind`, `outcome`
//! - `servicekeeper_observers` (gauge): currently subscribed observers
//! - `servicekeeper_port_fallbacks_total` (counter): binds that fell back to an OS port
//! - `servicekeeper_announce_failures_total` (counter)
//!
//! Without an installed recorder every call here is a no-op.

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_connection_accepted() {
    metrics::counter!("servicekeeper_connections_accepted_total").increment(1);
}

pub fn record_task(kind: &'static str, outcome: &'static str) {
    metrics::counter!("servicekeeper_tasks_total", "kind" => kind, "outcome" => outcome).increment(1);
}

pub fn record_observer_count(count: usize) {
    metrics::gauge!("servicekeeper_observers").set(count as f64);
}

pub fn record_port_fallback() {
    metrics::counter!("servicekeeper_port_fallbacks_total").increment(1);
}

pub fn record_announce_failure() {
    metrics::counter!("servicekeeper_announce_failures_total").increment(1);
}
