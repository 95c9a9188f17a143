//! Metrics collection and exposition.
//!
//! # Metrics
//! - `h1wire_requests_total` (counter): served requests by method, status
//! - `h1wire_request_duration_seconds` (histogram): time to answer a request
//! - `h1wire_active_connections` (gauge): live server connections
//! - `h1wire_redirects_followed_total` (counter): client redirect hops
//!
//! Without an installed recorder every call here is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "h1wire_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("h1wire_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn connection_opened() {
    gauge!("h1wire_active_connections").increment(1.0);
}

pub fn connection_closed() {
    gauge!("h1wire_active_connections").decrement(1.0);
}

pub fn redirect_followed(status: u16) {
    counter!("h1wire_redirects_followed_total", "status" => status.to_string()).increment(1);
}
