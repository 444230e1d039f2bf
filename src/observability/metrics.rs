//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_proxy_requests_total` (counter): proxy calls by status code
//! - `relay_proxy_request_duration_seconds` (histogram): time to first
//!   response (errors) or to handing the body stream to hyper (success)
//! - `relay_online_viewers` (gauge): distinct identities currently connected
//! - `relay_realtime_connections` (gauge): open WebSocket connections

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on its own listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one proxy call outcome.
pub fn record_proxy_request(status: u16, start: Instant) {
    metrics::counter!("relay_proxy_requests_total", "status" => status.to_string()).increment(1);
    metrics::histogram!("relay_proxy_request_duration_seconds")
        .record(start.elapsed().as_secs_f64());
}

/// Update the unique-viewer gauge.
pub fn set_online_viewers(count: usize) {
    metrics::gauge!("relay_online_viewers").set(count as f64);
}

/// One more open realtime connection.
pub fn inc_realtime_connections() {
    metrics::gauge!("relay_realtime_connections").increment(1.0);
}

/// One fewer open realtime connection.
pub fn dec_realtime_connections() {
    metrics::gauge!("relay_realtime_connections").decrement(1.0);
}
