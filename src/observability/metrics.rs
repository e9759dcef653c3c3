//! Metrics collection and exposition.
//!
//! # Metrics
//! - `blacklister_reports_total` (counter): handled reports by outcome
//! - `blacklister_probes_total` (counter): confirmation probes by outcome
//! - `blacklister_promotions_total` (counter): hostnames appended to the forbidden list
//! - `blacklister_forbidden_hostnames` (gauge): forbidden list length after a promotion
//! - `event_deliveries_total` (counter): handler invocations by topic and result
//!
//! Recording is a no-op until a recorder is installed, so unit tests never
//! need an exporter.

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record the outcome of one handled timeout report.
pub fn record_report(outcome: &'static str) {
    counter!("blacklister_reports_total", "outcome" => outcome).increment(1);
}

/// Record a confirmation probe outcome.
pub fn record_probe(outcome: &'static str) {
    counter!("blacklister_probes_total", "outcome" => outcome).increment(1);
}

/// Record a hostname promotion and the resulting list size.
pub fn record_promotion(list_len: usize) {
    counter!("blacklister_promotions_total").increment(1);
    gauge!("blacklister_forbidden_hostnames").set(list_len as f64);
}

/// Record one handler invocation by the event bus.
pub fn record_delivery(topic: &str, result: &'static str) {
    counter!("event_deliveries_total", "topic" => topic.to_string(), "result" => result)
        .increment(1);
}
