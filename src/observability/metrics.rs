//! Runtime metrics.
//!
//! # Metrics
//! - `module_actions_total` (counter): inbound actions dispatched, by action
//! - `module_heartbeats_total` (counter): heartbeat ticks, by outcome
//! - `module_log_records_dropped_total` (counter): records a sink dropped
//! - `module_connect_attempts_total` (counter): broker connects, by outcome
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - The Prometheus exporter is opt-in (binary only)

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => {
            describe();
            tracing::info!(address = %addr, "Metrics exporter listening");
        }
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

fn describe() {
    metrics::describe_counter!("module_actions_total", "Inbound actions dispatched");
    metrics::describe_counter!("module_heartbeats_total", "Heartbeat ticks by outcome");
    metrics::describe_counter!("module_log_records_dropped_total", "Log records dropped by a sink");
    metrics::describe_counter!("module_connect_attempts_total", "Broker connect attempts by outcome");
}

pub fn record_action(action: &str) {
    metrics::counter!("module_actions_total", "action" => action.to_string()).increment(1);
}

pub fn record_heartbeat(outcome: &'static str) {
    metrics::counter!("module_heartbeats_total", "outcome" => outcome).increment(1);
}

pub fn record_log_dropped(sink: &str) {
    metrics::counter!("module_log_records_dropped_total", "sink" => sink.to_string()).increment(1);
}

pub fn record_connect_attempt(success: bool) {
    let outcome = if success { "ok" } else { "error" };
    metrics::counter!("module_connect_attempts_total", "outcome" => outcome).increment(1);
}
