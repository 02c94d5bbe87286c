//! Tracing and Prometheus metrics set-up.

use metrics::describe_counter;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use thiserror::Error;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Errors from telemetry initialisation.
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// A global tracing subscriber is already installed.
    #[error("Failed to install tracing subscriber: {0}")]
    Tracing(String),
    /// The Prometheus exporter could not be installed.
    #[error("Failed to install metrics exporter: {0}")]
    Metrics(String),
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence; otherwise `default_filter` is used.
///
/// # Errors
///
/// Returns [`TelemetryError::Tracing`] if a subscriber is already installed.
pub fn init_tracing(default_filter: &str) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{default_filter},sqlx=warn,rdkafka=warn")));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| TelemetryError::Tracing(e.to_string()))
}

/// Install the Prometheus exporter with an HTTP listener on `addr`.
///
/// Must be called from within a Tokio runtime.
///
/// # Errors
///
/// Returns [`TelemetryError::Metrics`] if the listener or recorder cannot be
/// installed.
pub fn init_metrics(addr: SocketAddr) -> Result<(), TelemetryError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| TelemetryError::Metrics(e.to_string()))?;

    register_metrics();
    tracing::info!(addr = %addr, "Metrics available at http://{addr}/metrics");
    Ok(())
}

/// Register descriptions for every metric the service emits.
pub fn register_metrics() {
    describe_counter!(
        "accounts_operations_total",
        "Lifecycle operations by operation name and outcome code"
    );
    describe_counter!(
        "accounts_events_published_total",
        "Lifecycle events handed to the event bus"
    );
    describe_counter!(
        "accounts_events_failed_total",
        "Lifecycle events the event bus rejected"
    );
    describe_counter!(
        "accounts_events_dropped_total",
        "Lifecycle events dropped because the outbound queue was full or closed"
    );
    describe_counter!(
        "accounts_store_conflicts_total",
        "Account store writes rejected by a uniqueness or concurrency check"
    );
}
