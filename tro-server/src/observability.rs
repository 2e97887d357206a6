//! Prometheus metrics registration.
//!
//! The recorder is installed once at startup; the handle renders the
//! exposition text for the `/metrics` route.

use metrics::describe_counter;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and describe the core counters.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    describe_counter!("tro_holds_created_total", "Holds successfully created");
    describe_counter!("tro_orders_created_total", "Orders accepted as PENDING");
    describe_counter!(
        "tro_outbox_published_total",
        "Outbox rows acknowledged by the broker"
    );
    describe_counter!(
        "tro_outbox_failed_total",
        "Outbox rows parked as FAILED after exhausting their publish budget"
    );
    describe_counter!(
        "tro_holds_expired_total",
        "Expired holds released by the expiry worker"
    );

    Ok(handle)
}
