use std::net::SocketAddr;

use tracing_subscriber::EnvFilter;

use crate::engine::EngineError;

// ── Lifecycle counters ──────────────────────────────────────────

/// Counter: appointments created.
pub const APPOINTMENTS_CREATED_TOTAL: &str = "holdshelf_appointments_created_total";

/// Counter: approval decisions. Labels: outcome (approved/rejected).
pub const DECISIONS_TOTAL: &str = "holdshelf_decisions_total";

/// Counter: cancellations. Labels: previous (status before cancel).
pub const APPOINTMENTS_CANCELLED_TOTAL: &str = "holdshelf_appointments_cancelled_total";

/// Counter: failed lifecycle operations. Labels: op, kind.
pub const ERRORS_TOTAL: &str = "holdshelf_errors_total";

/// Counter: book joins that failed during degraded list reads.
pub const BOOK_LOOKUP_FAILURES_TOTAL: &str = "holdshelf_book_lookup_failures_total";

/// Gauge: appointments held in the store.
pub const APPOINTMENTS_STORED: &str = "holdshelf_appointments_stored";

/// Install the fmt subscriber, filtered by `RUST_LOG` (default `info`).
/// Safe to call more than once.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}

/// Count a failed operation and pass the error through.
pub(crate) fn record_error(op: &'static str, err: EngineError) -> EngineError {
    metrics::counter!(ERRORS_TOTAL, "op" => op, "kind" => err.kind().as_str()).increment(1);
    tracing::debug!(op, error = %err, "appointment operation failed");
    err
}
