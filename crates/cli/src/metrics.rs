//! Prometheus metrics exposition.
//!
//! Registers the core job and run metrics plus process-level counters of
//! the command line tool.

use once_cell::sync::Lazy;
use prometheus::{self, Encoder, IntCounterVec, Opts, Registry, TextEncoder};

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// Commands executed, by command and outcome.
pub static COMMANDS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("bambam_cli_commands_total", "Commands executed by the CLI"),
        &["command", "outcome"], // "ok", "failed", "cancelled"
    )
    .unwrap()
});

fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(COMMANDS_TOTAL.clone()))
        .unwrap();

    // Core metrics (jobs, runs, deletions)
    for metric in bambam_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!(error = %e, "Failed to encode metrics");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}
