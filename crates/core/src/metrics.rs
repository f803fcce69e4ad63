//! Prometheus metrics for batch runs.
//!
//! This module provides metrics for:
//! - Jobs (outcomes and durations per category)
//! - Runs (terminal status per category)
//! - Source deletions after successful conversions

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts};

// =============================================================================
// Job Metrics
// =============================================================================

/// Finished jobs by category and result.
pub static JOBS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("bambam_jobs_total", "Total finished conversion jobs"),
        &["category", "result"], // "succeeded", "failed"
    )
    .unwrap()
});

/// Job duration in seconds.
pub static JOB_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "bambam_job_duration_seconds",
            "Duration of a single conversion job",
        )
        .buckets(vec![0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 300.0, 900.0]),
        &["category"],
    )
    .unwrap()
});

/// Jobs never started because their run was cancelled.
pub static JOBS_SKIPPED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "bambam_jobs_skipped_total",
            "Jobs skipped because the run was cancelled first",
        ),
        &["category"],
    )
    .unwrap()
});

// =============================================================================
// Run Metrics
// =============================================================================

/// Finished runs by category and terminal status.
pub static RUNS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("bambam_runs_total", "Total finished batch runs"),
        &["category", "status"], // "completed", "cancelled"
    )
    .unwrap()
});

/// Runs currently looping, per category (0 or 1).
pub static RUNS_ACTIVE: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("bambam_runs_active", "Batch runs currently executing"),
        &["category"],
    )
    .unwrap()
});

// =============================================================================
// Side Effects
// =============================================================================

/// Source deletions after success by result.
pub static SOURCE_DELETIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "bambam_source_deletions_total",
            "Source files deleted after a successful conversion",
        ),
        &["result"], // "deleted", "failed"
    )
    .unwrap()
});

/// Returns all metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Jobs
        Box::new(JOBS_TOTAL.clone()),
        Box::new(JOB_DURATION.clone()),
        Box::new(JOBS_SKIPPED.clone()),
        // Runs
        Box::new(RUNS_TOTAL.clone()),
        Box::new(RUNS_ACTIVE.clone()),
        // Side effects
        Box::new(SOURCE_DELETIONS.clone()),
    ]
}
