//! Batch execution.
//!
//! A [`BatchRunner`] executes the jobs of one run strictly in order on a
//! background task, reporting each step to a
//! [`ProgressReporter`](crate::progress::ProgressReporter). Per-job failures
//! are recorded and never stop the run. Cancellation is cooperative: the
//! in-flight job is interrupted when its action allows it, and no further
//! job is started.

mod batch;
mod config;
mod effects;
mod error;
mod types;

pub use batch::{BatchRunner, RunHandle};
pub use config::RunnerConfig;
pub use error::RunError;
pub use types::{
    BatchRun, BatchSummary, FirstError, JobErrorKind, JobOutcome, JobResult, RunStatus,
};
