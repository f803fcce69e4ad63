//! Types for batch runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

use crate::job::{Category, ConversionJob};

/// Lifecycle of a batch run.
///
/// `Idle -> Running -> (Cancelling) -> Completed | Cancelled`. Terminal
/// states never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Idle,
    Running,
    /// Cancel requested; the in-flight job is still unwinding.
    Cancelling,
    Completed,
    Cancelled,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Whether the run's loop is still executing.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Running | Self::Cancelling)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Cancelling => "cancelling",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of a job-scoped failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobErrorKind {
    /// Nothing to convert.
    SelectionEmpty,
    /// The output directory is missing and could not be created.
    OutputUnavailable,
    /// The conversion action reported a failure.
    ActionFailed,
    /// The job never started because the run was cancelled first.
    Cancelled,
}

/// What happened to one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobOutcome {
    Succeeded { output_path: PathBuf },
    Failed { kind: JobErrorKind, message: String },
    /// Never started because the run was cancelled first.
    Skipped,
}

impl JobOutcome {
    pub fn failed(kind: JobErrorKind, message: impl Into<String>) -> Self {
        Self::Failed {
            kind,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    pub fn output_path(&self) -> Option<&PathBuf> {
        match self {
            Self::Succeeded { output_path } => Some(output_path),
            _ => None,
        }
    }

    /// Label used for metrics and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Succeeded { .. } => "succeeded",
            Self::Failed { .. } => "failed",
            Self::Skipped => "skipped",
        }
    }
}

/// Outcome of a job that was started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    /// 0-based position in the run.
    pub index: usize,
    pub source_path: PathBuf,
    pub outcome: JobOutcome,
    pub duration_ms: u64,
}

/// The first failure of a run, for user-facing reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirstError {
    pub path: PathBuf,
    pub message: String,
}

/// Final report of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub run_id: Uuid,
    pub category: Category,
    pub status: RunStatus,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Jobs never started because of cancellation.
    pub cancelled: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_error: Option<FirstError>,
    pub produced_paths: Vec<PathBuf>,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl BatchSummary {
    pub fn is_fully_successful(&self) -> bool {
        self.status == RunStatus::Completed && self.failed == 0
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}: {}/{} succeeded",
            self.category, self.status, self.succeeded, self.total
        )?;
        if self.failed > 0 {
            write!(f, ", {} failed", self.failed)?;
        }
        if self.cancelled > 0 {
            write!(f, ", {} cancelled", self.cancelled)?;
        }
        if let Some(err) = &self.first_error {
            write!(f, ". First error: {}: {}", err.path.display(), err.message)?;
        }
        Ok(())
    }
}

/// State of one batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRun {
    pub id: Uuid,
    pub category: Category,
    pub jobs: Vec<ConversionJob>,
    pub status: RunStatus,
    /// Index of the next job to start.
    pub cursor: usize,
    /// One entry per started job, in submission order.
    pub results: Vec<JobResult>,
    pub cancel_requested: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl BatchRun {
    /// Creates a run in the `Running` state.
    pub fn new(id: Uuid, category: Category, jobs: Vec<ConversionJob>) -> Self {
        Self {
            id,
            category,
            jobs,
            status: RunStatus::Running,
            cursor: 0,
            results: Vec::new(),
            cancel_requested: false,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// One outcome per submitted job; jobs that never started are `Skipped`.
    pub fn outcomes(&self) -> Vec<JobOutcome> {
        (0..self.jobs.len())
            .map(|i| {
                self.results
                    .get(i)
                    .map(|r| r.outcome.clone())
                    .unwrap_or(JobOutcome::Skipped)
            })
            .collect()
    }

    pub fn summary(&self) -> BatchSummary {
        let mut succeeded = 0;
        let mut failed = 0;
        let mut first_error = None;
        let mut produced_paths = Vec::new();

        for result in &self.results {
            match &result.outcome {
                JobOutcome::Succeeded { output_path } => {
                    succeeded += 1;
                    produced_paths.push(output_path.clone());
                }
                JobOutcome::Failed { message, .. } => {
                    failed += 1;
                    if first_error.is_none() {
                        first_error = Some(FirstError {
                            path: result.source_path.clone(),
                            message: message.clone(),
                        });
                    }
                }
                JobOutcome::Skipped => {}
            }
        }

        BatchSummary {
            run_id: self.id,
            category: self.category,
            status: self.status,
            total: self.jobs.len(),
            succeeded,
            failed,
            cancelled: self.jobs.len() - succeeded - failed,
            first_error,
            produced_paths,
            started_at: self.started_at,
            finished_at: self.finished_at,
        }
    }
}
