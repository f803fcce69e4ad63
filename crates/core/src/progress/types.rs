//! Progress event types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use crate::runner::{BatchSummary, JobOutcome};

/// An immutable event pushed by a batch run.
///
/// `index` is the 0-based position of the job in the submitted list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    JobStarted {
        run_id: Uuid,
        index: usize,
        source_path: PathBuf,
    },
    /// Fraction of the current job done, in `0.0..=1.0`.
    JobProgress {
        run_id: Uuid,
        index: usize,
        fraction: f32,
    },
    JobFinished {
        run_id: Uuid,
        index: usize,
        source_path: PathBuf,
        outcome: JobOutcome,
    },
    /// Running aggregate, emitted after every finished job.
    BatchProgress {
        run_id: Uuid,
        completed: usize,
        total: usize,
    },
    /// Emitted exactly once per run.
    BatchFinished { summary: BatchSummary },
}

impl ProgressEvent {
    pub fn run_id(&self) -> Uuid {
        match self {
            Self::JobStarted { run_id, .. }
            | Self::JobProgress { run_id, .. }
            | Self::JobFinished { run_id, .. }
            | Self::BatchProgress { run_id, .. } => *run_id,
            Self::BatchFinished { summary } => summary.run_id,
        }
    }

    /// Short event name, matching the serialized tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::JobStarted { .. } => "job_started",
            Self::JobProgress { .. } => "job_progress",
            Self::JobFinished { .. } => "job_finished",
            Self::BatchProgress { .. } => "batch_progress",
            Self::BatchFinished { .. } => "batch_finished",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = ProgressEvent::JobProgress {
            run_id: Uuid::nil(),
            index: 2,
            fraction: 0.5,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event\":\"job_progress\""));
        assert!(json.contains("\"index\":2"));
        assert_eq!(event.kind(), "job_progress");
    }

    #[test]
    fn test_job_finished_carries_outcome() {
        let event = ProgressEvent::JobFinished {
            run_id: Uuid::nil(),
            index: 0,
            source_path: PathBuf::from("/in/a.png"),
            outcome: JobOutcome::Succeeded {
                output_path: PathBuf::from("/out/a.jpg"),
            },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["outcome"]["status"], "succeeded");
        assert_eq!(event.run_id(), Uuid::nil());
    }
}
