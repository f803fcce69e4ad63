//! Progress reporter that records events for assertions.

use std::sync::Mutex;

use crate::progress::{ProgressEvent, ProgressReporter};
use crate::runner::BatchSummary;

/// Collects every reported event in order.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded events.
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Event kinds in order, e.g. `["job_started", "job_progress", ...]`.
    pub fn kinds(&self) -> Vec<&'static str> {
        self.events().iter().map(ProgressEvent::kind).collect()
    }

    /// Number of events of one kind.
    pub fn count(&self, kind: &str) -> usize {
        self.events().iter().filter(|e| e.kind() == kind).count()
    }

    /// Indices of `JobFinished` events, in emission order.
    pub fn finished_indices(&self) -> Vec<usize> {
        self.events()
            .iter()
            .filter_map(|e| match e {
                ProgressEvent::JobFinished { index, .. } => Some(*index),
                _ => None,
            })
            .collect()
    }

    /// Progress fractions reported for job `index`.
    pub fn progress_for(&self, job_index: usize) -> Vec<f32> {
        self.events()
            .iter()
            .filter_map(|e| match e {
                ProgressEvent::JobProgress {
                    index, fraction, ..
                } if *index == job_index => Some(*fraction),
                _ => None,
            })
            .collect()
    }

    /// Summary carried by the `BatchFinished` event, if emitted.
    pub fn summary(&self) -> Option<BatchSummary> {
        self.events().into_iter().find_map(|e| match e {
            ProgressEvent::BatchFinished { summary } => Some(summary),
            _ => None,
        })
    }
}

impl ProgressReporter for RecordingReporter {
    fn report(&self, event: ProgressEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
