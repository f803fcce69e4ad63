//! Progress sinks.

use std::panic::{self, AssertUnwindSafe};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::types::ProgressEvent;
use crate::runner::JobOutcome;

/// A sink for run events.
///
/// Called from the run's own task, in event order. Implementations must not
/// block; a UI layer marshals events onto its own thread.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

impl<F> ProgressReporter for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn report(&self, event: ProgressEvent) {
        self(event)
    }
}

/// Delivers `event` to `reporter`, containing a panic inside the reporter.
///
/// Returns `false` when the reporter panicked.
pub fn report_isolated(reporter: &dyn ProgressReporter, event: ProgressEvent) -> bool {
    let kind = event.kind();
    match panic::catch_unwind(AssertUnwindSafe(|| reporter.report(event))) {
        Ok(()) => true,
        Err(_) => {
            error!(event = kind, "Progress reporter panicked, event dropped");
            false
        }
    }
}

/// Forwards events over an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelReporter {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelReporter {
    /// Creates a reporter and the receiving end of its channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn from_sender(tx: mpsc::UnboundedSender<ProgressEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressReporter for ChannelReporter {
    fn report(&self, event: ProgressEvent) {
        // A dropped receiver only means nobody is watching.
        let _ = self.tx.send(event);
    }
}

/// Writes events to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl ProgressReporter for TracingReporter {
    fn report(&self, event: ProgressEvent) {
        match &event {
            ProgressEvent::JobStarted {
                run_id,
                index,
                source_path,
            } => debug!(%run_id, index, source = %source_path.display(), "Job started"),
            ProgressEvent::JobProgress {
                run_id,
                index,
                fraction,
            } => debug!(%run_id, index, fraction, "Job progress"),
            ProgressEvent::JobFinished {
                run_id,
                index,
                source_path,
                outcome,
            } => match outcome {
                JobOutcome::Succeeded { output_path } => info!(
                    %run_id,
                    index,
                    source = %source_path.display(),
                    output = %output_path.display(),
                    "Job succeeded"
                ),
                JobOutcome::Failed { kind, message } => warn!(
                    %run_id,
                    index,
                    source = %source_path.display(),
                    ?kind,
                    error = %message,
                    "Job failed"
                ),
                JobOutcome::Skipped => debug!(%run_id, index, "Job skipped"),
            },
            ProgressEvent::BatchProgress {
                run_id,
                completed,
                total,
            } => debug!(%run_id, completed, total, "Batch progress"),
            ProgressEvent::BatchFinished { summary } => info!(
                run_id = %summary.run_id,
                category = %summary.category,
                status = ?summary.status,
                total = summary.total,
                succeeded = summary.succeeded,
                failed = summary.failed,
                cancelled = summary.cancelled,
                "Batch finished"
            ),
        }
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl ProgressReporter for NullReporter {
    fn report(&self, _event: ProgressEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use uuid::Uuid;

    #[tokio::test]
    async fn test_channel_reporter_preserves_order() {
        let (reporter, mut rx) = ChannelReporter::new();
        for completed in 1..=3 {
            reporter.report(ProgressEvent::BatchProgress {
                run_id: Uuid::nil(),
                completed,
                total: 3,
            });
        }
        drop(reporter);

        let mut seen = Vec::new();
        while let Some(ProgressEvent::BatchProgress { completed, .. }) = rx.recv().await {
            seen.push(completed);
        }
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[test]
    fn test_closure_reporter() {
        let count = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&count);
        let reporter = move |_event: ProgressEvent| {
            *counter.lock().unwrap() += 1;
        };
        reporter.report(ProgressEvent::JobProgress {
            run_id: Uuid::nil(),
            index: 0,
            fraction: 1.0,
        });
        assert_eq!(*count.lock().unwrap(), 1);
    }

    #[test]
    fn test_report_isolated_contains_panic() {
        struct Broken;
        impl ProgressReporter for Broken {
            fn report(&self, _event: ProgressEvent) {
                panic!("reporter bug");
            }
        }

        let delivered = report_isolated(
            &Broken,
            ProgressEvent::JobProgress {
                run_id: Uuid::nil(),
                index: 0,
                fraction: 0.5,
            },
        );
        assert!(!delivered);

        assert!(report_isolated(
            &NullReporter,
            ProgressEvent::BatchProgress {
                run_id: Uuid::nil(),
                completed: 1,
                total: 1,
            },
        ));
    }

    #[test]
    fn test_reporting_after_receiver_dropped_is_harmless() {
        let (reporter, rx) = ChannelReporter::new();
        drop(rx);
        reporter.report(ProgressEvent::JobProgress {
            run_id: Uuid::nil(),
            index: 0,
            fraction: 0.0,
        });
    }
}
