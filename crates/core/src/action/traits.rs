//! Trait definitions for the action module.

use async_trait::async_trait;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::error::ActionError;
use super::types::ActionOutput;
use crate::job::ConversionJob;
use crate::progress::{report_isolated, ProgressEvent, ProgressReporter};

/// Performs one conversion job.
///
/// The runner calls `execute` at most once per job and never concurrently
/// on the same run.
#[async_trait]
pub trait ConversionAction: Send + Sync {
    /// Returns the name of this action implementation.
    fn name(&self) -> &str;

    /// Whether `execute` reports fractional progress through the context.
    fn reports_progress(&self) -> bool {
        false
    }

    /// Whether a running `execute` reacts to cancellation before it finishes.
    fn is_interruptible(&self) -> bool {
        false
    }

    /// Checks that the action is ready, e.g. that its engine binary exists.
    async fn validate(&self) -> Result<(), ActionError> {
        Ok(())
    }

    /// Converts `job.source_path` into `output_path`.
    ///
    /// `output_path` has already been resolved and claimed for this run.
    async fn execute(
        &self,
        job: &ConversionJob,
        output_path: &Path,
        ctx: &ActionContext,
    ) -> Result<ActionOutput, ActionError>;
}

/// Per-job handle passed to an action: the run's cancel token and a
/// throttled progress channel.
#[derive(Clone)]
pub struct ActionContext {
    cancel: CancellationToken,
    progress: Option<Arc<ProgressSink>>,
}

struct ProgressSink {
    reporter: Arc<dyn ProgressReporter>,
    run_id: Uuid,
    index: usize,
    interval: Duration,
    last: Mutex<Option<(Instant, f32)>>,
}

impl ActionContext {
    /// Creates a context that drops progress reports.
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            progress: None,
        }
    }

    /// Routes progress reports to `reporter` as `JobProgress` events.
    pub fn with_progress(
        mut self,
        reporter: Arc<dyn ProgressReporter>,
        run_id: Uuid,
        index: usize,
        interval: Duration,
    ) -> Self {
        self.progress = Some(Arc::new(ProgressSink {
            reporter,
            run_id,
            index,
            interval,
            last: Mutex::new(None),
        }));
        self
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Reports the fraction of the job done.
    ///
    /// Values are clamped to `0.0..=1.0`. Reports that go backwards or arrive
    /// faster than the configured interval are dropped, except completion.
    pub fn report_progress(&self, fraction: f32) {
        let Some(sink) = &self.progress else {
            return;
        };
        if !fraction.is_finite() {
            return;
        }
        let fraction = fraction.clamp(0.0, 1.0);

        {
            let Ok(mut last) = sink.last.lock() else {
                return;
            };
            if let Some((at, previous)) = *last {
                if fraction <= previous {
                    return;
                }
                if fraction < 1.0 && at.elapsed() < sink.interval {
                    return;
                }
            }
            *last = Some((Instant::now(), fraction));
        }

        report_isolated(
            sink.reporter.as_ref(),
            ProgressEvent::JobProgress {
                run_id: sink.run_id,
                index: sink.index,
                fraction,
            },
        );
    }
}

impl std::fmt::Debug for ActionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionContext")
            .field("cancelled", &self.cancel.is_cancelled())
            .field("reports_progress", &self.progress.is_some())
            .finish()
    }
}
