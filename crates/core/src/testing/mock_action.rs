//! Mock conversion action for testing.

use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::Notify;

use crate::action::{ActionContext, ActionError, ActionOutput, ConversionAction};
use crate::job::ConversionJob;

/// A recorded execution for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedExecution {
    pub source_path: PathBuf,
    pub output_path: PathBuf,
}

/// Mock implementation of the ConversionAction trait.
///
/// Provides controllable behavior for testing:
/// - Track executed jobs for assertions
/// - Fail, panic or hold specific jobs by source file name
/// - Simulate work with a delay and fine-grained progress
///
/// Successful executions write the source bytes to the output path.
///
/// # Example
///
/// ```rust,ignore
/// use bambam_core::testing::MockAction;
///
/// let action = Arc::new(MockAction::new().fail_on("broken.png"));
/// let handle = runner.start(jobs, action.clone(), reporter).await?;
/// handle.wait().await;
///
/// assert_eq!(action.execution_count(), jobs_len);
/// ```
#[derive(Debug, Default)]
pub struct MockAction {
    fail_on: HashSet<String>,
    panic_on: HashSet<String>,
    hold_on: HashSet<String>,
    hold_all: bool,
    delay: Option<Duration>,
    progress_steps: Option<u32>,
    executions: Mutex<Vec<RecordedExecution>>,
    held: Arc<Notify>,
}

impl MockAction {
    /// Create a mock that succeeds for every job.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail jobs whose source file name is `name`.
    pub fn fail_on(mut self, name: &str) -> Self {
        self.fail_on.insert(name.to_string());
        self
    }

    /// Panic inside `execute` for jobs whose source file name is `name`.
    pub fn panic_on(mut self, name: &str) -> Self {
        self.panic_on.insert(name.to_string());
        self
    }

    /// Block the job for `name` until the run is cancelled.
    pub fn hold_on(mut self, name: &str) -> Self {
        self.hold_on.insert(name.to_string());
        self
    }

    /// Block every job until the run is cancelled.
    pub fn hold_until_cancelled(mut self) -> Self {
        self.hold_all = true;
        self
    }

    /// Sleep this long per job. The sleep ends early on cancellation.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Report `steps` evenly spaced progress values per job.
    pub fn with_progress_steps(mut self, steps: u32) -> Self {
        self.progress_steps = Some(steps.max(1));
        self
    }

    /// Get all recorded executions, in call order.
    pub fn executions(&self) -> Vec<RecordedExecution> {
        self.executions
            .lock()
            .map(|e| e.clone())
            .unwrap_or_default()
    }

    /// Source file names of executed jobs, in call order.
    pub fn executed_names(&self) -> Vec<String> {
        self.executions()
            .iter()
            .filter_map(|e| e.source_path.file_name())
            .map(|n| n.to_string_lossy().to_string())
            .collect()
    }

    /// Get the number of jobs executed.
    pub fn execution_count(&self) -> usize {
        self.executions.lock().map(|e| e.len()).unwrap_or(0)
    }

    /// Waits until a job is blocked by `hold_on` or `hold_until_cancelled`.
    pub async fn wait_until_held(&self) {
        self.held.notified().await;
    }

    fn should_hold(&self, name: &str) -> bool {
        self.hold_all || self.hold_on.contains(name)
    }
}

#[async_trait]
impl ConversionAction for MockAction {
    fn name(&self) -> &str {
        "mock"
    }

    fn reports_progress(&self) -> bool {
        self.progress_steps.is_some()
    }

    fn is_interruptible(&self) -> bool {
        true
    }

    async fn execute(
        &self,
        job: &ConversionJob,
        output_path: &Path,
        ctx: &ActionContext,
    ) -> Result<ActionOutput, ActionError> {
        let started = Instant::now();
        let name = job.file_name();

        if let Ok(mut executions) = self.executions.lock() {
            executions.push(RecordedExecution {
                source_path: job.source_path.clone(),
                output_path: output_path.to_path_buf(),
            });
        }

        if self.panic_on.contains(&name) {
            panic!("mock action panic for {}", name);
        }

        if self.should_hold(&name) {
            self.held.notify_one();
            ctx.cancel_token().cancelled().await;
            return Err(ActionError::Cancelled);
        }

        if let Some(delay) = self.delay {
            tokio::select! {
                _ = ctx.cancel_token().cancelled() => return Err(ActionError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }

        if self.fail_on.contains(&name) {
            return Err(ActionError::process_failed(
                format!("mock failure for {}", name),
                Some("mock: simulated error".to_string()),
            ));
        }

        if let Some(steps) = self.progress_steps {
            for step in 1..=steps {
                ctx.report_progress(step as f32 / steps as f32);
            }
        }

        let bytes = tokio::fs::read(&job.source_path)
            .await
            .map_err(|_| ActionError::InputNotFound {
                path: job.source_path.clone(),
            })?;
        tokio::fs::write(output_path, bytes).await?;
        ActionOutput::from_written(output_path, started).await
    }
}
