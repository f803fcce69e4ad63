//! Batch runner implementation.

use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{watch, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::action::{ActionContext, ConversionAction};
use crate::job::{Category, ConversionJob};
use crate::metrics;
use crate::progress::{report_isolated, ProgressEvent, ProgressReporter};
use crate::resolver::{PathAllocationSet, PathResolver};

use super::config::RunnerConfig;
use super::effects::apply_after_success;
use super::error::RunError;
use super::types::{BatchRun, BatchSummary, JobErrorKind, JobOutcome, JobResult, RunStatus};

/// Executes batch runs for one category, one run at a time.
pub struct BatchRunner {
    category: Category,
    config: RunnerConfig,
    current: RwLock<Option<RunHandle>>,
}

impl BatchRunner {
    /// Creates an idle runner.
    pub fn new(category: Category, config: RunnerConfig) -> Self {
        Self {
            category,
            config,
            current: RwLock::new(None),
        }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    /// Handle of the most recent run, if any.
    pub async fn current(&self) -> Option<RunHandle> {
        self.current.read().await.clone()
    }

    /// Status of the most recent run, `Idle` if none was started.
    pub async fn status(&self) -> RunStatus {
        self.current
            .read()
            .await
            .as_ref()
            .map(RunHandle::status)
            .unwrap_or(RunStatus::Idle)
    }

    /// Starts a run over `jobs` on a background task.
    ///
    /// Rejected while a previous run is still executing, or when `jobs` is
    /// empty. Returns immediately.
    pub async fn start(
        &self,
        jobs: Vec<ConversionJob>,
        action: Arc<dyn ConversionAction>,
        reporter: Arc<dyn ProgressReporter>,
    ) -> Result<RunHandle, RunError> {
        let mut current = self.current.write().await;
        if current.as_ref().is_some_and(|h| h.status().is_active()) {
            warn!(category = %self.category, "Start rejected, run already in progress");
            return Err(RunError::already_running(self.category));
        }
        if jobs.is_empty() {
            return Err(RunError::SelectionEmpty);
        }

        let run_id = Uuid::new_v4();
        let token = CancellationToken::new();
        let state = Arc::new(RwLock::new(BatchRun::new(run_id, self.category, jobs.clone())));
        let (status_tx, status_rx) = watch::channel(RunStatus::Running);

        let handle = RunHandle {
            id: run_id,
            category: self.category,
            token: token.clone(),
            state: Arc::clone(&state),
            status_rx,
        };
        *current = Some(handle.clone());

        let task = RunTask {
            run_id,
            category: self.category,
            config: self.config.clone(),
            jobs,
            action,
            reporter,
            token,
            state,
            status_tx,
        };
        tokio::spawn(task.run());

        Ok(handle)
    }

    /// Requests cancellation of the current run. Returns whether a run was active.
    pub async fn cancel(&self) -> bool {
        match self.current.read().await.as_ref() {
            Some(handle) if handle.status().is_active() => {
                handle.cancel();
                true
            }
            _ => false,
        }
    }
}

/// Caller-side handle to a started run.
#[derive(Debug, Clone)]
pub struct RunHandle {
    id: Uuid,
    category: Category,
    token: CancellationToken,
    state: Arc<RwLock<BatchRun>>,
    status_rx: watch::Receiver<RunStatus>,
}

impl RunHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn category(&self) -> Category {
        self.category
    }

    /// Requests cancellation. Idempotent, never blocks.
    ///
    /// The job in flight is interrupted if its action supports it; no
    /// further job is started.
    pub fn cancel(&self) {
        if !self.token.is_cancelled() {
            info!(run_id = %self.id, category = %self.category, "Cancellation requested");
        }
        self.token.cancel();
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn status(&self) -> RunStatus {
        let status = *self.status_rx.borrow();
        if status.is_terminal() {
            return status;
        }
        if self.status_rx.has_changed().is_err() {
            // The run task is gone without reporting a final status.
            return RunStatus::Cancelled;
        }
        if self.token.is_cancelled() {
            RunStatus::Cancelling
        } else {
            status
        }
    }

    /// A copy of the run's current state.
    pub async fn snapshot(&self) -> BatchRun {
        let mut run = self.state.read().await.clone();
        run.cancel_requested = self.token.is_cancelled();
        if run.status == RunStatus::Running && run.cancel_requested {
            run.status = RunStatus::Cancelling;
        }
        run
    }

    /// Waits for the run to reach a terminal state and returns its summary.
    pub async fn wait(&self) -> BatchSummary {
        let mut rx = self.status_rx.clone();
        let aborted = rx.wait_for(RunStatus::is_terminal).await.is_err();
        let mut summary = self.state.read().await.summary();
        if aborted {
            warn!(run_id = %self.id, "Run task ended without reporting a final status");
            summary.status = RunStatus::Cancelled;
        }
        summary
    }
}

/// Everything the background loop owns.
struct RunTask {
    run_id: Uuid,
    category: Category,
    config: RunnerConfig,
    jobs: Vec<ConversionJob>,
    action: Arc<dyn ConversionAction>,
    reporter: Arc<dyn ProgressReporter>,
    token: CancellationToken,
    state: Arc<RwLock<BatchRun>>,
    status_tx: watch::Sender<RunStatus>,
}

impl RunTask {
    async fn run(self) {
        let category = self.category.as_str();
        let total = self.jobs.len();
        let resolver = PathResolver::today();
        let mut ledger = PathAllocationSet::new();

        let _active = ActiveRun::enter(category);
        info!(
            run_id = %self.run_id,
            category,
            total,
            action = self.action.name(),
            interruptible = self.action.is_interruptible(),
            "Batch run started"
        );

        for (index, job) in self.jobs.iter().enumerate() {
            if self.token.is_cancelled() {
                let remaining = total - index;
                info!(run_id = %self.run_id, remaining, "Run cancelled, skipping remaining jobs");
                metrics::JOBS_SKIPPED
                    .with_label_values(&[category])
                    .inc_by(remaining as u64);
                break;
            }

            self.report(ProgressEvent::JobStarted {
                run_id: self.run_id,
                index,
                source_path: job.source_path.clone(),
            });

            let started = Instant::now();
            let outcome = self.run_job(index, job, &resolver, &mut ledger).await;
            let elapsed = started.elapsed();

            metrics::JOBS_TOTAL
                .with_label_values(&[category, outcome.as_str()])
                .inc();
            metrics::JOB_DURATION
                .with_label_values(&[category])
                .observe(elapsed.as_secs_f64());

            {
                let mut run = self.state.write().await;
                run.results.push(JobResult {
                    index,
                    source_path: job.source_path.clone(),
                    outcome: outcome.clone(),
                    duration_ms: elapsed.as_millis() as u64,
                });
                run.cursor = index + 1;
            }

            self.report(ProgressEvent::JobFinished {
                run_id: self.run_id,
                index,
                source_path: job.source_path.clone(),
                outcome,
            });
            self.report(ProgressEvent::BatchProgress {
                run_id: self.run_id,
                completed: index + 1,
                total,
            });
        }

        let status = if self.token.is_cancelled() {
            RunStatus::Cancelled
        } else {
            RunStatus::Completed
        };
        let summary = {
            let mut run = self.state.write().await;
            run.status = status;
            run.cancel_requested = self.token.is_cancelled();
            run.finished_at = Some(chrono::Utc::now());
            run.summary()
        };

        metrics::RUNS_TOTAL
            .with_label_values(&[category, status.as_str()])
            .inc();
        info!(
            run_id = %self.run_id,
            category,
            %status,
            succeeded = summary.succeeded,
            failed = summary.failed,
            cancelled = summary.cancelled,
            "Batch run finished"
        );

        self.report(ProgressEvent::BatchFinished { summary });
        self.status_tx.send_replace(status);
    }

    fn report(&self, event: ProgressEvent) {
        report_isolated(self.reporter.as_ref(), event);
    }

    /// Resolves, converts and post-processes one job. Never fails the run.
    async fn run_job(
        &self,
        index: usize,
        job: &ConversionJob,
        resolver: &PathResolver,
        ledger: &mut PathAllocationSet,
    ) -> JobOutcome {
        let output_path = match resolver.resolve(job, index + 1, ledger) {
            Ok(path) => path,
            Err(e) => {
                warn!(run_id = %self.run_id, index, error = %e, "Output path unavailable");
                return JobOutcome::failed(JobErrorKind::OutputUnavailable, error_chain(&e));
            }
        };
        debug!(
            run_id = %self.run_id,
            index,
            source = %job.source_path.display(),
            output = %output_path.display(),
            "Converting"
        );

        let ctx = ActionContext::new(self.token.clone()).with_progress(
            Arc::clone(&self.reporter),
            self.run_id,
            index,
            self.config.progress_interval(),
        );
        let coarse = !self.action.reports_progress();
        if coarse {
            ctx.report_progress(0.0);
        }

        let result = AssertUnwindSafe(self.action.execute(job, &output_path, &ctx))
            .catch_unwind()
            .await;

        match result {
            Ok(Ok(output)) => {
                if coarse {
                    ctx.report_progress(1.0);
                }
                apply_after_success(job, &output.output_path).await;
                JobOutcome::Succeeded {
                    output_path: output.output_path,
                }
            }
            Ok(Err(e)) => {
                if e.is_cancelled() {
                    info!(run_id = %self.run_id, index, "In-flight job interrupted");
                } else {
                    warn!(
                        run_id = %self.run_id,
                        index,
                        source = %job.source_path.display(),
                        error = %e,
                        "Job failed"
                    );
                }
                JobOutcome::failed(JobErrorKind::ActionFailed, e.user_message())
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(run_id = %self.run_id, index, %message, "Conversion action panicked");
                JobOutcome::failed(
                    JobErrorKind::ActionFailed,
                    format!("Conversion action panicked: {}", message),
                )
            }
        }
    }
}

/// Holds the category's `RUNS_ACTIVE` gauge up while the run task lives.
struct ActiveRun {
    category: &'static str,
}

impl ActiveRun {
    fn enter(category: &'static str) -> Self {
        metrics::RUNS_ACTIVE.with_label_values(&[category]).inc();
        Self { category }
    }
}

impl Drop for ActiveRun {
    fn drop(&mut self) {
        metrics::RUNS_ACTIVE.with_label_values(&[self.category]).dec();
    }
}

/// Formats an error with its sources, outermost first.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{OutputPolicy, TargetFormat};
    use crate::resolver::ResolveError;
    use crate::testing::{MockAction, RecordingReporter};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn jobs(dir: &std::path::Path, names: &[&str]) -> Vec<ConversionJob> {
        names
            .iter()
            .map(|name| {
                let source = dir.join(name);
                std::fs::write(&source, name.as_bytes()).unwrap();
                ConversionJob::new(source, TargetFormat::format("out"), OutputPolicy::Mirror)
            })
            .collect()
    }

    #[tokio::test]
    async fn test_runs_all_jobs_in_order() {
        let temp = TempDir::new().unwrap();
        let runner = BatchRunner::new(Category::Image, RunnerConfig::default());
        let reporter = Arc::new(RecordingReporter::new());
        let action = Arc::new(MockAction::new());

        let handle = runner
            .start(jobs(temp.path(), &["a.png", "b.png", "c.png"]), action.clone(), reporter.clone())
            .await
            .unwrap();
        let summary = handle.wait().await;

        assert_eq!(summary.status, RunStatus::Completed);
        assert_eq!(summary.succeeded, 3);
        assert_eq!(
            summary.produced_paths,
            vec![
                temp.path().join("a.out"),
                temp.path().join("b.out"),
                temp.path().join("c.out"),
            ]
        );
        assert_eq!(action.executed_names(), vec!["a.png", "b.png", "c.png"]);
        assert_eq!(reporter.finished_indices(), vec![0, 1, 2]);
        assert_eq!(runner.status().await, RunStatus::Completed);
    }

    #[tokio::test]
    async fn test_empty_selection_is_rejected() {
        let runner = BatchRunner::new(Category::Audio, RunnerConfig::default());
        let err = runner
            .start(Vec::new(), Arc::new(MockAction::new()), Arc::new(RecordingReporter::new()))
            .await
            .unwrap_err();
        assert_eq!(err, RunError::SelectionEmpty);
        assert_eq!(runner.status().await, RunStatus::Idle);
    }

    #[tokio::test]
    async fn test_panicking_action_is_recorded_as_failure() {
        let temp = TempDir::new().unwrap();
        let runner = BatchRunner::new(Category::Image, RunnerConfig::default());
        let action = Arc::new(MockAction::new().panic_on("bad.png"));

        let handle = runner
            .start(
                jobs(temp.path(), &["bad.png", "good.png"]),
                action,
                Arc::new(RecordingReporter::new()),
            )
            .await
            .unwrap();
        let summary = handle.wait().await;

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.succeeded, 1);
        let first = summary.first_error.unwrap();
        assert!(first.message.contains("panicked"));
        assert!(first.path.ends_with("bad.png"));
    }

    #[tokio::test]
    async fn test_unavailable_output_directory_fails_only_that_job() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("blocker");
        std::fs::write(&blocker, b"file").unwrap();

        let mut batch = jobs(temp.path(), &["a.png", "b.png"]);
        batch[0].output_policy = OutputPolicy::FixedDirectory(blocker.join("sub"));

        let runner = BatchRunner::new(Category::Image, RunnerConfig::default());
        let handle = runner
            .start(batch, Arc::new(MockAction::new()), Arc::new(RecordingReporter::new()))
            .await
            .unwrap();
        handle.wait().await;

        let run = handle.snapshot().await;
        assert!(matches!(
            &run.results[0].outcome,
            JobOutcome::Failed { kind: JobErrorKind::OutputUnavailable, .. }
        ));
        assert!(run.results[1].outcome.is_success());
    }

    struct PanicOnStart;

    impl ProgressReporter for PanicOnStart {
        fn report(&self, event: ProgressEvent) {
            if matches!(event, ProgressEvent::JobStarted { .. }) {
                panic!("reporter failed on job start");
            }
        }
    }

    #[tokio::test]
    async fn test_panicking_reporter_does_not_wedge_category() {
        let temp = TempDir::new().unwrap();
        let runner = BatchRunner::new(Category::Image, RunnerConfig::default());
        let action = Arc::new(MockAction::new());

        let handle = runner
            .start(jobs(temp.path(), &["a.png", "b.png"]), action.clone(), Arc::new(PanicOnStart))
            .await
            .unwrap();
        let summary = handle.wait().await;

        assert_eq!(summary.status, RunStatus::Completed);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(runner.status().await, RunStatus::Completed);

        let again = runner
            .start(jobs(temp.path(), &["c.png"]), action, Arc::new(RecordingReporter::new()))
            .await
            .unwrap();
        assert_eq!(again.wait().await.status, RunStatus::Completed);
    }

    #[tokio::test]
    async fn test_handle_of_vanished_task_is_terminal() {
        let (status_tx, status_rx) = watch::channel(RunStatus::Running);
        let run_id = Uuid::new_v4();
        let handle = RunHandle {
            id: run_id,
            category: Category::Video,
            token: CancellationToken::new(),
            state: Arc::new(RwLock::new(BatchRun::new(run_id, Category::Video, Vec::new()))),
            status_rx,
        };
        assert_eq!(handle.status(), RunStatus::Running);

        drop(status_tx);
        assert_eq!(handle.status(), RunStatus::Cancelled);
        assert!(!handle.status().is_active());
        assert_eq!(handle.wait().await.status, RunStatus::Cancelled);
    }

    #[test]
    fn test_error_chain_includes_sources() {
        let err = ResolveError::DirectoryUnavailable {
            path: PathBuf::from("/out"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(error_chain(&err), "Output directory unavailable: /out: denied");
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn Any + Send> = Box::new("static str");
        assert_eq!(panic_message(boxed.as_ref()), "static str");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "owned");
        let boxed: Box<dyn Any + Send> = Box::new(42);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic");
    }
}
