//! Per-category run slots.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::action::{select_action, ActionsConfig, ConversionAction};
use crate::job::{Category, ConversionJob};
use crate::progress::ProgressReporter;
use crate::runner::{BatchRunner, RunError, RunHandle, RunStatus, RunnerConfig};

use super::error::CoordinatorError;

/// Owns one [`BatchRunner`] per category.
///
/// Runs in different categories proceed concurrently; within a category at
/// most one run is active at a time.
pub struct RunCoordinator {
    runner_config: RunnerConfig,
    actions_config: ActionsConfig,
    runners: RwLock<HashMap<Category, Arc<BatchRunner>>>,
}

impl RunCoordinator {
    pub fn new(runner_config: RunnerConfig, actions_config: ActionsConfig) -> Self {
        Self {
            runner_config,
            actions_config,
            runners: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the category's runner, creating it on first use.
    pub async fn get_or_create_run(&self, category: Category) -> Arc<BatchRunner> {
        if let Some(runner) = self.runners.read().await.get(&category) {
            return Arc::clone(runner);
        }

        let mut runners = self.runners.write().await;
        let runner = runners.entry(category).or_insert_with(|| {
            debug!(category = %category, "Creating runner");
            Arc::new(BatchRunner::new(category, self.runner_config.clone()))
        });
        Arc::clone(runner)
    }

    /// Starts a run with the built-in action for `category`.
    ///
    /// The action's engine is validated before the run starts.
    pub async fn start(
        &self,
        category: Category,
        jobs: Vec<ConversionJob>,
        reporter: Arc<dyn ProgressReporter>,
    ) -> Result<RunHandle, CoordinatorError> {
        let runner = self.get_or_create_run(category).await;
        if runner.status().await.is_active() {
            return Err(RunError::already_running(category).into());
        }
        let action = select_action(category, &self.actions_config).await?;
        self.start_on(&runner, jobs, Arc::new(action), reporter).await
    }

    /// Starts a run with a caller-supplied action.
    pub async fn start_with_action(
        &self,
        category: Category,
        jobs: Vec<ConversionJob>,
        action: Arc<dyn ConversionAction>,
        reporter: Arc<dyn ProgressReporter>,
    ) -> Result<RunHandle, CoordinatorError> {
        let runner = self.get_or_create_run(category).await;
        self.start_on(&runner, jobs, action, reporter).await
    }

    async fn start_on(
        &self,
        runner: &BatchRunner,
        jobs: Vec<ConversionJob>,
        action: Arc<dyn ConversionAction>,
        reporter: Arc<dyn ProgressReporter>,
    ) -> Result<RunHandle, CoordinatorError> {
        let jobs_count = jobs.len();
        let handle = runner.start(jobs, action, reporter).await?;
        info!(
            category = %runner.category(),
            run_id = %handle.id(),
            jobs = jobs_count,
            "Run started"
        );
        Ok(handle)
    }

    /// Requests cancellation of the category's active run.
    ///
    /// Returns `false` when nothing was running.
    pub async fn cancel(&self, category: Category) -> bool {
        let runner = self.runners.read().await.get(&category).cloned();
        match runner {
            Some(runner) => runner.cancel().await,
            None => false,
        }
    }

    /// Requests cancellation of every active run.
    pub async fn cancel_all(&self) -> usize {
        let runners: Vec<_> = self.runners.read().await.values().cloned().collect();
        let mut cancelled = 0;
        for runner in runners {
            if runner.cancel().await {
                cancelled += 1;
            }
        }
        cancelled
    }

    /// Status of the category's most recent run.
    pub async fn status(&self, category: Category) -> RunStatus {
        let runner = self.runners.read().await.get(&category).cloned();
        match runner {
            Some(runner) => runner.status().await,
            None => RunStatus::Idle,
        }
    }

    /// Categories with a run currently executing, in a stable order.
    pub async fn active_categories(&self) -> Vec<Category> {
        let runners: Vec<_> = self.runners.read().await.values().cloned().collect();
        let mut active = Vec::new();
        for runner in runners {
            if runner.status().await.is_active() {
                active.push(runner.category());
            }
        }
        active.sort_by_key(|c| c.as_str());
        active
    }
}

impl Default for RunCoordinator {
    fn default() -> Self {
        Self::new(RunnerConfig::default(), ActionsConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::FfmpegConfig;
    use crate::testing::{fixtures, MockAction, RecordingReporter};
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_get_or_create_returns_same_runner() {
        let coordinator = RunCoordinator::default();
        let a = coordinator.get_or_create_run(Category::Video).await;
        let b = coordinator.get_or_create_run(Category::Video).await;
        let c = coordinator.get_or_create_run(Category::Audio).await;

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[tokio::test]
    async fn test_status_idle_for_unknown_category() {
        let coordinator = RunCoordinator::default();
        assert_eq!(coordinator.status(Category::Document).await, RunStatus::Idle);
        assert!(!coordinator.cancel(Category::Document).await);
        assert!(coordinator.active_categories().await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_engine_fails_before_run() {
        let temp = TempDir::new().unwrap();
        let config = ActionsConfig::default().with_ffmpeg(FfmpegConfig::with_paths(
            PathBuf::from("/nonexistent/ffmpeg"),
            PathBuf::from("/nonexistent/ffprobe"),
        ));
        let coordinator = RunCoordinator::new(RunnerConfig::default(), config);
        let jobs = fixtures::jobs(temp.path(), &["a.wav"], "mp3");

        let err = coordinator
            .start(Category::Audio, jobs, Arc::new(RecordingReporter::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, CoordinatorError::Action(_)));
        assert_eq!(coordinator.status(Category::Audio).await, RunStatus::Idle);
    }

    #[tokio::test]
    async fn test_second_start_rejected_while_active() {
        let temp = TempDir::new().unwrap();
        let coordinator = RunCoordinator::default();
        let action = Arc::new(MockAction::new().hold_until_cancelled());
        let reporter = Arc::new(RecordingReporter::new());

        let handle = coordinator
            .start_with_action(
                Category::Image,
                fixtures::jobs(temp.path(), &["a.png"], "jpg"),
                action.clone(),
                reporter.clone(),
            )
            .await
            .unwrap();

        let err = coordinator
            .start_with_action(
                Category::Image,
                fixtures::jobs(temp.path(), &["b.png"], "jpg"),
                action.clone(),
                reporter.clone(),
            )
            .await
            .unwrap_err();
        assert!(err.is_already_running());
        assert_eq!(coordinator.active_categories().await, vec![Category::Image]);

        assert!(coordinator.cancel(Category::Image).await);
        let summary = handle.wait().await;
        assert_eq!(summary.status, RunStatus::Cancelled);
        assert!(coordinator.active_categories().await.is_empty());
    }
}
