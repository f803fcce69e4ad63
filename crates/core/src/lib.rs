pub mod action;
pub mod config;
pub mod coordinator;
pub mod job;
pub mod metrics;
pub mod progress;
pub mod resolver;
pub mod runner;
pub mod testing;

pub use action::{
    select_action, ActionContext, ActionError, ActionKind, ActionOutput, ActionsConfig,
    ConversionAction,
};
pub use config::{
    load_config, load_config_from_str, load_config_or_default, validate_config, Config,
    ConfigError,
};
pub use coordinator::{CoordinatorError, RunCoordinator};
pub use job::{
    build_job_set, Category, ConversionJob, JobOptions, JobSetBuilder, JobSetError, JobTemplate,
    OutputPolicy, TargetFormat,
};
pub use progress::{ProgressEvent, ProgressReporter};
pub use resolver::{PathAllocationSet, PathResolver, ResolveError};
pub use runner::{
    BatchRun, BatchRunner, BatchSummary, JobErrorKind, JobOutcome, RunError, RunHandle, RunStatus,
    RunnerConfig,
};
