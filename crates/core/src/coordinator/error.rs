//! Error types for the run coordinator.

use thiserror::Error;

use crate::action::ActionError;
use crate::runner::RunError;

/// Errors raised when starting a run through the coordinator.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// The runner rejected the start.
    #[error(transparent)]
    Run(#[from] RunError),

    /// No usable conversion action for the category.
    #[error("Conversion engine unavailable: {0}")]
    Action(#[from] ActionError),
}

impl CoordinatorError {
    /// Whether the start was rejected because a run is already active.
    pub fn is_already_running(&self) -> bool {
        matches!(self, Self::Run(RunError::AlreadyRunning { .. }))
    }
}
