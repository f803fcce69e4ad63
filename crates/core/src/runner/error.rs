//! Error types for starting runs.

use thiserror::Error;

use crate::job::Category;

/// Reasons a run is rejected before any job executes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunError {
    /// A run in this category is still executing.
    #[error("A {category} run is already in progress")]
    AlreadyRunning { category: Category },

    /// No jobs were submitted.
    #[error("Nothing to convert: the selection is empty")]
    SelectionEmpty,
}

impl RunError {
    pub fn already_running(category: Category) -> Self {
        Self::AlreadyRunning { category }
    }
}
