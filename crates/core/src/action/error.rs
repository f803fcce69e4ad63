//! Error types for conversion actions.

use std::path::PathBuf;
use thiserror::Error;

/// Errors a conversion action can report for one job.
#[derive(Debug, Error)]
pub enum ActionError {
    /// The external engine binary could not be found.
    #[error("{engine} not found at path: {path}")]
    EngineNotFound { engine: String, path: PathBuf },

    /// Input file not found.
    #[error("Input file not found: {path}")]
    InputNotFound { path: PathBuf },

    /// The action cannot produce the requested format.
    #[error("Unsupported format: {format}")]
    UnsupportedFormat { format: String },

    /// The external process exited unsuccessfully.
    #[error("Conversion failed: {reason}")]
    ProcessFailed {
        reason: String,
        stderr: Option<String>,
    },

    /// The action finished but the expected output is not on disk.
    #[error("Output file not created: {path}")]
    OutputMissing { path: PathBuf },

    /// Decoding, transforming or encoding an image failed.
    #[error("Image processing failed: {0}")]
    Image(String),

    /// I/O error during conversion.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The run was cancelled while this job was executing.
    #[error("Conversion cancelled")]
    Cancelled,
}

impl ActionError {
    /// Creates a process failure with optional stderr output.
    pub fn process_failed(reason: impl Into<String>, stderr: Option<String>) -> Self {
        Self::ProcessFailed {
            reason: reason.into(),
            stderr,
        }
    }

    pub fn engine_not_found(engine: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::EngineNotFound {
            engine: engine.into(),
            path: path.into(),
        }
    }

    pub fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    /// Message recorded in the job outcome.
    ///
    /// Process failures include the last stderr line, which is usually the
    /// one that names the problem.
    pub fn user_message(&self) -> String {
        match self {
            Self::ProcessFailed {
                reason,
                stderr: Some(stderr),
            } => match stderr.lines().rev().find(|l| !l.trim().is_empty()) {
                Some(last) => format!("Conversion failed: {}: {}", reason, last.trim()),
                None => self.to_string(),
            },
            _ => self.to_string(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<image::ImageError> for ActionError {
    fn from(e: image::ImageError) -> Self {
        match e {
            image::ImageError::IoError(io) => Self::Io(io),
            other => Self::Image(other.to_string()),
        }
    }
}
