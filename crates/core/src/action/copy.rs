//! Copy/move action for batch renaming.

use async_trait::async_trait;
use std::path::Path;
use std::time::Instant;
use tracing::debug;

use super::error::ActionError;
use super::traits::{ActionContext, ConversionAction};
use super::types::ActionOutput;
use crate::job::{ConversionJob, TargetFormat};

/// Copies each source to its resolved path, or moves it when the job asks to.
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyAction;

impl CopyAction {
    /// Moves `source` to `output_path`, copying across filesystems.
    async fn move_file(source: &Path, output_path: &Path) -> Result<(), ActionError> {
        match tokio::fs::rename(source, output_path).await {
            Ok(()) => Ok(()),
            Err(e) => {
                debug!(
                    source = %source.display(),
                    error = %e,
                    "Rename failed, falling back to copy and remove"
                );
                tokio::fs::copy(source, output_path).await?;
                tokio::fs::remove_file(source).await?;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl ConversionAction for CopyAction {
    fn name(&self) -> &str {
        "copy"
    }

    async fn execute(
        &self,
        job: &ConversionJob,
        output_path: &Path,
        _ctx: &ActionContext,
    ) -> Result<ActionOutput, ActionError> {
        let started = Instant::now();
        if let TargetFormat::Format(ext) = &job.target_format {
            let source_ext = job
                .source_path
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase());
            if TargetFormat::format(source_ext.unwrap_or_default()) != job.target_format {
                return Err(ActionError::unsupported_format(ext.clone()));
            }
        }
        if !job.source_path.is_file() {
            return Err(ActionError::InputNotFound {
                path: job.source_path.clone(),
            });
        }

        if job.options.move_source {
            Self::move_file(&job.source_path, output_path).await?;
        } else {
            tokio::fs::copy(&job.source_path, output_path).await?;
        }

        ActionOutput::from_written(output_path, started).await
    }
}
