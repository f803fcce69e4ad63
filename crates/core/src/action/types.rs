//! Types shared by conversion actions.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;

use super::error::ActionError;

/// What a successful action produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionOutput {
    /// Path of the written file.
    pub output_path: PathBuf,
    /// Size of the written file.
    pub bytes_written: u64,
    /// Wall time spent in the action.
    pub duration_ms: u64,
}

/// Media handled by the ffmpeg action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
}

impl ActionOutput {
    /// Stats a freshly written output file.
    pub async fn from_written(
        output_path: &Path,
        started: Instant,
    ) -> Result<Self, ActionError> {
        let meta = tokio::fs::metadata(output_path)
            .await
            .map_err(|_| ActionError::OutputMissing {
                path: output_path.to_path_buf(),
            })?;
        Ok(Self {
            output_path: output_path.to_path_buf(),
            bytes_written: meta.len(),
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }
}
