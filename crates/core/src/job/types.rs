//! Core job types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

use super::category::normalize_extension;
use super::options::JobOptions;

/// Errors surfaced before any job of a batch runs.
#[derive(Debug, Error)]
pub enum JobSetError {
    /// The selection produced no candidate jobs.
    #[error("Selection contains no supported files")]
    SelectionEmpty,

    /// A target format string could not be parsed.
    #[error("Invalid target format: {0:?}")]
    InvalidFormat(String),
}

/// Output format of a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TargetFormat {
    /// Re-save or copy in the source's own format.
    KeepOriginal,
    /// A lowercase extension such as `png` or `mp3`.
    Format(String),
}

impl TargetFormat {
    /// Creates a concrete format, normalising case and aliases.
    pub fn format(extension: impl AsRef<str>) -> Self {
        let ext = normalize_extension(extension.as_ref());
        let ext = match ext.as_str() {
            "jpeg" | "jfif" => "jpg".to_string(),
            "tif" => "tiff".to_string(),
            _ => ext,
        };
        Self::Format(ext)
    }

    pub fn is_keep_original(&self) -> bool {
        matches!(self, Self::KeepOriginal)
    }

    /// Extension of the output file for a given source, without a dot.
    ///
    /// Returns `None` when keeping the original format of a source without
    /// an extension.
    pub fn extension_for(&self, source: &Path) -> Option<String> {
        match self {
            Self::KeepOriginal => source
                .extension()
                .map(|e| e.to_string_lossy().to_string())
                .filter(|e| !e.is_empty()),
            Self::Format(ext) => Some(ext.clone()),
        }
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeepOriginal => f.write_str("original"),
            Self::Format(ext) => f.write_str(ext),
        }
    }
}

impl FromStr for TargetFormat {
    type Err = JobSetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "original" | "keep" | "keep_original" => Ok(Self::KeepOriginal),
            "" => Err(JobSetError::InvalidFormat(s.to_string())),
            other if other.contains(['/', '\\', ' ']) => {
                Err(JobSetError::InvalidFormat(s.to_string()))
            }
            other => Ok(Self::format(other)),
        }
    }
}

impl TryFrom<String> for TargetFormat {
    type Error = JobSetError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TargetFormat> for String {
    fn from(value: TargetFormat) -> Self {
        value.to_string()
    }
}

/// Where a job's output lands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "path", rename_all = "snake_case")]
pub enum OutputPolicy {
    /// Next to the source file.
    Mirror,
    /// Into one directory, created on demand.
    FixedDirectory(PathBuf),
}

/// One source-file-to-output conversion request.
///
/// Created once at batch start and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionJob {
    pub source_path: PathBuf,
    pub target_format: TargetFormat,
    #[serde(default)]
    pub options: JobOptions,
    pub output_policy: OutputPolicy,
}

impl ConversionJob {
    pub fn new(
        source_path: impl Into<PathBuf>,
        target_format: TargetFormat,
        output_policy: OutputPolicy,
    ) -> Self {
        Self {
            source_path: source_path.into(),
            target_format,
            options: JobOptions::default(),
            output_policy,
        }
    }

    pub fn with_options(mut self, options: JobOptions) -> Self {
        self.options = options;
        self
    }

    /// Source file name for display purposes.
    pub fn file_name(&self) -> String {
        self.source_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// Settings shared by every job of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobTemplate {
    pub target_format: TargetFormat,
    #[serde(default)]
    pub options: JobOptions,
    pub output_policy: OutputPolicy,
}

impl JobTemplate {
    pub fn new(target_format: TargetFormat, output_policy: OutputPolicy) -> Self {
        Self {
            target_format,
            options: JobOptions::default(),
            output_policy,
        }
    }

    pub fn with_options(mut self, options: JobOptions) -> Self {
        self.options = options;
        self
    }

    /// Turns a built job set into jobs, keeping its order.
    pub fn instantiate(&self, sources: Vec<PathBuf>) -> Result<Vec<ConversionJob>, JobSetError> {
        if sources.is_empty() {
            return Err(JobSetError::SelectionEmpty);
        }

        Ok(sources
            .into_iter()
            .map(|source_path| ConversionJob {
                source_path,
                target_format: self.target_format.clone(),
                options: self.options.clone(),
                output_policy: self.output_policy.clone(),
            })
            .collect())
    }
}
