//! Output path resolution.

use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

use crate::job::{ConversionJob, OutputPolicy};

use super::ledger::PathAllocationSet;
use super::pattern::{NameContext, RenamePattern};

/// Character substituted for path separators inside rendered names.
const INERT_CHAR: char = '_';

/// Errors raised while resolving an output path.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The output directory is missing and could not be created.
    #[error("Output directory unavailable: {path}")]
    DirectoryUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Computes non-colliding output paths for the jobs of one run.
#[derive(Debug, Clone)]
pub struct PathResolver {
    run_date: String,
}

impl PathResolver {
    /// Creates a resolver whose `{date}` placeholder renders `run_date`.
    pub fn new(run_date: NaiveDate) -> Self {
        Self {
            run_date: run_date.format("%Y%m%d").to_string(),
        }
    }

    /// Creates a resolver dated with the local date.
    pub fn today() -> Self {
        Self::new(chrono::Local::now().date_naive())
    }

    pub fn run_date(&self) -> &str {
        &self.run_date
    }

    /// Resolves and claims the output path for the job at `position` (1-based).
    pub fn resolve(
        &self,
        job: &ConversionJob,
        position: usize,
        ledger: &mut PathAllocationSet,
    ) -> Result<PathBuf, ResolveError> {
        let dir = Self::output_dir(job)?;
        let base = self.base_name(job, position);
        let ext = job
            .target_format
            .extension_for(&job.source_path)
            .map(|ext| sanitize_file_name(&ext))
            .filter(|ext| !ext.is_empty());

        let file_name = |suffix: Option<u64>| {
            let stem = match suffix {
                Some(n) => format!("{}_{}", base, n),
                None => base.clone(),
            };
            match &ext {
                Some(ext) => format!("{}.{}", stem, ext),
                None => stem,
            }
        };

        let mut candidate = dir.join(file_name(None));
        let mut counter = 0u64;
        while ledger.contains(&candidate) || path_taken(&candidate) {
            counter += 1;
            candidate = dir.join(file_name(Some(counter)));
        }

        if counter > 0 {
            debug!(
                source = %job.source_path.display(),
                output = %candidate.display(),
                attempts = counter,
                "Avoided output collision"
            );
        }

        ledger.claim(candidate.clone());
        Ok(candidate)
    }

    /// Renders the output stem, without extension or collision suffix.
    pub fn base_name(&self, job: &ConversionJob, position: usize) -> String {
        let stem = job
            .source_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        let rendered = match job.options.rename_pattern.as_deref() {
            Some(raw) => {
                let ext = job
                    .source_path
                    .extension()
                    .map(|e| e.to_string_lossy().to_lowercase())
                    .unwrap_or_default();
                let index = u64::from(job.options.start_index) + position as u64;
                let ctx = NameContext {
                    name: &stem,
                    ext: &ext,
                    index: index.saturating_sub(1),
                    date: &self.run_date,
                };

                let pattern = RenamePattern::parse(raw).unwrap_or_else(|e| {
                    warn!(pattern = raw, error = %e, "Invalid rename pattern, using fallback");
                    RenamePattern::fallback()
                });
                pattern.render(&ctx)
            }
            None => stem.clone(),
        };

        let sanitized = sanitize_file_name(&rendered);
        if !sanitized.is_empty() {
            return sanitized;
        }

        let stem = sanitize_file_name(&stem);
        if stem.is_empty() {
            "output".to_string()
        } else {
            stem
        }
    }

    fn output_dir(job: &ConversionJob) -> Result<PathBuf, ResolveError> {
        match &job.output_policy {
            OutputPolicy::Mirror => Ok(job
                .source_path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."))),
            OutputPolicy::FixedDirectory(dir) => {
                if !dir.is_dir() {
                    fs::create_dir_all(dir).map_err(|source| {
                        ResolveError::DirectoryUnavailable {
                            path: dir.clone(),
                            source,
                        }
                    })?;
                }
                Ok(dir.clone())
            }
        }
    }
}

/// Whether anything (including a dangling symlink) occupies `path`.
fn path_taken(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// Replaces separators and control characters so a name stays one component.
fn sanitize_file_name(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' => INERT_CHAR,
            c if c.is_control() => INERT_CHAR,
            c => c,
        })
        .collect();

    match replaced.trim() {
        "." | ".." => replaced.replace('.', &INERT_CHAR.to_string()),
        _ => replaced.trim().to_string(),
    }
}
