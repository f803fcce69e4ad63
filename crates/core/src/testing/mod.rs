//! Testing utilities and mock implementations.
//!
//! This module provides a scriptable [`MockAction`] and a [`RecordingReporter`],
//! allowing deterministic runner tests without ffmpeg, an office suite or
//! real media files.
//!
//! # Example
//!
//! ```rust,ignore
//! use bambam_core::testing::{fixtures, MockAction, RecordingReporter};
//!
//! let action = Arc::new(MockAction::new().fail_on("b.png"));
//! let reporter = Arc::new(RecordingReporter::new());
//! let jobs = fixtures::jobs(dir.path(), &["a.png", "b.png"], "jpg");
//!
//! let handle = runner.start(jobs, action, reporter.clone()).await?;
//! let summary = handle.wait().await;
//! assert_eq!(summary.failed, 1);
//! ```

mod mock_action;
mod recording_reporter;

pub use mock_action::{MockAction, RecordedExecution};
pub use recording_reporter::RecordingReporter;

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::{Path, PathBuf};

    use crate::job::{ConversionJob, OutputPolicy, TargetFormat};

    /// Write a small file whose contents are its own name.
    pub fn write_file(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create fixture directory");
        }
        std::fs::write(&path, name.as_bytes()).expect("Failed to write fixture file");
        path
    }

    /// Write a solid-colour RGB PNG of the given size.
    pub fn png_file(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
        let path = dir.join(name);
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 40, 40]));
        img.save_with_format(&path, image::ImageFormat::Png)
            .expect("Failed to write fixture image");
        path
    }

    /// Create source files in `dir` and one mirror-policy job per file.
    pub fn jobs(dir: &Path, names: &[&str], target: &str) -> Vec<ConversionJob> {
        names
            .iter()
            .map(|name| {
                ConversionJob::new(
                    write_file(dir, name),
                    TargetFormat::format(target),
                    OutputPolicy::Mirror,
                )
            })
            .collect()
    }

    /// Like [`jobs`], writing outputs into `out_dir`.
    pub fn jobs_into(
        dir: &Path,
        names: &[&str],
        target: &str,
        out_dir: &Path,
    ) -> Vec<ConversionJob> {
        jobs(dir, names, target)
            .into_iter()
            .map(|mut job| {
                job.output_policy = OutputPolicy::FixedDirectory(out_dir.to_path_buf());
                job
            })
            .collect()
    }
}
