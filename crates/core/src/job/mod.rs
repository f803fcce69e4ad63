//! Job model and job set construction.
//!
//! A batch starts from a raw selection of files and folders. The
//! [`JobSetBuilder`] flattens it into an ordered, de-duplicated list of source
//! paths, filtered by a per-category [`ExtensionFilter`], and a
//! [`JobTemplate`] turns those paths into immutable [`ConversionJob`]s.
//!
//! # Example
//!
//! ```ignore
//! use bambam_core::job::{Category, JobSetBuilder, JobTemplate, OutputPolicy, TargetFormat};
//!
//! let sources = JobSetBuilder::new()
//!     .add_files(selected_files)
//!     .add_folder("/photos/2024")
//!     .build(&Category::Image);
//!
//! let jobs = JobTemplate::new(TargetFormat::format("webp"), OutputPolicy::Mirror)
//!     .instantiate(sources)?;
//! ```

mod builder;
mod category;
mod options;
mod types;

pub use builder::{build_job_set, JobSetBuilder};
pub use category::{Category, ExtensionFilter, ExtensionSet};
pub use options::{CropRect, JobOptions, ResizeMode, ResizeSpec, TrimRange};
pub use types::{ConversionJob, JobSetError, JobTemplate, OutputPolicy, TargetFormat};
