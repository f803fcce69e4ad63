//! Side effects applied after a job succeeds.

use std::fs::{File, FileTimes};
use std::path::Path;
use tracing::{debug, warn};

use crate::job::ConversionJob;
use crate::metrics;

/// Result of the optional source deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Deletion {
    Deleted,
    /// A guard prevented deletion.
    Kept(&'static str),
    Failed,
}

/// Applies timestamp preservation and source deletion for a successful job.
///
/// Both are best-effort: failures are logged and never change the job's
/// outcome.
pub(crate) async fn apply_after_success(job: &ConversionJob, output_path: &Path) -> Option<Deletion> {
    if job.options.preserve_timestamps && !job.options.move_source {
        let source = job.source_path.clone();
        let output = output_path.to_path_buf();
        let copied = tokio::task::spawn_blocking(move || copy_timestamps(&source, &output)).await;
        match copied {
            Ok(Ok(())) => debug!(output = %output_path.display(), "Preserved source timestamps"),
            Ok(Err(e)) => {
                warn!(output = %output_path.display(), error = %e, "Failed to preserve timestamps")
            }
            Err(e) => warn!(error = %e, "Timestamp task failed"),
        }
    }

    if !job.options.delete_source_on_success {
        return None;
    }
    let deletion = delete_source(job, output_path).await;
    match deletion {
        Deletion::Deleted => {
            metrics::SOURCE_DELETIONS.with_label_values(&["deleted"]).inc();
        }
        Deletion::Kept(reason) => {
            debug!(source = %job.source_path.display(), reason, "Source kept");
        }
        Deletion::Failed => {
            metrics::SOURCE_DELETIONS.with_label_values(&["failed"]).inc();
        }
    }
    Some(deletion)
}

/// Deletes the source once the output is verified on disk.
///
/// Never deletes for keep-original jobs, or when the output is the source.
async fn delete_source(job: &ConversionJob, output_path: &Path) -> Deletion {
    if job.target_format.is_keep_original() {
        return Deletion::Kept("keep-original format");
    }
    match tokio::fs::metadata(output_path).await {
        Ok(meta) if meta.is_file() => {}
        _ => return Deletion::Kept("output missing"),
    }
    if same_file(&job.source_path, output_path).await {
        return Deletion::Kept("output is the source");
    }

    match tokio::fs::remove_file(&job.source_path).await {
        Ok(()) => {
            debug!(source = %job.source_path.display(), "Deleted source after conversion");
            Deletion::Deleted
        }
        Err(e) => {
            warn!(
                source = %job.source_path.display(),
                error = %e,
                "Failed to delete source, keeping it"
            );
            Deletion::Failed
        }
    }
}

async fn same_file(a: &Path, b: &Path) -> bool {
    match (
        tokio::fs::canonicalize(a).await,
        tokio::fs::canonicalize(b).await,
    ) {
        (Ok(ca), Ok(cb)) => ca == cb,
        _ => a == b,
    }
}

/// Copies access and modification times from `source` to `output`.
fn copy_timestamps(source: &Path, output: &Path) -> std::io::Result<()> {
    let meta = std::fs::metadata(source)?;
    let times = FileTimes::new()
        .set_accessed(meta.accessed()?)
        .set_modified(meta.modified()?);
    File::options().write(true).open(output)?.set_times(times)
}
