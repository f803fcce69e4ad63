//! Document conversion through a headless office suite.

use async_trait::async_trait;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use super::config::OfficeConfig;
use super::error::ActionError;
use super::process::{probe_engine, ExternalProcess};
use super::traits::{ActionContext, ConversionAction};
use super::types::ActionOutput;
use crate::job::{ConversionJob, TargetFormat};

/// Runs `soffice --headless --convert-to` for each job.
///
/// soffice always names its product after the source stem, so every job
/// converts into a private staging directory next to the output and the
/// product is then moved to the resolved path.
#[derive(Debug, Clone)]
pub struct OfficeAction {
    config: OfficeConfig,
    grace: Duration,
}

impl OfficeAction {
    pub fn new(config: OfficeConfig, grace: Duration) -> Self {
        Self { config, grace }
    }

    fn staging_dir(output_path: &Path) -> PathBuf {
        let parent = output_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        parent.join(format!(".bambam-{}", Uuid::new_v4().simple()))
    }
}

/// Maps an output extension to the soffice `--convert-to` argument.
fn convert_filter(ext: &str) -> Option<&'static str> {
    match ext {
        "pdf" => Some("pdf:writer_pdf_Export"),
        "docx" => Some("docx"),
        "odt" => Some("odt"),
        "txt" => Some("txt:Text"),
        _ => None,
    }
}

/// Moves the file soffice produced in `staging` to `output_path`.
async fn collect_product(
    staging: &Path,
    source: &Path,
    ext: &str,
    output_path: &Path,
) -> Result<(), ActionError> {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let produced = staging.join(format!("{}.{}", stem, ext));
    if !produced.is_file() {
        return Err(ActionError::OutputMissing { path: produced });
    }
    tokio::fs::rename(&produced, output_path).await?;
    Ok(())
}

#[async_trait]
impl ConversionAction for OfficeAction {
    fn name(&self) -> &str {
        "soffice"
    }

    fn is_interruptible(&self) -> bool {
        true
    }

    async fn validate(&self) -> Result<(), ActionError> {
        probe_engine("soffice", &self.config.soffice_path, "--version").await
    }

    async fn execute(
        &self,
        job: &ConversionJob,
        output_path: &Path,
        ctx: &ActionContext,
    ) -> Result<ActionOutput, ActionError> {
        let started = Instant::now();
        let ext = match &job.target_format {
            TargetFormat::KeepOriginal => return Err(ActionError::unsupported_format("original")),
            TargetFormat::Format(ext) => ext.as_str(),
        };
        let filter = convert_filter(ext).ok_or_else(|| ActionError::unsupported_format(ext))?;
        if !job.source_path.is_file() {
            return Err(ActionError::InputNotFound {
                path: job.source_path.clone(),
            });
        }

        let staging = Self::staging_dir(output_path);
        tokio::fs::create_dir_all(&staging).await?;
        debug!(
            source = %job.source_path.display(),
            staging = %staging.display(),
            filter,
            "Running soffice"
        );

        let process = ExternalProcess {
            engine: "soffice",
            program: &self.config.soffice_path,
            grace: self.grace,
        };
        let args = [
            OsStr::new("--headless"),
            OsStr::new("--convert-to"),
            OsStr::new(filter),
            OsStr::new("--outdir"),
            staging.as_os_str(),
            job.source_path.as_os_str(),
        ];
        let result = match process.run(args, ctx.cancel_token(), |_| {}).await {
            Ok(()) => collect_product(&staging, &job.source_path, ext, output_path).await,
            Err(e) => Err(e),
        };

        if let Err(e) = tokio::fs::remove_dir_all(&staging).await {
            warn!(staging = %staging.display(), error = %e, "Failed to remove staging directory");
        }

        result?;
        ActionOutput::from_written(output_path, started).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::OutputPolicy;
    use tempfile::TempDir;
    use tokio_util::sync::CancellationToken;

    #[test]
    fn test_convert_filters() {
        assert_eq!(convert_filter("pdf"), Some("pdf:writer_pdf_Export"));
        assert_eq!(convert_filter("txt"), Some("txt:Text"));
        assert_eq!(convert_filter("docx"), Some("docx"));
        assert_eq!(convert_filter("png"), None);
    }

    #[test]
    fn test_staging_dir_is_hidden_sibling() {
        let staging = OfficeAction::staging_dir(Path::new("/out/report_1.pdf"));
        assert_eq!(staging.parent(), Some(Path::new("/out")));
        let name = staging.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with(".bambam-"));
    }

    #[tokio::test]
    async fn test_collect_product_moves_into_place() {
        let temp = TempDir::new().unwrap();
        let staging = temp.path().join(".bambam-test");
        std::fs::create_dir_all(&staging).unwrap();
        std::fs::write(staging.join("report.pdf"), b"%PDF").unwrap();

        let output = temp.path().join("report_1.pdf");
        collect_product(&staging, Path::new("/docs/report.docx"), "pdf", &output)
            .await
            .unwrap();
        assert_eq!(std::fs::read(&output).unwrap(), b"%PDF");
        assert!(!staging.join("report.pdf").exists());
    }

    #[tokio::test]
    async fn test_collect_product_missing() {
        let temp = TempDir::new().unwrap();
        let err = collect_product(temp.path(), Path::new("/docs/a.odt"), "pdf", &temp.path().join("a.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::OutputMissing { .. }));
    }

    #[tokio::test]
    async fn test_rejects_unsupported_targets() {
        let action = OfficeAction::new(OfficeConfig::default(), Duration::from_secs(1));
        let ctx = ActionContext::new(CancellationToken::new());

        for format in ["original", "png"] {
            let job = ConversionJob::new(
                "/docs/a.docx",
                format.parse::<TargetFormat>().unwrap(),
                OutputPolicy::Mirror,
            );
            let err = action
                .execute(&job, Path::new("/docs/a.out"), &ctx)
                .await
                .unwrap_err();
            assert!(matches!(err, ActionError::UnsupportedFormat { .. }));
        }
    }

    #[tokio::test]
    async fn test_missing_engine_leaves_no_staging_dir() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("a.docx");
        std::fs::write(&source, b"doc").unwrap();

        let config = OfficeConfig {
            soffice_path: PathBuf::from("/nonexistent/soffice"),
        };
        let action = OfficeAction::new(config, Duration::from_secs(1));
        let job = ConversionJob::new(&source, TargetFormat::format("pdf"), OutputPolicy::Mirror);

        let err = action
            .execute(&job, &temp.path().join("a.pdf"), &ActionContext::new(CancellationToken::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::EngineNotFound { .. }));

        let leftovers: Vec<_> = std::fs::read_dir(temp.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().starts_with(".bambam-"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
