//! Capability lookup from category to action.

use async_trait::async_trait;
use std::path::Path;
use tracing::info;

use super::config::ActionsConfig;
use super::copy::CopyAction;
use super::error::ActionError;
use super::ffmpeg::FfmpegAction;
use super::imaging::ImageAction;
use super::office::OfficeAction;
use super::traits::{ActionContext, ConversionAction};
use super::types::{ActionOutput, MediaKind};
use crate::job::{Category, ConversionJob};

/// The built-in actions, one variant per execution strategy.
#[derive(Debug, Clone)]
pub enum ActionKind {
    /// In-process image transform.
    Image(ImageAction),
    /// ffmpeg subprocess for audio and video.
    ExternalProcess(FfmpegAction),
    /// Headless office suite for documents.
    DocumentEngine(OfficeAction),
    /// Plain copy or move for batch renaming.
    Copy(CopyAction),
}

impl ActionKind {
    /// Returns the action that handles `category`.
    pub fn for_category(category: Category, config: &ActionsConfig) -> Self {
        let grace = config.termination_grace();
        match category {
            Category::Image => Self::Image(ImageAction::new(config.image.clone())),
            Category::Audio => Self::ExternalProcess(FfmpegAction::new(
                config.ffmpeg.clone(),
                MediaKind::Audio,
                grace,
            )),
            Category::Video => Self::ExternalProcess(FfmpegAction::new(
                config.ffmpeg.clone(),
                MediaKind::Video,
                grace,
            )),
            Category::Document => {
                Self::DocumentEngine(OfficeAction::new(config.office.clone(), grace))
            }
            Category::Rename => Self::Copy(CopyAction),
        }
    }

    fn inner(&self) -> &dyn ConversionAction {
        match self {
            Self::Image(a) => a,
            Self::ExternalProcess(a) => a,
            Self::DocumentEngine(a) => a,
            Self::Copy(a) => a,
        }
    }
}

/// Picks and validates the action for `category`.
///
/// A missing engine binary is reported here, before any job runs.
pub async fn select_action(
    category: Category,
    config: &ActionsConfig,
) -> Result<ActionKind, ActionError> {
    let action = ActionKind::for_category(category, config);
    action.validate().await?;
    info!(category = %category, action = action.name(), "Selected conversion action");
    Ok(action)
}

#[async_trait]
impl ConversionAction for ActionKind {
    fn name(&self) -> &str {
        self.inner().name()
    }

    fn reports_progress(&self) -> bool {
        self.inner().reports_progress()
    }

    fn is_interruptible(&self) -> bool {
        self.inner().is_interruptible()
    }

    async fn validate(&self) -> Result<(), ActionError> {
        self.inner().validate().await
    }

    async fn execute(
        &self,
        job: &ConversionJob,
        output_path: &Path,
        ctx: &ActionContext,
    ) -> Result<ActionOutput, ActionError> {
        self.inner().execute(job, output_path, ctx).await
    }
}
