//! Action-specific job options.

use serde::{Deserialize, Serialize};

/// Settings carried by every job of a batch.
///
/// Actions read only the fields that apply to them; the runner itself reads
/// `delete_source_on_success` and `preserve_timestamps`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobOptions {
    /// Encoder quality (1-100) for lossy image formats.
    ///
    /// Only JPEG output uses it; WebP is always written lossless.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<u8>,

    /// Target frame size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resize: Option<ResizeSpec>,

    /// Audio bitrate for lossy audio codecs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_bitrate_kbps: Option<u32>,

    /// Output frame rate for video.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fps: Option<f32>,

    /// Time range to keep from a timed source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trim: Option<TrimRange>,

    /// Region to keep from a visual source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crop: Option<CropRect>,

    /// Output name pattern, e.g. `{name}_{index}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rename_pattern: Option<String>,

    /// Value of `{index}` for the first job of the batch.
    #[serde(default = "default_start_index")]
    pub start_index: u32,

    /// Delete the source once its output was verified on disk.
    #[serde(default)]
    pub delete_source_on_success: bool,

    /// Copy the source access/modification times onto the output.
    #[serde(default)]
    pub preserve_timestamps: bool,

    /// Move instead of copy (rename-only batches).
    #[serde(default)]
    pub move_source: bool,
}

fn default_start_index() -> u32 {
    1
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            quality: None,
            resize: None,
            audio_bitrate_kbps: None,
            fps: None,
            trim: None,
            crop: None,
            rename_pattern: None,
            start_index: default_start_index(),
            delete_source_on_success: false,
            preserve_timestamps: false,
            move_source: false,
        }
    }
}

impl JobOptions {
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = Some(quality);
        self
    }

    pub fn with_resize(mut self, resize: ResizeSpec) -> Self {
        self.resize = Some(resize);
        self
    }

    pub fn with_audio_bitrate(mut self, kbps: u32) -> Self {
        self.audio_bitrate_kbps = Some(kbps);
        self
    }

    pub fn with_fps(mut self, fps: f32) -> Self {
        self.fps = Some(fps);
        self
    }

    pub fn with_trim(mut self, trim: TrimRange) -> Self {
        self.trim = Some(trim);
        self
    }

    pub fn with_crop(mut self, crop: CropRect) -> Self {
        self.crop = Some(crop);
        self
    }

    pub fn with_rename_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.rename_pattern = Some(pattern.into());
        self
    }

    pub fn with_start_index(mut self, start_index: u32) -> Self {
        self.start_index = start_index;
        self
    }

    pub fn with_delete_source(mut self, enabled: bool) -> Self {
        self.delete_source_on_success = enabled;
        self
    }

    pub fn with_preserve_timestamps(mut self, enabled: bool) -> Self {
        self.preserve_timestamps = enabled;
        self
    }

    pub fn with_move_source(mut self, enabled: bool) -> Self {
        self.move_source = enabled;
        self
    }
}

/// How a frame is fitted into the requested size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeMode {
    /// Scale down preserving aspect ratio, then pad to the exact size.
    #[default]
    Fit,
    /// Scale to the exact size, ignoring aspect ratio.
    Stretch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResizeSpec {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub mode: ResizeMode,
}

impl ResizeSpec {
    pub fn fit(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            mode: ResizeMode::Fit,
        }
    }

    pub fn stretch(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            mode: ResizeMode::Stretch,
        }
    }

    /// A zero dimension disables resizing.
    pub fn is_effective(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// Time range in seconds. A missing end keeps everything after `start_secs`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrimRange {
    #[serde(default)]
    pub start_secs: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_secs: Option<f64>,
}

impl TrimRange {
    pub fn new(start_secs: f64, end_secs: Option<f64>) -> Self {
        Self {
            start_secs,
            end_secs,
        }
    }

    /// Length of the kept range given the full source duration.
    pub fn kept_duration(&self, source_duration: f64) -> f64 {
        let end = self
            .end_secs
            .unwrap_or(source_duration)
            .min(source_duration);
        (end - self.start_secs.max(0.0)).max(0.0)
    }
}

/// Pixel rectangle measured from the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}
