//! Configuration for conversion actions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Settings shared by every action plus per-engine sections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionsConfig {
    /// How long a terminated external process may take to exit before it is killed.
    #[serde(default = "default_termination_grace_ms")]
    pub termination_grace_ms: u64,

    #[serde(default)]
    pub ffmpeg: FfmpegConfig,

    #[serde(default)]
    pub office: OfficeConfig,

    #[serde(default)]
    pub image: ImageConfig,
}

fn default_termination_grace_ms() -> u64 {
    5000
}

impl Default for ActionsConfig {
    fn default() -> Self {
        Self {
            termination_grace_ms: default_termination_grace_ms(),
            ffmpeg: FfmpegConfig::default(),
            office: OfficeConfig::default(),
            image: ImageConfig::default(),
        }
    }
}

impl ActionsConfig {
    pub fn termination_grace(&self) -> Duration {
        Duration::from_millis(self.termination_grace_ms)
    }

    pub fn with_termination_grace_ms(mut self, ms: u64) -> Self {
        self.termination_grace_ms = ms;
        self
    }

    pub fn with_ffmpeg(mut self, ffmpeg: FfmpegConfig) -> Self {
        self.ffmpeg = ffmpeg;
        self
    }

    pub fn with_office(mut self, office: OfficeConfig) -> Self {
        self.office = office;
        self
    }
}

/// Configuration for the ffmpeg-backed audio/video action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FfmpegConfig {
    /// Path to ffmpeg binary.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    /// Path to ffprobe binary, used to learn durations for progress.
    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: PathBuf,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Additional global ffmpeg arguments.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_ffprobe_path() -> PathBuf {
    PathBuf::from("ffprobe")
}

fn default_log_level() -> String {
    "error".to_string()
}

impl Default for FfmpegConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            ffprobe_path: default_ffprobe_path(),
            log_level: default_log_level(),
            extra_args: Vec::new(),
        }
    }
}

impl FfmpegConfig {
    /// Creates a config with custom ffmpeg/ffprobe paths.
    pub fn with_paths(ffmpeg_path: PathBuf, ffprobe_path: PathBuf) -> Self {
        Self {
            ffmpeg_path,
            ffprobe_path,
            ..Default::default()
        }
    }
}

/// Configuration for the office-suite document action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfficeConfig {
    /// Path to the soffice binary.
    #[serde(default = "default_soffice_path")]
    pub soffice_path: PathBuf,
}

fn default_soffice_path() -> PathBuf {
    PathBuf::from("soffice")
}

impl Default for OfficeConfig {
    fn default() -> Self {
        Self {
            soffice_path: default_soffice_path(),
        }
    }
}

/// Configuration for the in-process image action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    /// JPEG quality used when a job does not set one (1-100).
    #[serde(default = "default_quality")]
    pub default_quality: u8,
}

fn default_quality() -> u8 {
    90
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            default_quality: default_quality(),
        }
    }
}
