//! FFmpeg-based audio/video action.

use async_trait::async_trait;
use regex_lite::Regex;
use serde::Deserialize;
use std::path::Path;
use std::time::Instant;
use tokio::process::Command;
use tokio::time::Duration;
use tracing::debug;

use super::config::FfmpegConfig;
use super::error::ActionError;
use super::process::{probe_engine, ExternalProcess};
use super::traits::{ActionContext, ConversionAction};
use super::types::{ActionOutput, MediaKind};
use crate::job::{Category, ConversionJob, ResizeMode, TargetFormat};

/// Output formats that take an audio bitrate.
const LOSSY_AUDIO: &[&str] = &["mp3", "ogg", "m4a", "aac", "opus"];

/// Converts audio and video through an ffmpeg subprocess.
#[derive(Debug, Clone)]
pub struct FfmpegAction {
    config: FfmpegConfig,
    media: MediaKind,
    grace: Duration,
}

impl FfmpegAction {
    /// Creates an action for `media` with the given configuration.
    pub fn new(config: FfmpegConfig, media: MediaKind, grace: Duration) -> Self {
        Self {
            config,
            media,
            grace,
        }
    }

    pub fn media(&self) -> MediaKind {
        self.media
    }

    fn category(&self) -> Category {
        match self.media {
            MediaKind::Audio => Category::Audio,
            MediaKind::Video => Category::Video,
        }
    }

    /// Builds ffmpeg arguments for one job.
    pub(crate) fn build_args(
        &self,
        job: &ConversionJob,
        output_path: &Path,
    ) -> Result<Vec<String>, ActionError> {
        let category = self.category();
        let mut args = vec![
            "-y".to_string(),
            "-hide_banner".to_string(),
            "-nostdin".to_string(),
            "-loglevel".to_string(),
            self.config.log_level.clone(),
        ];
        args.extend(self.config.extra_args.iter().cloned());
        args.extend(["-i".to_string(), job.source_path.to_string_lossy().to_string()]);

        if let Some(trim) = &job.options.trim {
            if trim.start_secs > 0.0 {
                args.extend(["-ss".to_string(), format_secs(trim.start_secs)]);
            }
            if let Some(end) = trim.end_secs {
                args.extend(["-to".to_string(), format_secs(end)]);
            }
        }

        match &job.target_format {
            TargetFormat::KeepOriginal => {
                if !category.supports_keep_original() {
                    return Err(ActionError::unsupported_format("original"));
                }
                args.extend(["-c".to_string(), "copy".to_string()]);
            }
            TargetFormat::Format(ext) => {
                if !category.output_formats().contains(&ext.as_str()) {
                    return Err(ActionError::unsupported_format(ext.clone()));
                }
                match self.media {
                    MediaKind::Video => self.push_video_args(&mut args, job, ext),
                    MediaKind::Audio => {
                        args.push("-vn".to_string());
                        args.extend(["-c:a".to_string(), audio_codec(ext).to_string()]);
                    }
                }
                if let Some(kbps) = job.options.audio_bitrate_kbps {
                    if LOSSY_AUDIO.contains(&ext.as_str()) || self.media == MediaKind::Video {
                        args.extend(["-b:a".to_string(), format!("{}k", kbps)]);
                    }
                }
            }
        }

        args.extend([
            "-progress".to_string(),
            "pipe:2".to_string(),
            "-nostats".to_string(),
        ]);
        args.push(output_path.to_string_lossy().to_string());
        Ok(args)
    }

    fn push_video_args(&self, args: &mut Vec<String>, job: &ConversionJob, ext: &str) {
        let mut filters = Vec::new();
        if let Some(crop) = &job.options.crop {
            filters.push(format!(
                "crop={}:{}:{}:{}",
                crop.width, crop.height, crop.x, crop.y
            ));
        }
        if let Some(resize) = job.options.resize.filter(|r| r.is_effective()) {
            let (w, h) = (resize.width, resize.height);
            filters.push(match resize.mode {
                ResizeMode::Fit => format!(
                    "scale=w={w}:h={h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2"
                ),
                ResizeMode::Stretch => format!("scale={w}:{h}"),
            });
        }
        if !filters.is_empty() {
            args.extend(["-vf".to_string(), filters.join(",")]);
        }

        if let Some(fps) = job.options.fps.filter(|f| *f > 0.0) {
            args.extend(["-r".to_string(), fps.to_string()]);
        }

        let (vcodec, acodec) = video_codecs(ext);
        args.extend([
            "-c:v".to_string(),
            vcodec.to_string(),
            "-c:a".to_string(),
            acodec.to_string(),
        ]);
    }

    /// Learns the source duration in seconds, if ffprobe can tell.
    async fn probe_duration(&self, path: &Path) -> Option<f64> {
        let output = Command::new(&self.config.ffprobe_path)
            .args(["-v", "quiet", "-print_format", "json", "-show_format"])
            .arg(path)
            .output()
            .await
            .ok()?;
        if !output.status.success() {
            return None;
        }
        parse_probe_duration(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Extracts `format.duration` from ffprobe JSON output.
fn parse_probe_duration(output: &str) -> Option<f64> {
    #[derive(Deserialize)]
    struct ProbeOutput {
        format: ProbeFormat,
    }

    #[derive(Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }

    let probe: ProbeOutput = serde_json::from_str(output).ok()?;
    probe
        .format
        .duration
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| *d > 0.0)
}

/// Parses one `-progress` line into seconds of output written.
///
/// Both `out_time_ms` and `out_time_us` carry microseconds.
fn parse_out_time(re: &Regex, line: &str) -> Option<f64> {
    let caps = re.captures(line.trim())?;
    let micros = caps.get(1)?.as_str().parse::<f64>().ok()?;
    Some(micros / 1_000_000.0)
}

fn format_secs(secs: f64) -> String {
    format!("{:.3}", secs.max(0.0))
}

fn audio_codec(ext: &str) -> &'static str {
    match ext {
        "mp3" => "libmp3lame",
        "ogg" => "libvorbis",
        "opus" => "libopus",
        "m4a" | "aac" => "aac",
        "flac" => "flac",
        "wav" => "pcm_s16le",
        _ => "aac",
    }
}

fn video_codecs(ext: &str) -> (&'static str, &'static str) {
    match ext {
        "webm" => ("libvpx-vp9", "libopus"),
        _ => ("libx264", "aac"),
    }
}

#[async_trait]
impl ConversionAction for FfmpegAction {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    fn reports_progress(&self) -> bool {
        true
    }

    fn is_interruptible(&self) -> bool {
        true
    }

    async fn validate(&self) -> Result<(), ActionError> {
        probe_engine("ffmpeg", &self.config.ffmpeg_path, "-version").await?;
        probe_engine("ffprobe", &self.config.ffprobe_path, "-version").await
    }

    async fn execute(
        &self,
        job: &ConversionJob,
        output_path: &Path,
        ctx: &ActionContext,
    ) -> Result<ActionOutput, ActionError> {
        let started = Instant::now();
        if !job.source_path.is_file() {
            return Err(ActionError::InputNotFound {
                path: job.source_path.clone(),
            });
        }

        let args = self.build_args(job, output_path)?;
        let duration = self.probe_duration(&job.source_path).await.map(|d| match &job.options.trim {
            Some(trim) => trim.kept_duration(d),
            None => d,
        });
        debug!(
            source = %job.source_path.display(),
            output = %output_path.display(),
            duration_secs = ?duration,
            "Running ffmpeg"
        );

        let time_regex = Regex::new(r"^out_time_(?:ms|us)=(\d+)$").ok();
        ctx.report_progress(0.0);

        let process = ExternalProcess {
            engine: "ffmpeg",
            program: &self.config.ffmpeg_path,
            grace: self.grace,
        };
        process
            .run(&args, ctx.cancel_token(), |line| {
                if line.trim() == "progress=end" {
                    ctx.report_progress(1.0);
                    return;
                }
                let (Some(re), Some(total)) = (&time_regex, duration) else {
                    return;
                };
                if let Some(secs) = parse_out_time(re, line) {
                    if total > 0.0 {
                        ctx.report_progress((secs / total) as f32);
                    }
                }
            })
            .await?;

        ActionOutput::from_written(output_path, started).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{CropRect, JobOptions, OutputPolicy, ResizeSpec, TrimRange};
    use std::path::PathBuf;

    fn action(media: MediaKind) -> FfmpegAction {
        FfmpegAction::new(FfmpegConfig::default(), media, Duration::from_secs(1))
    }

    fn job(source: &str, format: &str, options: JobOptions) -> ConversionJob {
        ConversionJob::new(
            source,
            format.parse::<TargetFormat>().unwrap(),
            OutputPolicy::Mirror,
        )
        .with_options(options)
    }

    fn has_pair(args: &[String], flag: &str, value: &str) -> bool {
        args.windows(2).any(|w| w[0] == flag && w[1] == value)
    }

    #[test]
    fn test_build_audio_args_mp3() {
        let job = job("/in/song.wav", "mp3", JobOptions::default().with_audio_bitrate(192));
        let args = action(MediaKind::Audio)
            .build_args(&job, Path::new("/out/song.mp3"))
            .unwrap();

        assert!(has_pair(&args, "-i", "/in/song.wav"));
        assert!(has_pair(&args, "-c:a", "libmp3lame"));
        assert!(has_pair(&args, "-b:a", "192k"));
        assert!(has_pair(&args, "-progress", "pipe:2"));
        assert_eq!(args.last().unwrap(), "/out/song.mp3");
    }

    #[test]
    fn test_build_audio_args_lossless_ignores_bitrate() {
        let job = job("/in/song.mp3", "flac", JobOptions::default().with_audio_bitrate(320));
        let args = action(MediaKind::Audio)
            .build_args(&job, Path::new("/out/song.flac"))
            .unwrap();

        assert!(has_pair(&args, "-c:a", "flac"));
        assert!(!args.contains(&"-b:a".to_string()));
    }

    #[test]
    fn test_build_video_args_fit_resize() {
        let options = JobOptions::default()
            .with_resize(ResizeSpec::fit(1280, 720))
            .with_fps(30.0)
            .with_crop(CropRect::new(10, 20, 640, 360));
        let job = job("/in/clip.mov", "webm", options);
        let args = action(MediaKind::Video)
            .build_args(&job, Path::new("/out/clip.webm"))
            .unwrap();

        assert!(has_pair(
            &args,
            "-vf",
            "crop=640:360:10:20,scale=w=1280:h=720:force_original_aspect_ratio=decrease,pad=1280:720:(ow-iw)/2:(oh-ih)/2"
        ));
        assert!(has_pair(&args, "-r", "30"));
        assert!(has_pair(&args, "-c:v", "libvpx-vp9"));
        assert!(has_pair(&args, "-c:a", "libopus"));
    }

    #[test]
    fn test_build_video_args_stretch_and_trim() {
        let options = JobOptions::default()
            .with_resize(ResizeSpec::stretch(320, 240))
            .with_trim(TrimRange::new(1.5, Some(10.0)));
        let job = job("/in/clip.avi", "mp4", options);
        let args = action(MediaKind::Video)
            .build_args(&job, Path::new("/out/clip.mp4"))
            .unwrap();

        assert!(has_pair(&args, "-vf", "scale=320:240"));
        assert!(has_pair(&args, "-ss", "1.500"));
        assert!(has_pair(&args, "-to", "10.000"));
        assert!(has_pair(&args, "-c:v", "libx264"));
    }

    #[test]
    fn test_keep_original_copies_streams() {
        let options = JobOptions::default().with_resize(ResizeSpec::fit(100, 100));
        let job = job("/in/clip.mkv", "original", options);
        let args = action(MediaKind::Video)
            .build_args(&job, Path::new("/out/clip.mkv"))
            .unwrap();

        assert!(has_pair(&args, "-c", "copy"));
        assert!(!args.contains(&"-vf".to_string()));
    }

    #[test]
    fn test_unsupported_formats() {
        let audio = action(MediaKind::Audio);
        let err = audio
            .build_args(&job("/in/a.mp3", "original", JobOptions::default()), Path::new("/o"))
            .unwrap_err();
        assert!(matches!(err, ActionError::UnsupportedFormat { .. }));

        let err = audio
            .build_args(&job("/in/a.mp3", "mp4", JobOptions::default()), Path::new("/o"))
            .unwrap_err();
        assert!(matches!(err, ActionError::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_parse_progress_lines() {
        let re = Regex::new(r"^out_time_(?:ms|us)=(\d+)$").unwrap();
        assert_eq!(parse_out_time(&re, "out_time_ms=2500000"), Some(2.5));
        assert_eq!(parse_out_time(&re, "out_time_us=1000000\n"), Some(1.0));
        assert_eq!(parse_out_time(&re, "out_time=00:00:02.500000"), None);
        assert_eq!(parse_out_time(&re, "frame=12"), None);
    }

    #[test]
    fn test_parse_probe_duration() {
        let json = r#"{"format": {"filename": "x.mp4", "duration": "180.5", "size": "100"}}"#;
        assert_eq!(parse_probe_duration(json), Some(180.5));
        assert_eq!(parse_probe_duration(r#"{"format": {}}"#), None);
        assert_eq!(parse_probe_duration("not json"), None);
    }

    #[tokio::test]
    async fn test_missing_input() {
        let ctx = ActionContext::new(tokio_util::sync::CancellationToken::new());
        let job = job("/nonexistent/clip.mov", "mp4", JobOptions::default());
        let err = action(MediaKind::Video)
            .execute(&job, &PathBuf::from("/tmp/clip.mp4"), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::InputNotFound { .. }));
    }
}
