//! Command line arguments.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use bambam_core::job::{CropRect, JobOptions, ResizeSpec, TrimRange};
use bambam_core::{Category, OutputPolicy, TargetFormat};

#[derive(Debug, Parser)]
#[command(name = "bambam", version, about = "Batch media and document converter")]
pub struct Cli {
    /// Configuration file (TOML). Defaults plus `BAMBAM_*` variables when omitted.
    #[arg(long, global = true, env = "BAMBAM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print Prometheus metrics after the command finishes.
    #[arg(long, global = true)]
    pub metrics: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Convert a selection of files and folders.
    Convert(ConvertArgs),
    /// List input extensions and output formats per category.
    Formats,
}

#[derive(Debug, Args)]
pub struct ConvertArgs {
    /// image, audio, video, document or rename.
    #[arg(value_parser = parse_category)]
    pub category: Category,

    /// Target format, or `original` to keep the source format.
    #[arg(long = "to", short = 't', default_value = "original", value_parser = parse_target)]
    pub target: TargetFormat,

    /// Write every output into this directory instead of next to its source.
    #[arg(long, short = 'o')]
    pub out: Option<PathBuf>,

    /// Output name pattern, e.g. `{name}_{index:03}`.
    #[arg(long)]
    pub rename: Option<String>,

    /// First value of `{index}`.
    #[arg(long, default_value_t = 1)]
    pub start_index: u32,

    /// Encoder quality for lossy image formats (1-100).
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub quality: Option<u8>,

    /// Target size as WIDTHxHEIGHT. Fits inside the box unless --stretch.
    #[arg(long, value_parser = parse_size)]
    pub resize: Option<(u32, u32)>,

    /// Stretch to the exact --resize size.
    #[arg(long, requires = "resize")]
    pub stretch: bool,

    /// Audio bitrate in kbit/s.
    #[arg(long)]
    pub bitrate: Option<u32>,

    /// Output frame rate.
    #[arg(long)]
    pub fps: Option<f32>,

    /// Time range in seconds as START-END or START-.
    #[arg(long, value_parser = parse_trim)]
    pub trim: Option<TrimRange>,

    /// Crop rectangle as X,Y,WIDTH,HEIGHT.
    #[arg(long, value_parser = parse_crop)]
    pub crop: Option<CropRect>,

    /// Delete each source after its output was written.
    #[arg(long)]
    pub delete_originals: bool,

    /// Copy source timestamps onto outputs.
    #[arg(long)]
    pub preserve_timestamps: bool,

    /// Move instead of copy (rename category).
    #[arg(long = "move")]
    pub move_source: bool,

    /// Folders to walk recursively.
    #[arg(long = "folder", short = 'f')]
    pub folders: Vec<PathBuf>,

    /// Print the final summary as JSON.
    #[arg(long)]
    pub json: bool,

    /// Files to convert.
    pub files: Vec<PathBuf>,
}

impl ConvertArgs {
    pub fn output_policy(&self) -> OutputPolicy {
        match &self.out {
            Some(dir) => OutputPolicy::FixedDirectory(dir.clone()),
            None => OutputPolicy::Mirror,
        }
    }

    pub fn job_options(&self) -> JobOptions {
        let mut options = JobOptions::default()
            .with_start_index(self.start_index)
            .with_delete_source(self.delete_originals)
            .with_preserve_timestamps(self.preserve_timestamps)
            .with_move_source(self.move_source);

        if let Some(quality) = self.quality {
            options = options.with_quality(quality);
        }
        if let Some((w, h)) = self.resize {
            options = options.with_resize(if self.stretch {
                ResizeSpec::stretch(w, h)
            } else {
                ResizeSpec::fit(w, h)
            });
        }
        if let Some(kbps) = self.bitrate {
            options = options.with_audio_bitrate(kbps);
        }
        if let Some(fps) = self.fps {
            options = options.with_fps(fps);
        }
        if let Some(trim) = self.trim {
            options = options.with_trim(trim);
        }
        if let Some(crop) = self.crop {
            options = options.with_crop(crop);
        }
        if let Some(pattern) = &self.rename {
            options = options.with_rename_pattern(pattern.clone());
        }
        options
    }
}

fn parse_category(s: &str) -> Result<Category, String> {
    s.parse()
}

fn parse_target(s: &str) -> Result<TargetFormat, String> {
    s.parse().map_err(|e: bambam_core::JobSetError| e.to_string())
}

fn parse_size(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {:?}", s))?;
    let w: u32 = w.trim().parse().map_err(|_| format!("invalid width {:?}", w))?;
    let h: u32 = h.trim().parse().map_err(|_| format!("invalid height {:?}", h))?;
    if w == 0 || h == 0 {
        return Err("width and height must be positive".to_string());
    }
    Ok((w, h))
}

fn parse_trim(s: &str) -> Result<TrimRange, String> {
    let (start, end) = s
        .split_once('-')
        .ok_or_else(|| format!("expected START-END or START-, got {:?}", s))?;
    let start: f64 = start
        .trim()
        .parse()
        .map_err(|_| format!("invalid start {:?}", start))?;
    let end = match end.trim() {
        "" => None,
        end => Some(end.parse::<f64>().map_err(|_| format!("invalid end {:?}", end))?),
    };
    if start < 0.0 || end.is_some_and(|e| e <= start) {
        return Err(format!("empty or negative range {:?}", s));
    }
    Ok(TrimRange::new(start, end))
}

fn parse_crop(s: &str) -> Result<CropRect, String> {
    let parts: Vec<u32> = s
        .split(',')
        .map(|p| p.trim().parse::<u32>())
        .collect::<Result<_, _>>()
        .map_err(|_| format!("expected X,Y,WIDTH,HEIGHT, got {:?}", s))?;
    match parts.as_slice() {
        [x, y, w, h] if *w > 0 && *h > 0 => Ok(CropRect::new(*x, *y, *w, *h)),
        _ => Err(format!("expected X,Y,WIDTH,HEIGHT, got {:?}", s)),
    }
}
