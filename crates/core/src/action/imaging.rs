//! In-process image action.

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader, Rgb, RgbImage};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::time::Instant;
use tracing::debug;

use super::config::ImageConfig;
use super::error::ActionError;
use super::traits::{ActionContext, ConversionAction};
use super::types::ActionOutput;
use crate::job::{Category, ConversionJob, CropRect, JobOptions, ResizeMode, ResizeSpec, TargetFormat};

/// Decodes, transforms and re-encodes images with the `image` crate.
#[derive(Debug, Clone, Default)]
pub struct ImageAction {
    config: ImageConfig,
}

impl ImageAction {
    pub fn new(config: ImageConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ConversionAction for ImageAction {
    fn name(&self) -> &str {
        "image"
    }

    async fn execute(
        &self,
        job: &ConversionJob,
        output_path: &Path,
        _ctx: &ActionContext,
    ) -> Result<ActionOutput, ActionError> {
        let started = Instant::now();
        if !job.source_path.is_file() {
            return Err(ActionError::InputNotFound {
                path: job.source_path.clone(),
            });
        }

        let format = output_format(job)?;
        if let Some(requested) = job.options.quality.filter(|_| !honours_quality(format)) {
            debug!(
                source = %job.source_path.display(),
                ?format,
                quality = requested,
                "Quality ignored, encoder is lossless"
            );
        }
        let quality = job.options.quality.unwrap_or(self.config.default_quality);
        let source = job.source_path.clone();
        let output = output_path.to_path_buf();
        let options = job.options.clone();

        tokio::task::spawn_blocking(move || convert_image(&source, &output, format, quality, &options))
            .await
            .map_err(|e| ActionError::Image(format!("Image task failed: {}", e)))??;

        ActionOutput::from_written(output_path, started).await
    }
}

/// Picks the encoder format for a job.
fn output_format(job: &ConversionJob) -> Result<ImageFormat, ActionError> {
    match &job.target_format {
        TargetFormat::KeepOriginal => ImageFormat::from_path(&job.source_path).map_err(|_| {
            ActionError::unsupported_format(
                job.source_path
                    .extension()
                    .map(|e| e.to_string_lossy().to_string())
                    .unwrap_or_default(),
            )
        }),
        TargetFormat::Format(ext) => {
            if !Category::Image.output_formats().contains(&ext.as_str()) {
                return Err(ActionError::unsupported_format(ext.clone()));
            }
            ImageFormat::from_extension(ext).ok_or_else(|| ActionError::unsupported_format(ext.clone()))
        }
    }
}

fn convert_image(
    source: &Path,
    output: &Path,
    format: ImageFormat,
    quality: u8,
    options: &JobOptions,
) -> Result<(), ActionError> {
    let mut img = ImageReader::open(source)?.with_guessed_format()?.decode()?;
    debug!(
        source = %source.display(),
        width = img.width(),
        height = img.height(),
        ?format,
        "Decoded image"
    );

    if let Some(crop) = &options.crop {
        img = crop_image(img, crop);
    }
    if let Some(resize) = options.resize.filter(ResizeSpec::is_effective) {
        img = resize_image(img, &resize);
    }

    encode_image(img, output, format, quality)
}

/// Crops to the part of `rect` that lies inside the image.
fn crop_image(img: DynamicImage, rect: &CropRect) -> DynamicImage {
    let (w, h) = (img.width(), img.height());
    if rect.x >= w || rect.y >= h {
        return img;
    }
    let width = rect.width.min(w - rect.x);
    let height = rect.height.min(h - rect.y);
    if width == 0 || height == 0 {
        return img;
    }
    img.crop_imm(rect.x, rect.y, width, height)
}

/// Resizes within the source bounds. `Fit` only ever shrinks and pads the
/// result onto a white canvas of the requested size.
fn resize_image(img: DynamicImage, spec: &ResizeSpec) -> DynamicImage {
    let (w, h) = (img.width(), img.height());
    let tw = spec.width.min(w);
    let th = spec.height.min(h);
    if tw == 0 || th == 0 {
        return img;
    }

    match spec.mode {
        ResizeMode::Stretch => {
            if (tw, th) == (w, h) {
                img
            } else {
                img.resize_exact(tw, th, FilterType::Lanczos3)
            }
        }
        ResizeMode::Fit => {
            let scale = (tw as f64 / w as f64).min(th as f64 / h as f64).min(1.0);
            if scale >= 1.0 {
                return img;
            }
            let new_w = ((w as f64 * scale) as u32).max(1);
            let new_h = ((h as f64 * scale) as u32).max(1);
            let resized = img
                .resize_exact(new_w, new_h, FilterType::Lanczos3)
                .to_rgb8();

            let mut canvas = RgbImage::from_pixel(tw, th, Rgb([255, 255, 255]));
            let x = (tw - new_w) / 2;
            let y = (th - new_h) / 2;
            image::imageops::overlay(&mut canvas, &resized, x as i64, y as i64);
            DynamicImage::ImageRgb8(canvas)
        }
    }
}

/// Whether the encoder for `format` takes a quality setting.
fn honours_quality(format: ImageFormat) -> bool {
    matches!(format, ImageFormat::Jpeg)
}

fn encode_image(
    img: DynamicImage,
    output: &Path,
    format: ImageFormat,
    quality: u8,
) -> Result<(), ActionError> {
    match format {
        ImageFormat::Jpeg => {
            let file = File::create(output)?;
            let encoder = JpegEncoder::new_with_quality(BufWriter::new(file), quality.clamp(1, 100));
            DynamicImage::ImageRgb8(img.to_rgb8()).write_with_encoder(encoder)?;
        }
        ImageFormat::WebP | ImageFormat::Gif => {
            DynamicImage::ImageRgba8(img.to_rgba8()).save_with_format(output, format)?;
        }
        _ => img.save_with_format(output, format)?,
    }
    Ok(())
}
