//! Pure Rust codec backend.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Metadata (JPEG, PNG, TIFF, WebP) | `image::ImageReader` with format sniffing |
//! | Metadata (AVIF) | `avif-parse` container metadata (no decode) |
//! | Decode (JPEG, PNG, TIFF, WebP) | `image` crate (pure Rust decoders) |
//! | Decode (AVIF) | `avif-parse` + `rav1d`, see [`super::avif_decode`] |
//! | Resize | `image::DynamicImage::resize_exact` with `Lanczos3` |
//! | Encode → JPEG | `JpegEncoder::new_with_quality` |
//! | Encode → WebP | `WebPEncoder::new_lossless` (the only WebP encoder in `image`) |
//! | Encode → AVIF | `AvifEncoder` (rav1e, speed 6) |
//! | Encode → PNG / TIFF | `PngEncoder` / `TiffEncoder` |
//!
//! Resizes never upscale: a requested width beyond the source keeps the
//! source size.

use super::avif_decode::decode_avif;
use super::backend::{BackendError, ImageBackend};
use super::calculations::scaled_height;
use super::params::{EncodedImage, ResizeParams};
use crate::types::{Derivative, Format, ImageInfo};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Seek, Write};
use std::path::Path;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn is_avif(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("avif"))
}

fn format_from_image(format: ImageFormat) -> Option<Format> {
    match format {
        ImageFormat::Jpeg => Some(Format::Jpeg),
        ImageFormat::Png => Some(Format::Png),
        ImageFormat::WebP => Some(Format::Webp),
        ImageFormat::Avif => Some(Format::Avif),
        ImageFormat::Tiff => Some(Format::Tiff),
        _ => None,
    }
}

/// Extract dimensions from an AVIF file's container metadata (no full decode needed).
fn identify_avif(path: &Path) -> Result<ImageInfo, BackendError> {
    let file_data = std::fs::read(path)?;
    let avif = avif_parse::read_avif(&mut Cursor::new(&file_data)).map_err(|e| {
        BackendError::ProcessingFailed(format!("Failed to parse AVIF {}: {e:?}", path.display()))
    })?;
    let meta = avif.primary_item_metadata().map_err(|e| {
        BackendError::ProcessingFailed(format!(
            "Failed to read AVIF metadata {}: {e:?}",
            path.display()
        ))
    })?;
    Ok(ImageInfo {
        width: meta.max_frame_width.get(),
        height: meta.max_frame_height.get(),
        format: Format::Avif,
    })
}

/// Open an image and sniff its encoding from the content, not the extension.
fn open_reader(path: &Path) -> Result<ImageReader<BufReader<File>>, BackendError> {
    Ok(ImageReader::open(path)?.with_guessed_format()?)
}

/// Load and decode an image from disk, returning it with its source format.
fn load_image(path: &Path) -> Result<(DynamicImage, Format), BackendError> {
    if is_avif(path) {
        return Ok((decode_avif(path)?, Format::Avif));
    }
    let reader = open_reader(path)?;
    let format = reader
        .format()
        .and_then(format_from_image)
        .ok_or_else(|| BackendError::UnsupportedFormat(path.display().to_string()))?;
    let img = reader.decode().map_err(|e| {
        BackendError::ProcessingFailed(format!("Failed to decode {}: {}", path.display(), e))
    })?;
    Ok((img, format))
}

/// Encode `img` as `format` into `writer`.
fn encode<W: Write + Seek>(
    img: &DynamicImage,
    format: Format,
    quality: u32,
    writer: W,
) -> Result<(), BackendError> {
    let quality = quality.clamp(1, 100) as u8;
    let result = match format {
        Format::Jpeg => {
            // JPEG has no alpha channel.
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            rgb.write_with_encoder(image::codecs::jpeg::JpegEncoder::new_with_quality(
                writer, quality,
            ))
        }
        Format::Png => img.write_with_encoder(image::codecs::png::PngEncoder::new(writer)),
        Format::Webp => {
            let rgba = DynamicImage::ImageRgba8(img.to_rgba8());
            rgba.write_with_encoder(image::codecs::webp::WebPEncoder::new_lossless(writer))
        }
        Format::Avif => {
            let rgba = DynamicImage::ImageRgba8(img.to_rgba8());
            rgba.write_with_encoder(image::codecs::avif::AvifEncoder::new_with_speed_quality(
                writer, 6, quality,
            ))
        }
        Format::Tiff => img.write_with_encoder(image::codecs::tiff::TiffEncoder::new(writer)),
    };
    result.map_err(|e| BackendError::ProcessingFailed(format!("{format} encode failed: {e}")))
}

/// Decode, resize and pick the output format for `params`.
fn resized(params: &ResizeParams) -> Result<(DynamicImage, Format), BackendError> {
    let (img, source_format) = load_image(&params.source)?;
    // Never upscale: a width beyond the source keeps the source size.
    let width = params.width.min(img.width());
    let height = params
        .height
        .unwrap_or_else(|| scaled_height((img.width(), img.height()), width));
    let resized = img.resize_exact(width, height, FilterType::Lanczos3);
    let format = params.format.unwrap_or(source_format.inline_encoding());
    Ok((resized, format))
}

impl ImageBackend for RustBackend {
    fn metadata(&self, path: &Path) -> Result<ImageInfo, BackendError> {
        if is_avif(path) {
            return identify_avif(path);
        }
        let reader = open_reader(path)?;
        let format = reader
            .format()
            .and_then(format_from_image)
            .ok_or_else(|| BackendError::UnsupportedFormat(path.display().to_string()))?;
        let (width, height) = reader.into_dimensions().map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to read dimensions: {}", e))
        })?;
        Ok(ImageInfo {
            width,
            height,
            format,
        })
    }

    fn resize_to_file(
        &self,
        params: &ResizeParams,
        output: &Path,
    ) -> Result<Derivative, BackendError> {
        let (img, format) = resized(params)?;
        let file = File::create(output)?;
        let mut writer = BufWriter::new(file);
        encode(&img, format, params.quality.value(), &mut writer)?;
        writer.flush()?;
        Ok(Derivative {
            path: output.to_path_buf(),
            width: img.width(),
            height: img.height(),
        })
    }

    fn resize_to_buffer(&self, params: &ResizeParams) -> Result<EncodedImage, BackendError> {
        let (img, format) = resized(params)?;
        let mut bytes = Cursor::new(Vec::new());
        encode(&img, format, params.quality.value(), &mut bytes)?;
        Ok(EncodedImage {
            bytes: bytes.into_inner(),
            format,
            width: img.width(),
            height: img.height(),
        })
    }
}
