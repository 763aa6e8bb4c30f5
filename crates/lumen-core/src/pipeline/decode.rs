//! Image decoding with content-based format detection and size limits.
//!
//! Decoded images are normalized to 8-bit samples, which is what the
//! enhancement chains operate on.

use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::Cursor;
use std::path::Path;

use crate::config::LimitsConfig;
use crate::error::PipelineError;

use super::hash::content_hash_from_bytes;

/// Image decoder with configurable limits.
pub struct ImageDecoder {
    limits: LimitsConfig,
}

/// Result of decoding an image file.
#[derive(Debug)]
pub struct DecodedImage {
    /// The decoded image, 8 bits per sample
    pub image: DynamicImage,
    /// Detected image format
    pub format: ImageFormat,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Original file size in bytes
    pub file_size: u64,
    /// BLAKE3 hash of the file bytes
    pub content_hash: String,
}

impl ImageDecoder {
    /// Create a new decoder with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Read and decode a file.
    pub fn decode_file(&self, path: &Path) -> Result<DecodedImage, PipelineError> {
        let bytes = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => PipelineError::FileNotFound(path.to_path_buf()),
            _ => PipelineError::Decode {
                path: path.to_path_buf(),
                message: format!("Cannot read file: {e}"),
            },
        })?;
        self.decode_bytes(&bytes, path)
    }

    /// Decode an in-memory file. `path` is used for error messages and as
    /// a format hint when the content is not recognized.
    ///
    /// Dimensions are checked from the header before the pixel data is
    /// decoded.
    pub fn decode_bytes(&self, bytes: &[u8], path: &Path) -> Result<DecodedImage, PipelineError> {
        let file_size = bytes.len() as u64;
        let max_bytes = self.limits.max_file_size_mb * 1024 * 1024;
        if file_size > max_bytes {
            return Err(PipelineError::FileTooLarge {
                path: path.to_path_buf(),
                size_mb: file_size / (1024 * 1024),
                max_mb: self.limits.max_file_size_mb,
            });
        }

        let format = detect_format(bytes, path)?;

        let (width, height) = reader(bytes, format)
            .into_dimensions()
            .map_err(|e| decode_error(path, e))?;
        let max_dim = self.limits.max_image_dimension;
        if width > max_dim || height > max_dim {
            return Err(PipelineError::ImageTooLarge {
                width,
                height,
                max_dim,
            });
        }

        let image = reader(bytes, format)
            .decode()
            .map_err(|e| decode_error(path, e))?;
        let image = to_eight_bit(image);

        Ok(DecodedImage {
            image,
            format,
            width,
            height,
            file_size,
            content_hash: content_hash_from_bytes(bytes),
        })
    }
}

fn reader(bytes: &[u8], format: ImageFormat) -> ImageReader<Cursor<&[u8]>> {
    ImageReader::with_format(Cursor::new(bytes), format)
}

/// Detect the format from content, falling back to the file extension.
fn detect_format(bytes: &[u8], path: &Path) -> Result<ImageFormat, PipelineError> {
    if let Ok(format) = image::guess_format(bytes) {
        return Ok(format);
    }
    ImageFormat::from_path(path).map_err(|_| PipelineError::UnsupportedFormat {
        path: path.to_path_buf(),
        format: path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("unknown")
            .to_string(),
    })
}

fn decode_error(path: &Path, e: image::ImageError) -> PipelineError {
    PipelineError::Decode {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

/// Convert 16-bit and float images to 8 bits per sample, keeping the
/// channel layout.
pub fn to_eight_bit(image: DynamicImage) -> DynamicImage {
    let color = image.color();
    if color.bytes_per_pixel() == color.channel_count() {
        return image;
    }
    match (color.has_color(), color.has_alpha()) {
        (false, false) => DynamicImage::ImageLuma8(image.to_luma8()),
        (false, true) => DynamicImage::ImageLumaA8(image.to_luma_alpha8()),
        (true, false) => DynamicImage::ImageRgb8(image.to_rgb8()),
        (true, true) => DynamicImage::ImageRgba8(image.to_rgba8()),
    }
}

/// Convert an ImageFormat to a string representation.
pub fn format_to_string(format: ImageFormat) -> String {
    match format {
        ImageFormat::Jpeg => "jpeg".to_string(),
        ImageFormat::Png => "png".to_string(),
        ImageFormat::WebP => "webp".to_string(),
        ImageFormat::Gif => "gif".to_string(),
        ImageFormat::Tiff => "tiff".to_string(),
        ImageFormat::Bmp => "bmp".to_string(),
        _ => "unknown".to_string(),
    }
}
