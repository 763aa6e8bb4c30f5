//! Domain-specific enhancement.
//!
//! Each domain has a fixed chain of classical operations:
//!
//! ```text
//! product   → Lab CLAHE (L) → 3×3 sharpen → NLM denoise (color)
//! document  → grayscale → binarize → NLM denoise (gray) → CLAHE
//! landscape → HSV saturation gain → CLAHE (V) → NLM denoise (color)
//! ```
//!
//! All transforms are deterministic and never modify their input. Color
//! results are 8-bit RGB with the same width and height as the input;
//! document results are 8-bit single-channel.

pub mod clahe;
pub mod color;
pub mod denoise;
pub mod document;
pub mod filter;
pub mod landscape;
pub mod product;

use image::{ColorType, DynamicImage};

use crate::config::EnhancementConfig;
use crate::error::{PipelineError, Stage};
use crate::types::Domain;

use self::document::enhance_document;
use self::landscape::enhance_landscape;
use self::product::enhance_product;

/// Applies the enhancement chain for a domain.
#[derive(Debug, Clone, Default)]
pub struct Enhancer {
    config: EnhancementConfig,
}

impl Enhancer {
    /// Create an enhancer with the given constants.
    pub fn new(config: EnhancementConfig) -> Self {
        Self { config }
    }

    /// The constants this enhancer applies.
    pub fn config(&self) -> &EnhancementConfig {
        &self.config
    }

    /// Enhance an image for the given domain.
    ///
    /// Accepts 8-bit grayscale, grayscale+alpha, RGB and RGBA input. Alpha
    /// is discarded. Grayscale input to the color branches is expanded to
    /// three identical channels.
    pub fn enhance(
        &self,
        image: &DynamicImage,
        domain: Domain,
    ) -> Result<DynamicImage, PipelineError> {
        check_input(image)?;
        tracing::debug!(
            domain = %domain,
            width = image.width(),
            height = image.height(),
            "Enhancing image"
        );

        let enhanced = match domain {
            Domain::Product => {
                DynamicImage::ImageRgb8(enhance_product(&image.to_rgb8(), &self.config.product))
            }
            Domain::Document => DynamicImage::ImageLuma8(enhance_document(
                &image.to_luma8(),
                &self.config.document,
            )),
            Domain::Landscape => DynamicImage::ImageRgb8(enhance_landscape(
                &image.to_rgb8(),
                &self.config.landscape,
            )),
        };

        Ok(enhanced)
    }
}

/// Reject images the enhancement chains cannot process.
fn check_input(image: &DynamicImage) -> Result<(), PipelineError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(PipelineError::input(
            Stage::Enhance,
            format!(
                "image has no pixels ({}x{})",
                image.width(),
                image.height()
            ),
        ));
    }

    match image.color() {
        ColorType::L8 | ColorType::La8 | ColorType::Rgb8 | ColorType::Rgba8 => Ok(()),
        other => Err(PipelineError::input(
            Stage::Enhance,
            format!("unsupported pixel format {other:?}; expected 8-bit gray or color"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, ImageBuffer, Luma, Rgb, RgbImage, Rgba, RgbaImage};

    fn gradient() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(24, 16, |x, y| {
            Rgb([(x * 10) as u8, (y * 15) as u8, 120])
        }))
    }

    #[test]
    fn test_color_domains_return_rgb_same_size() {
        let enhancer = Enhancer::default();
        for domain in [Domain::Product, Domain::Landscape] {
            let out = enhancer.enhance(&gradient(), domain).unwrap();
            assert_eq!(out.color(), ColorType::Rgb8);
            assert_eq!((out.width(), out.height()), (24, 16));
        }
    }

    #[test]
    fn test_document_returns_single_channel() {
        let enhancer = Enhancer::default();
        let rgb = enhancer.enhance(&gradient(), Domain::Document).unwrap();
        assert_eq!(rgb.color(), ColorType::L8);

        let rgba = DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([9, 9, 9, 128])));
        let out = enhancer.enhance(&rgba, Domain::Document).unwrap();
        assert_eq!(out.color(), ColorType::L8);
        assert_eq!((out.width(), out.height()), (10, 10));
    }

    #[test]
    fn test_grayscale_input_to_color_branch() {
        let enhancer = Enhancer::default();
        let gray = DynamicImage::ImageLuma8(GrayImage::from_pixel(12, 12, Luma([90])));
        let out = enhancer.enhance(&gray, Domain::Landscape).unwrap();
        assert_eq!(out.color(), ColorType::Rgb8);
    }

    #[test]
    fn test_zero_sized_image_rejected() {
        let enhancer = Enhancer::default();
        let empty = DynamicImage::ImageRgb8(RgbImage::new(0, 5));
        let err = enhancer.enhance(&empty, Domain::Product).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Enhance));
    }

    #[test]
    fn test_sixteen_bit_image_rejected() {
        let enhancer = Enhancer::default();
        let img: ImageBuffer<Rgb<u16>, Vec<u16>> = ImageBuffer::new(4, 4);
        let err = enhancer
            .enhance(&DynamicImage::ImageRgb16(img), Domain::Landscape)
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Input {
                stage: Stage::Enhance,
                ..
            }
        ));
    }

    #[test]
    fn test_input_not_modified() {
        let enhancer = Enhancer::default();
        let original = gradient();
        let copy = original.clone();
        let _ = enhancer.enhance(&original, Domain::Product).unwrap();
        assert_eq!(original, copy);
    }

    #[test]
    fn test_one_pixel_image() {
        let enhancer = Enhancer::default();
        let tiny = DynamicImage::ImageRgb8(RgbImage::from_pixel(1, 1, Rgb([10, 200, 30])));
        for domain in Domain::ALL {
            let out = enhancer.enhance(&tiny, domain).unwrap();
            assert_eq!((out.width(), out.height()), (1, 1));
        }
    }
}
