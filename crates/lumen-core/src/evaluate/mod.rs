//! Quality evaluation of an enhanced image against its original.
//!
//! Reports PSNR over the compared samples, mean SSIM on grayscale versions
//! of both images, and optionally the percentage change in mean
//! brightness. The metrics are informational: a higher PSNR or SSIM means
//! the enhancement changed less, not that it looks better.

pub mod metrics;

use image::{DynamicImage, GrayImage};

use crate::config::{ChannelMismatchPolicy, EvaluationConfig};
use crate::error::{PipelineError, Shape, Stage};
use crate::types::QualityMetrics;

use self::metrics::{mean_intensity, psnr, ssim};

/// Computes [`QualityMetrics`] for original/enhanced pairs.
#[derive(Debug, Clone, Default)]
pub struct QualityEvaluator {
    config: EvaluationConfig,
}

impl QualityEvaluator {
    /// Create an evaluator with the given settings.
    pub fn new(config: EvaluationConfig) -> Self {
        Self { config }
    }

    /// Whether metrics are computed by default.
    pub fn enabled(&self) -> bool {
        self.config.enabled
    }

    /// How a channel-count mismatch is handled.
    pub fn channel_mismatch(&self) -> ChannelMismatchPolicy {
        self.config.channel_mismatch
    }

    /// Compare an enhanced image with its original.
    ///
    /// Both images must have the same width and height. When one is
    /// grayscale and the other color, both are compared as grayscale unless
    /// the configured policy is `skip`, in which case this returns
    /// [`PipelineError::DimensionMismatch`]. Alpha channels are ignored.
    pub fn evaluate(
        &self,
        original: &DynamicImage,
        enhanced: &DynamicImage,
    ) -> Result<QualityMetrics, PipelineError> {
        if original.width() == 0 || original.height() == 0 {
            return Err(PipelineError::input(
                Stage::Evaluate,
                "original image has no pixels",
            ));
        }
        if original.width() != enhanced.width() || original.height() != enhanced.height() {
            return Err(mismatch(original, enhanced));
        }

        let original_color = is_color(original);
        let enhanced_color = is_color(enhanced);

        let (a, b) = match (original_color, enhanced_color) {
            (true, true) => (
                original.to_rgb8().into_raw(),
                enhanced.to_rgb8().into_raw(),
            ),
            (false, false) => (
                original.to_luma8().into_raw(),
                enhanced.to_luma8().into_raw(),
            ),
            _ => match self.config.channel_mismatch {
                ChannelMismatchPolicy::Grayscale => {
                    tracing::debug!("Channel counts differ; comparing grayscale versions");
                    (
                        original.to_luma8().into_raw(),
                        enhanced.to_luma8().into_raw(),
                    )
                }
                ChannelMismatchPolicy::Skip => return Err(mismatch(original, enhanced)),
            },
        };

        let gray_original = original.to_luma8();
        let gray_enhanced = enhanced.to_luma8();

        let psnr = psnr(&a, &b, self.config.psnr_ceiling);
        let ssim = ssim(&gray_original, &gray_enhanced, &self.config.ssim)?;
        let brightness_change = if self.config.brightness_change {
            brightness_change(&gray_original, &gray_enhanced)
        } else {
            None
        };

        tracing::debug!(psnr, ssim, ?brightness_change, "Quality metrics computed");

        Ok(QualityMetrics {
            psnr,
            ssim,
            brightness_change,
        })
    }
}

/// Percentage change in mean intensity, `None` for a black original.
fn brightness_change(original: &GrayImage, enhanced: &GrayImage) -> Option<f64> {
    let before = mean_intensity(original);
    if before == 0.0 {
        return None;
    }
    Some((mean_intensity(enhanced) - before) / before * 100.0)
}

fn is_color(image: &DynamicImage) -> bool {
    image.color().has_color()
}

fn shape(image: &DynamicImage) -> Shape {
    Shape {
        width: image.width(),
        height: image.height(),
        channels: image.color().channel_count(),
    }
}

fn mismatch(original: &DynamicImage, enhanced: &DynamicImage) -> PipelineError {
    PipelineError::DimensionMismatch {
        original: shape(original),
        enhanced: shape(enhanced),
    }
}
