//! Product photography: local contrast on lightness, sharpening, then
//! color denoising.

use image::RgbImage;

use crate::config::ProductConfig;

use super::clahe::clahe;
use super::color::{lab_to_rgb, rgb_to_lab};
use super::denoise::denoise_color;
use super::filter::convolve3x3;

/// Enhance a product photo.
///
/// 1. CLAHE on the Lab lightness channel (chroma untouched)
/// 2. 3×3 sharpening convolution on each RGB channel
/// 3. Non-local means denoising in Lab
pub fn enhance_product(image: &RgbImage, config: &ProductConfig) -> RgbImage {
    let [l, a, b] = rgb_to_lab(image);
    let l = clahe(&l, &config.clahe);
    let contrasted = lab_to_rgb(&[l, a, b]);

    let sharpened = convolve3x3(&contrasted, &config.sharpen_kernel);
    denoise_color(&sharpened, &config.denoise)
}
