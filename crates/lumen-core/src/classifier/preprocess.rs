//! Image preprocessing for the CLIP visual encoder.
//!
//! CLIP ViT-B/32 expects:
//! - Input size: 224×224 pixels, shortest side resized then center-cropped
//! - Resampling: bicubic
//! - Normalization: per-channel (pixel/255 - mean) / std with CLIP's constants
//! - Channel order: RGB
//! - Tensor layout: NCHW [batch, channels, height, width]

use image::imageops::FilterType;
use image::DynamicImage;
use ndarray::Array4;

/// Number of color channels (RGB).
const CHANNELS: usize = 3;

/// CLIP normalization mean (per-channel).
const NORM_MEAN: [f32; 3] = [0.481_454_66, 0.457_827_5, 0.408_210_73];

/// CLIP normalization std (per-channel).
const NORM_STD: [f32; 3] = [0.268_629_54, 0.261_302_58, 0.275_777_11];

/// Preprocess an image for CLIP inference.
///
/// Grayscale and alpha inputs are converted to three-channel RGB first.
pub fn preprocess(image: &DynamicImage, image_size: u32) -> Array4<f32> {
    let fitted = image.resize_to_fill(image_size, image_size, FilterType::CatmullRom);
    let rgb = fitted.to_rgb8();

    let size = image_size as usize;
    let mut tensor = Array4::<f32>::zeros((1, CHANNELS, size, size));

    for (x, y, pixel) in rgb.enumerate_pixels() {
        for (c, &val) in pixel.0.iter().enumerate() {
            tensor[[0, c, y as usize, x as usize]] =
                (val as f32 / 255.0 - NORM_MEAN[c]) / NORM_STD[c];
        }
    }

    tensor
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage, RgbaImage};

    #[test]
    fn test_preprocess_shape_224() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(640, 480));
        let tensor = preprocess(&img, 224);
        assert_eq!(tensor.shape(), &[1, 3, 224, 224]);
    }

    #[test]
    fn test_preprocess_accepts_grayscale_and_rgba() {
        let gray = DynamicImage::ImageLuma8(GrayImage::new(50, 300));
        assert_eq!(preprocess(&gray, 224).shape(), &[1, 3, 224, 224]);

        let rgba = DynamicImage::ImageRgba8(RgbaImage::new(7, 9));
        assert_eq!(preprocess(&rgba, 224).shape(), &[1, 3, 224, 224]);
    }

    #[test]
    fn test_preprocess_normalizes_per_channel() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(32, 32, Rgb([255, 255, 255])));
        let tensor = preprocess(&img, 224);
        for c in 0..3 {
            let expected = (1.0 - NORM_MEAN[c]) / NORM_STD[c];
            assert!((tensor[[0, c, 100, 100]] - expected).abs() < 1e-4);
        }
    }

    #[test]
    fn test_preprocess_grayscale_replicates_channels() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(40, 40, Luma([128])));
        let tensor = preprocess(&img, 224);
        let v = 128.0 / 255.0;
        for c in 0..3 {
            let expected = (v - NORM_MEAN[c]) / NORM_STD[c];
            assert!((tensor[[0, c, 10, 10]] - expected).abs() < 1e-4);
        }
    }
}
