//! Landscape photography: richer color, local contrast on brightness,
//! then color denoising.

use image::{GrayImage, RgbImage};

use crate::config::LandscapeConfig;

use super::clahe::clahe;
use super::color::{hsv_to_rgb, rgb_to_hsv, to_u8};
use super::denoise::denoise_color;

/// Enhance a landscape photo.
///
/// 1. Multiply HSV saturation by `saturation_gain`, saturating at 255
/// 2. CLAHE on the value channel (hue untouched)
/// 3. Non-local means denoising in Lab
pub fn enhance_landscape(image: &RgbImage, config: &LandscapeConfig) -> RgbImage {
    let [h, s, v] = rgb_to_hsv(image);
    let s = apply_saturation_gain(&s, config.saturation_gain);
    let v = clahe(&v, &config.clahe);

    let vivid = hsv_to_rgb(&[h, s, v]);
    denoise_color(&vivid, &config.denoise)
}

/// Scale a saturation plane, clipping at 255.
pub fn apply_saturation_gain(saturation: &GrayImage, gain: f32) -> GrayImage {
    let mut out = saturation.clone();
    for p in out.pixels_mut() {
        p.0[0] = to_u8(p.0[0] as f32 * gain);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enhance::color::rgb_to_hsv_pixel;
    use image::{Luma, Rgb};

    fn mean_saturation(img: &RgbImage) -> f64 {
        let n = img.pixels().count() as f64;
        img.pixels()
            .map(|p| rgb_to_hsv_pixel(p.0)[1] as f64)
            .sum::<f64>()
            / n
    }

    #[test]
    fn test_saturation_increases() {
        let img = RgbImage::from_fn(32, 32, |x, y| {
            Rgb([100 + (x % 8) as u8, 140 + (y % 4) as u8, 90])
        });
        let out = enhance_landscape(&img, &LandscapeConfig::default());
        assert!(mean_saturation(&out) > mean_saturation(&img));
    }

    #[test]
    fn test_saturation_gain_clips_without_wrapping() {
        let plane = GrayImage::from_fn(3, 1, |x, _| Luma([[255, 213, 100][x as usize]]));
        let out = apply_saturation_gain(&plane, 1.2);
        assert_eq!(out.get_pixel(0, 0).0[0], 255);
        assert_eq!(out.get_pixel(1, 0).0[0], 255);
        assert_eq!(out.get_pixel(2, 0).0[0], 120);
    }

    #[test]
    fn test_fully_saturated_input_stays_saturated() {
        let img = RgbImage::from_fn(16, 16, |x, _| {
            if x % 2 == 0 {
                Rgb([255, 0, 0])
            } else {
                Rgb([0, 0, 255])
            }
        });
        let out = enhance_landscape(&img, &LandscapeConfig::default());
        assert_eq!(out.dimensions(), (16, 16));
        for p in out.pixels() {
            assert!(rgb_to_hsv_pixel(p.0)[1] >= 250, "saturation dropped: {:?}", p.0);
        }
    }

    #[test]
    fn test_zero_gain_gives_grayscale() {
        let config = LandscapeConfig {
            saturation_gain: 0.0,
            ..LandscapeConfig::default()
        };
        let img = RgbImage::from_pixel(16, 16, Rgb([30, 160, 60]));
        let out = enhance_landscape(&img, &config);
        for p in out.pixels() {
            let [r, g, b] = p.0;
            assert!((r as i16 - g as i16).abs() <= 3 && (g as i16 - b as i16).abs() <= 3);
        }
    }
}
