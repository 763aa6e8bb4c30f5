//! Document scans: grayscale, binarization, denoising and optional local
//! contrast. Output is always single-channel.

use image::{GrayImage, Luma};
use imageproc::contrast::{otsu_level, threshold, ThresholdType};
use imageproc::filter::gaussian_blur_f32;

use crate::config::{BinarizeMethod, DocumentConfig};

use super::clahe::clahe;
use super::denoise::denoise_gray;

/// Enhance a document scan from its grayscale version.
pub fn enhance_document(gray: &GrayImage, config: &DocumentConfig) -> GrayImage {
    let binary = binarize(gray, config.binarize);
    let denoised = denoise_gray(&binary, &config.denoise);
    match &config.clahe {
        Some(clahe_config) => clahe(&denoised, clahe_config),
        None => denoised,
    }
}

/// Reduce a grayscale image to pure black (0) and white (255).
pub fn binarize(gray: &GrayImage, method: BinarizeMethod) -> GrayImage {
    match method {
        BinarizeMethod::Otsu => {
            let level = otsu_level(gray);
            tracing::debug!(level, "Otsu threshold computed");
            threshold(gray, level, ThresholdType::Binary)
        }
        BinarizeMethod::Adaptive {
            block_radius,
            offset,
        } => adaptive_threshold(gray, block_radius, offset),
    }
}

/// Gaussian-weighted local thresholding: a pixel is white when it is
/// brighter than the Gaussian mean of its `(2r+1)²` neighbourhood minus
/// `offset`. Sigma is derived from the block size as `0.3·(r − 1) + 0.8`.
fn adaptive_threshold(gray: &GrayImage, block_radius: u32, offset: i32) -> GrayImage {
    let sigma = 0.3 * (block_radius as f32 - 1.0) + 0.8;
    let local_mean = gaussian_blur_f32(gray, sigma);

    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let level = local_mean.get_pixel(x, y).0[0] as i32 - offset;
        let value = gray.get_pixel(x, y).0[0] as i32;
        Luma([if value > level { 255 } else { 0 }])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_binary(img: &GrayImage) -> bool {
        img.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255)
    }

    /// Dark text strokes on a light, unevenly lit page.
    fn page() -> GrayImage {
        GrayImage::from_fn(48, 32, |x, y| {
            let background = 170 + (x * 60 / 48) as u8;
            if (x / 3) % 4 == 0 && y % 8 < 5 {
                Luma([background - 120])
            } else {
                Luma([background])
            }
        })
    }

    #[test]
    fn test_otsu_binarization_is_binary() {
        let out = binarize(&page(), BinarizeMethod::Otsu);
        assert!(is_binary(&out));
        assert!(out.pixels().any(|p| p.0[0] == 0));
        assert!(out.pixels().any(|p| p.0[0] == 255));
    }

    #[test]
    fn test_adaptive_binarization_is_binary() {
        let method = BinarizeMethod::Adaptive {
            block_radius: 5,
            offset: 2,
        };
        let out = binarize(&page(), method);
        assert!(is_binary(&out));
        // Stroke pixel is dark, background pixel is white.
        assert_eq!(out.get_pixel(0, 0).0[0], 0);
        assert_eq!(out.get_pixel(5, 6).0[0], 255);
    }

    #[test]
    fn test_adaptive_uniform_page_is_white() {
        let img = GrayImage::from_pixel(20, 20, Luma([40]));
        let method = BinarizeMethod::Adaptive {
            block_radius: 5,
            offset: 2,
        };
        assert!(binarize(&img, method).pixels().all(|p| p.0[0] == 255));
    }

    #[test]
    fn test_enhance_document_keeps_dimensions() {
        let out = enhance_document(&page(), &DocumentConfig::default());
        assert_eq!(out.dimensions(), (48, 32));
    }

    #[test]
    fn test_enhance_document_without_clahe_stays_binary_on_clean_page() {
        let config = DocumentConfig {
            clahe: None,
            ..DocumentConfig::default()
        };
        let img = GrayImage::from_fn(30, 30, |x, _| Luma([if x < 15 { 20 } else { 230 }]));
        let out = enhance_document(&img, &config);
        assert!(is_binary(&out));
    }
}
