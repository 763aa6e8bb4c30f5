//! Full-reference image quality metrics on 8-bit samples.

use image::GrayImage;

use crate::config::SsimConfig;
use crate::error::{PipelineError, Stage};

/// Dynamic range of 8-bit samples.
const DATA_RANGE: f64 = 255.0;

/// Mean squared error between two equally sized sample buffers.
pub fn mse(a: &[u8], b: &[u8]) -> f64 {
    if a.is_empty() {
        return 0.0;
    }
    let sum: f64 = a
        .iter()
        .zip(b)
        .map(|(&x, &y)| {
            let d = x as f64 - y as f64;
            d * d
        })
        .sum();
    sum / a.len() as f64
}

/// Peak signal-to-noise ratio in dB.
///
/// Identical buffers have no noise; they report `ceiling` instead of
/// infinity.
pub fn psnr(a: &[u8], b: &[u8], ceiling: f64) -> f64 {
    let mse = mse(a, b);
    if mse == 0.0 {
        return ceiling;
    }
    20.0 * (DATA_RANGE / mse.sqrt()).log10()
}

/// Mean structural similarity of two grayscale images.
///
/// Statistics come from a square uniform window with sample covariance,
/// evaluated at every position where the window lies fully inside the
/// image; the result is the mean over those positions.
pub fn ssim(a: &GrayImage, b: &GrayImage, config: &SsimConfig) -> Result<f64, PipelineError> {
    let (width, height) = a.dimensions();
    let win = config.window as usize;
    let (w, h) = (width as usize, height as usize);
    if w < win || h < win {
        return Err(PipelineError::input(
            Stage::Evaluate,
            format!(
                "image {width}x{height} is smaller than the {win}x{win} similarity window"
            ),
        ));
    }

    let sums = MomentTables::new(a, b);

    let np = (win * win) as f64;
    let cov_norm = np / (np - 1.0);
    let c1 = (config.k1 * DATA_RANGE).powi(2);
    let c2 = (config.k2 * DATA_RANGE).powi(2);

    let mut total = 0.0;
    let mut count = 0usize;
    for y in 0..=h - win {
        for x in 0..=w - win {
            let [sx, sy, sxx, syy, sxy] = sums.window(x, y, win);
            let (ux, uy) = (sx / np, sy / np);
            let vx = cov_norm * (sxx / np - ux * ux);
            let vy = cov_norm * (syy / np - uy * uy);
            let vxy = cov_norm * (sxy / np - ux * uy);

            let numerator = (2.0 * ux * uy + c1) * (2.0 * vxy + c2);
            let denominator = (ux * ux + uy * uy + c1) * (vx + vy + c2);
            total += numerator / denominator;
            count += 1;
        }
    }

    Ok(total / count as f64)
}

/// Mean intensity of a grayscale image.
pub fn mean_intensity(image: &GrayImage) -> f64 {
    let raw = image.as_raw();
    if raw.is_empty() {
        return 0.0;
    }
    raw.iter().map(|&v| v as f64).sum::<f64>() / raw.len() as f64
}

/// Summed-area tables of x, y, x², y² and xy.
struct MomentTables {
    stride: usize,
    tables: [Vec<f64>; 5],
}

impl MomentTables {
    fn new(a: &GrayImage, b: &GrayImage) -> Self {
        let (w, h) = (a.width() as usize, a.height() as usize);
        let stride = w + 1;
        let mut tables: [Vec<f64>; 5] = std::array::from_fn(|_| vec![0.0; stride * (h + 1)]);
        let (ra, rb) = (a.as_raw(), b.as_raw());

        for y in 0..h {
            let mut row = [0.0f64; 5];
            for x in 0..w {
                let xv = ra[y * w + x] as f64;
                let yv = rb[y * w + x] as f64;
                let moments = [xv, yv, xv * xv, yv * yv, xv * yv];
                let idx = (y + 1) * stride + x + 1;
                let above = y * stride + x + 1;
                for (k, table) in tables.iter_mut().enumerate() {
                    row[k] += moments[k];
                    table[idx] = table[above] + row[k];
                }
            }
        }

        Self { stride, tables }
    }

    /// Sums of each moment over the `win`×`win` window at (x, y).
    fn window(&self, x: usize, y: usize, win: usize) -> [f64; 5] {
        let s = self.stride;
        let (x2, y2) = (x + win, y + win);
        std::array::from_fn(|k| {
            let t = &self.tables[k];
            t[y2 * s + x2] - t[y * s + x2] - t[y2 * s + x] + t[y * s + x]
        })
    }
}
