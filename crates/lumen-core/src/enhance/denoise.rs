//! Non-local means denoising.
//!
//! Every pixel becomes a weighted average of the pixels in its search
//! window, weighted by how similar their surrounding patches are:
//! `w = exp(-d² / h²)` with `d²` the mean squared patch difference.
//! Patch distances are computed one search offset at a time from a
//! summed-area table of squared differences, so the patch size does not
//! affect the cost.
//!
//! Color images are converted to Lab; lightness is filtered with `h` and
//! the two chroma channels are filtered together with `h_color`.

use image::{GrayImage, Luma, RgbImage};

use crate::config::DenoiseConfig;

use super::color::{lab_to_rgb, rgb_to_lab, to_u8};
use super::filter::reflect101;

/// Weights below this contribute nothing.
const WEIGHT_THRESHOLD: f32 = 0.001;

/// Denoise a single-channel image.
pub fn denoise_gray(image: &GrayImage, config: &DenoiseConfig) -> GrayImage {
    let mut out = nlm(
        &[image],
        config.h,
        config.template_window,
        config.search_window,
    );
    out.pop().unwrap_or_else(|| image.clone())
}

/// Denoise an RGB image in Lab space.
pub fn denoise_color(image: &RgbImage, config: &DenoiseConfig) -> RgbImage {
    let [l, a, b] = rgb_to_lab(image);

    let mut lightness = nlm(&[&l], config.h, config.template_window, config.search_window);
    let l = lightness.pop().unwrap_or(l);
    let mut ab = nlm(
        &[&a, &b],
        config.h_color,
        config.template_window,
        config.search_window,
    );
    let b = ab.pop().unwrap_or(b);
    let a = ab.pop().unwrap_or(a);

    lab_to_rgb(&[l, a, b])
}

/// Jointly denoise planes of equal size; patch distances average over all
/// planes.
fn nlm(
    planes: &[&GrayImage],
    h: f32,
    template_window: u32,
    search_window: u32,
) -> Vec<GrayImage> {
    let Some(first) = planes.first() else {
        return Vec::new();
    };
    let (width, height) = first.dimensions();
    if width == 0 || height == 0 || h <= 0.0 {
        return planes.iter().map(|p| (*p).clone()).collect();
    }

    let (w, ht) = (width as usize, height as usize);
    let tr = (template_window / 2) as usize;
    let sr = (search_window / 2) as usize;
    let border = tr + sr;
    let pw = w + 2 * border;
    let ph = ht + 2 * border;

    let padded: Vec<Vec<f32>> = planes
        .iter()
        .map(|plane| {
            let mut buf = Vec::with_capacity(pw * ph);
            for py in 0..ph {
                let sy = reflect101(py as isize - border as isize, ht);
                for px in 0..pw {
                    let sx = reflect101(px as isize - border as isize, w);
                    buf.push(plane.get_pixel(sx as u32, sy as u32).0[0] as f32);
                }
            }
            buf
        })
        .collect();

    // Squared differences are needed over the output area grown by the
    // template radius.
    let rw = w + 2 * tr;
    let rh = ht + 2 * tr;
    let stride = rw + 1;
    let tsize = 2 * tr + 1;
    let norm = 1.0 / ((tsize * tsize * planes.len()) as f64);
    let inv_h2 = 1.0 / (h * h);

    let mut integral = vec![0.0f64; stride * (rh + 1)];
    let mut sums = vec![vec![0.0f32; w * ht]; planes.len()];
    let mut weights = vec![0.0f32; w * ht];

    for dy in -(sr as isize)..=(sr as isize) {
        for dx in -(sr as isize)..=(sr as isize) {
            for j in 0..rh {
                let row = (j + sr) * pw + sr;
                let shifted = ((j + sr) as isize + dy) as usize * pw;
                let mut row_sum = 0.0f64;
                for i in 0..rw {
                    let a = row + i;
                    let b = shifted + ((i + sr) as isize + dx) as usize;
                    let d: f32 = padded
                        .iter()
                        .map(|p| {
                            let diff = p[a] - p[b];
                            diff * diff
                        })
                        .sum();
                    row_sum += d as f64;
                    integral[(j + 1) * stride + i + 1] = integral[j * stride + i + 1] + row_sum;
                }
            }

            for y in 0..ht {
                for x in 0..w {
                    let (x2, y2) = (x + tsize, y + tsize);
                    let box_sum = integral[y2 * stride + x2]
                        - integral[y * stride + x2]
                        - integral[y2 * stride + x]
                        + integral[y * stride + x];
                    let dist = (box_sum.max(0.0) * norm) as f32;
                    let weight = (-dist * inv_h2).exp();
                    if weight < WEIGHT_THRESHOLD {
                        continue;
                    }

                    let src = ((y + border) as isize + dy) as usize * pw
                        + ((x + border) as isize + dx) as usize;
                    let idx = y * w + x;
                    for (sum, p) in sums.iter_mut().zip(&padded) {
                        sum[idx] += weight * p[src];
                    }
                    weights[idx] += weight;
                }
            }
        }
    }

    sums.into_iter()
        .map(|sum| {
            GrayImage::from_fn(width, height, |x, y| {
                let idx = y as usize * w + x as usize;
                Luma([to_u8(sum[idx] / weights[idx])])
            })
        })
        .collect()
}
