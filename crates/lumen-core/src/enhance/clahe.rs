//! Contrast-limited adaptive histogram equalization (CLAHE).
//!
//! The image is split into a grid of tiles. Each tile gets its own
//! equalization lookup table, built from a histogram whose bins are clipped
//! at `clip_limit` times the uniform bin height with the excess spread back
//! over all bins. Output pixels blend the four nearest tile tables
//! bilinearly so tile seams do not show.
//!
//! Images whose sides are not a multiple of the grid are padded by
//! reflection before tiling, so any image of at least one pixel works,
//! including images smaller than the grid.

use image::{GrayImage, Luma};

use crate::config::ClaheConfig;

use super::filter::reflect101;

const BINS: usize = 256;

/// Apply CLAHE to a single 8-bit channel.
pub fn clahe(image: &GrayImage, config: &ClaheConfig) -> GrayImage {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return image.clone();
    }

    let tiles_x = config.tile_grid[0].max(1) as usize;
    let tiles_y = config.tile_grid[1].max(1) as usize;
    let (w, h) = (width as usize, height as usize);

    let tile_w = w.div_ceil(tiles_x);
    let tile_h = h.div_ceil(tiles_y);
    let tile_area = tile_w * tile_h;

    let clip = if config.clip_limit > 0.0 {
        ((config.clip_limit as f64 * tile_area as f64 / BINS as f64) as usize).max(1)
    } else {
        usize::MAX
    };
    let lut_scale = (BINS - 1) as f32 / tile_area as f32;

    let mut luts = vec![[0u8; BINS]; tiles_x * tiles_y];
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let mut hist = [0usize; BINS];
            for y in ty * tile_h..(ty + 1) * tile_h {
                let sy = reflect101(y as isize, h);
                for x in tx * tile_w..(tx + 1) * tile_w {
                    let sx = reflect101(x as isize, w);
                    hist[image.get_pixel(sx as u32, sy as u32).0[0] as usize] += 1;
                }
            }
            clip_histogram(&mut hist, clip);

            let lut = &mut luts[ty * tiles_x + tx];
            let mut sum = 0usize;
            for (entry, &count) in lut.iter_mut().zip(hist.iter()) {
                sum += count;
                *entry = (sum as f32 * lut_scale).round().min(255.0) as u8;
            }
        }
    }

    let inv_tw = 1.0 / tile_w as f32;
    let inv_th = 1.0 / tile_h as f32;

    // Per-column neighbours and weights are the same for every row.
    let columns: Vec<(usize, usize, f32)> = (0..w)
        .map(|x| {
            let txf = x as f32 * inv_tw - 0.5;
            let tx1 = txf.floor();
            let xa = txf - tx1;
            let tx1 = tx1 as isize;
            let left = tx1.max(0) as usize;
            let right = ((tx1 + 1) as usize).min(tiles_x - 1);
            (left, right, xa)
        })
        .collect();

    let mut out = GrayImage::new(width, height);
    for y in 0..h {
        let tyf = y as f32 * inv_th - 0.5;
        let ty1 = tyf.floor();
        let ya = tyf - ty1;
        let ty1 = ty1 as isize;
        let top = ty1.max(0) as usize;
        let bottom = ((ty1 + 1) as usize).min(tiles_y - 1);

        for (x, &(left, right, xa)) in columns.iter().enumerate() {
            let v = image.get_pixel(x as u32, y as u32).0[0] as usize;
            let lut = |tx: usize, ty: usize| luts[ty * tiles_x + tx][v] as f32;

            let upper = lut(left, top) * (1.0 - xa) + lut(right, top) * xa;
            let lower = lut(left, bottom) * (1.0 - xa) + lut(right, bottom) * xa;
            let value = upper * (1.0 - ya) + lower * ya;
            out.put_pixel(x as u32, y as u32, Luma([super::color::to_u8(value)]));
        }
    }

    out
}

/// Clip histogram bins at `limit` and redistribute the excess.
///
/// The excess is spread evenly over all bins; whatever does not divide
/// evenly is handed out one count at a time at a fixed stride.
fn clip_histogram(hist: &mut [usize; BINS], limit: usize) {
    let mut clipped = 0usize;
    for count in hist.iter_mut() {
        if *count > limit {
            clipped += *count - limit;
            *count = limit;
        }
    }
    if clipped == 0 {
        return;
    }

    let batch = clipped / BINS;
    let mut residual = clipped - batch * BINS;
    for count in hist.iter_mut() {
        *count += batch;
    }

    if residual > 0 {
        let step = (BINS / residual).max(1);
        let mut i = 0;
        while i < BINS && residual > 0 {
            hist[i] += 1;
            residual -= 1;
            i += step;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(clip_limit: f32, grid: u32) -> ClaheConfig {
        ClaheConfig {
            clip_limit,
            tile_grid: [grid, grid],
        }
    }

    #[test]
    fn test_clip_histogram_preserves_total() {
        let mut hist = [0usize; BINS];
        hist[10] = 1000;
        hist[200] = 24;
        clip_histogram(&mut hist, 40);
        assert_eq!(hist.iter().sum::<usize>(), 1024);
        assert!(hist.iter().all(|&c| c <= 40 + 1000 / BINS + 1));
    }

    #[test]
    fn test_uniform_image_stays_uniform() {
        let img = GrayImage::from_pixel(64, 64, Luma([100]));
        let out = clahe(&img, &config(2.0, 8));
        let first = out.get_pixel(0, 0).0[0];
        assert!(out.pixels().all(|p| p.0[0] == first));
    }

    #[test]
    fn test_preserves_dimensions_when_not_divisible() {
        let img = GrayImage::from_fn(37, 23, |x, y| Luma([((x * 7 + y * 3) % 256) as u8]));
        let out = clahe(&img, &config(3.0, 8));
        assert_eq!(out.dimensions(), (37, 23));
    }

    #[test]
    fn test_image_smaller_than_grid() {
        let img = GrayImage::from_pixel(1, 1, Luma([42]));
        let out = clahe(&img, &config(2.0, 8));
        assert_eq!(out.dimensions(), (1, 1));

        let img = GrayImage::from_fn(3, 5, |x, y| Luma([(x * 40 + y * 10) as u8]));
        let out = clahe(&img, &config(2.0, 8));
        assert_eq!(out.dimensions(), (3, 5));
    }

    #[test]
    fn test_stretches_low_contrast_gradient() {
        // Values squeezed into 100..=131
        let img = GrayImage::from_fn(64, 64, |x, _| Luma([100 + (x / 2) as u8]));
        let out = clahe(&img, &config(40.0, 1));

        let (min_in, max_in) = (100u8, 131u8);
        let min_out = out.pixels().map(|p| p.0[0]).min().unwrap();
        let max_out = out.pixels().map(|p| p.0[0]).max().unwrap();
        assert!(max_out - min_out > max_in - min_in);
    }

    #[test]
    fn test_monotonic_within_single_tile() {
        let img = GrayImage::from_fn(32, 32, |x, y| Luma([((x + y) * 4) as u8]));
        let out = clahe(&img, &config(4.0, 1));
        for y in 0..32 {
            for x in 1..32 {
                assert!(out.get_pixel(x, y).0[0] >= out.get_pixel(x - 1, y).0[0]);
            }
        }
    }
}
