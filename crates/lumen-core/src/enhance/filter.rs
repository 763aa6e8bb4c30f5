//! Small-kernel convolution and border handling.

use image::{ImageBuffer, Pixel};

use super::color::to_u8;

/// Map a possibly out-of-range coordinate into `0..n` by mirroring about
/// the edge pixels without repeating them (`dcb|abcd|cba`).
pub(crate) fn reflect101(i: isize, n: usize) -> usize {
    if n <= 1 {
        return 0;
    }
    let period = 2 * (n as isize - 1);
    let i = i.rem_euclid(period);
    if i >= n as isize {
        (period - i) as usize
    } else {
        i as usize
    }
}

/// Convolve every channel of an 8-bit image with a 3×3 kernel.
///
/// The kernel is row-major and applied without flipping. Borders are
/// mirrored and results are rounded and saturated to 0..=255.
pub fn convolve3x3<P>(
    image: &ImageBuffer<P, Vec<u8>>,
    kernel: &[f32; 9],
) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8>,
{
    let (width, height) = image.dimensions();
    let (w, h) = (width as usize, height as usize);
    let channels = P::CHANNEL_COUNT as usize;
    let src = image.as_raw();
    let mut out = vec![0u8; src.len()];

    for y in 0..h {
        let rows = [
            reflect101(y as isize - 1, h),
            y,
            reflect101(y as isize + 1, h),
        ];
        for x in 0..w {
            let cols = [
                reflect101(x as isize - 1, w),
                x,
                reflect101(x as isize + 1, w),
            ];
            for c in 0..channels {
                let mut acc = 0.0f32;
                for (ky, &sy) in rows.iter().enumerate() {
                    for (kx, &sx) in cols.iter().enumerate() {
                        acc += kernel[ky * 3 + kx] * src[(sy * w + sx) * channels + c] as f32;
                    }
                }
                out[(y * w + x) * channels + c] = to_u8(acc);
            }
        }
    }

    ImageBuffer::from_raw(width, height, out).unwrap_or_else(|| image.clone())
}
