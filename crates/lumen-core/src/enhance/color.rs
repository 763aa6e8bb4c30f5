//! 8-bit color space conversions.
//!
//! Both conversions use the common 8-bit encodings so that per-channel
//! operations (CLAHE, saturation gain) see familiar value ranges:
//! - Lab: L scaled to 0..255, a and b offset by 128 (sRGB, D65 white point)
//! - HSV: H halved to 0..180, S and V in 0..255
//!
//! Channels are returned as separate single-channel planes.

use image::{GrayImage, Rgb, RgbImage};

// sRGB → XYZ (D65)
const RGB_TO_XYZ: [[f32; 3]; 3] = [
    [0.412_453, 0.357_580, 0.180_423],
    [0.212_671, 0.715_160, 0.072_169],
    [0.019_334, 0.119_193, 0.950_227],
];

// XYZ (D65) → sRGB
const XYZ_TO_RGB: [[f32; 3]; 3] = [
    [3.240_479, -1.537_150, -0.498_535],
    [-0.969_256, 1.875_991, 0.041_556],
    [0.055_648, -0.204_043, 1.057_311],
];

const WHITE_X: f32 = 0.950_456;
const WHITE_Z: f32 = 1.088_754;

/// CIE threshold between the cube-root and linear segments.
const LAB_EPSILON: f32 = 0.008_856;
const LAB_KAPPA: f32 = 903.3;

/// Three single-channel planes of one image.
pub type Planes = [GrayImage; 3];

fn srgb_to_linear(c: u8) -> f32 {
    let c = c as f32 / 255.0;
    if c <= 0.040_45 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_to_srgb(c: f32) -> u8 {
    let c = c.clamp(0.0, 1.0);
    let encoded = if c <= 0.003_130_8 {
        12.92 * c
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    };
    to_u8(encoded * 255.0)
}

fn lab_f(t: f32) -> f32 {
    if t > LAB_EPSILON {
        t.cbrt()
    } else {
        7.787 * t + 16.0 / 116.0
    }
}

fn lab_f_inv(f: f32) -> f32 {
    let cube = f * f * f;
    if cube > LAB_EPSILON {
        cube
    } else {
        (f - 16.0 / 116.0) / 7.787
    }
}

/// Round and saturate to the 8-bit range.
pub(crate) fn to_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

fn mat_mul(m: &[[f32; 3]; 3], v: [f32; 3]) -> [f32; 3] {
    [
        m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
        m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
        m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
    ]
}

fn split_with(image: &RgbImage, convert: impl Fn([u8; 3]) -> [u8; 3]) -> Planes {
    let (w, h) = image.dimensions();
    let mut planes = [GrayImage::new(w, h), GrayImage::new(w, h), GrayImage::new(w, h)];
    for (x, y, pixel) in image.enumerate_pixels() {
        let out = convert(pixel.0);
        for (plane, value) in planes.iter_mut().zip(out) {
            plane.put_pixel(x, y, image::Luma([value]));
        }
    }
    planes
}

fn merge_with(planes: &Planes, convert: impl Fn([u8; 3]) -> [u8; 3]) -> RgbImage {
    let (w, h) = planes[0].dimensions();
    RgbImage::from_fn(w, h, |x, y| {
        let v = [
            planes[0].get_pixel(x, y).0[0],
            planes[1].get_pixel(x, y).0[0],
            planes[2].get_pixel(x, y).0[0],
        ];
        Rgb(convert(v))
    })
}

/// Convert one RGB pixel to 8-bit Lab.
pub fn rgb_to_lab_pixel(rgb: [u8; 3]) -> [u8; 3] {
    let linear = [
        srgb_to_linear(rgb[0]),
        srgb_to_linear(rgb[1]),
        srgb_to_linear(rgb[2]),
    ];
    let [x, y, z] = mat_mul(&RGB_TO_XYZ, linear);
    let (fx, fy, fz) = (lab_f(x / WHITE_X), lab_f(y), lab_f(z / WHITE_Z));

    let l = if y > LAB_EPSILON {
        116.0 * fy - 16.0
    } else {
        LAB_KAPPA * y
    };
    let a = 500.0 * (fx - fy);
    let b = 200.0 * (fy - fz);

    [to_u8(l * 255.0 / 100.0), to_u8(a + 128.0), to_u8(b + 128.0)]
}

/// Convert one 8-bit Lab pixel back to RGB.
pub fn lab_to_rgb_pixel(lab: [u8; 3]) -> [u8; 3] {
    let l = lab[0] as f32 * 100.0 / 255.0;
    let a = lab[1] as f32 - 128.0;
    let b = lab[2] as f32 - 128.0;

    let fy = (l + 16.0) / 116.0;
    let fx = fy + a / 500.0;
    let fz = fy - b / 200.0;

    let y = if l > LAB_KAPPA * LAB_EPSILON {
        fy * fy * fy
    } else {
        l / LAB_KAPPA
    };
    let x = lab_f_inv(fx) * WHITE_X;
    let z = lab_f_inv(fz) * WHITE_Z;

    let [r, g, b] = mat_mul(&XYZ_TO_RGB, [x, y, z]);
    [linear_to_srgb(r), linear_to_srgb(g), linear_to_srgb(b)]
}

/// Convert one RGB pixel to 8-bit HSV.
pub fn rgb_to_hsv_pixel(rgb: [u8; 3]) -> [u8; 3] {
    let [r, g, b] = rgb.map(|c| c as f32);
    let v = r.max(g).max(b);
    let min = r.min(g).min(b);
    let diff = v - min;

    let s = if v > 0.0 { 255.0 * diff / v } else { 0.0 };

    let mut h = if diff == 0.0 {
        0.0
    } else if v == r {
        60.0 * (g - b) / diff
    } else if v == g {
        120.0 + 60.0 * (b - r) / diff
    } else {
        240.0 + 60.0 * (r - g) / diff
    };
    if h < 0.0 {
        h += 360.0;
    }

    // 360° does not fit a byte; hue is stored halved and wraps at 180.
    let h = to_u8(h / 2.0);
    [if h >= 180 { 0 } else { h }, to_u8(s), to_u8(v)]
}

/// Convert one 8-bit HSV pixel back to RGB.
pub fn hsv_to_rgb_pixel(hsv: [u8; 3]) -> [u8; 3] {
    let h = (hsv[0] as f32 * 2.0) % 360.0;
    let s = hsv[1] as f32 / 255.0;
    let v = hsv[2] as f32;

    let sector = h / 60.0;
    let i = sector.floor();
    let f = sector - i;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));

    let (r, g, b) = match i as u8 {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };
    [to_u8(r), to_u8(g), to_u8(b)]
}

/// Split an RGB image into 8-bit L, a, b planes.
pub fn rgb_to_lab(image: &RgbImage) -> Planes {
    split_with(image, rgb_to_lab_pixel)
}

/// Merge 8-bit L, a, b planes back into an RGB image.
pub fn lab_to_rgb(planes: &Planes) -> RgbImage {
    merge_with(planes, lab_to_rgb_pixel)
}

/// Split an RGB image into 8-bit H, S, V planes.
pub fn rgb_to_hsv(image: &RgbImage) -> Planes {
    split_with(image, rgb_to_hsv_pixel)
}

/// Merge 8-bit H, S, V planes back into an RGB image.
pub fn hsv_to_rgb(planes: &Planes) -> RgbImage {
    merge_with(planes, hsv_to_rgb_pixel)
}
