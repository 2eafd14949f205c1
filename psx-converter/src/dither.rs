//! Ordered 4x4 dithering for the console's binary transparency.
//!
//! The target GPU has no partial alpha: a texel is either drawn or it is the
//! black transparency key. Continuous alpha is therefore turned into a spatial
//! on/off pattern by comparing it against a tiled threshold matrix.

use image::RgbaImage;

/// Per-position alpha thresholds. A pixel stays visible when its alpha is at
/// least the threshold for its position modulo 4.
#[rustfmt::skip]
pub const TRANSPARENCY_THRESHOLDS: [[i32; 4]; 4] = [
    [  4, 120,  30, 150],
    [180,  60, 210,  90],
    [ 30, 150,   4, 120],
    [210,  90, 180,  60],
];

/// Signed color offsets matching the console's own 4x4 dither table. Only used
/// when pre-dithering colors before quantization.
#[rustfmt::skip]
pub const DITHER_OFFSETS: [[i32; 4]; 4] = [
    [-4,  0, -3,  1],
    [ 2, -2,  3, -1],
    [-3,  1, -4,  0],
    [ 3, -1,  2, -2],
];

/// Fully opaque transparency key written where a pixel drops out.
pub const TRANSPARENT_KEY: [u8; 4] = [0, 0, 0, 255];

#[inline(always)]
fn threshold_at(matrix: &[[i32; 4]; 4], x: u32, y: u32) -> u8 {
    matrix[(y % 4) as usize][(x % 4) as usize].clamp(0, 255) as u8
}

/// Replace alpha with an ordered on/off pattern.
///
/// Pixels whose alpha reaches the threshold keep their color at alpha 255;
/// the rest become [`TRANSPARENT_KEY`]. Every output pixel is opaque.
pub fn dither_transparency(img: &mut RgbaImage, thresholds: &[[i32; 4]; 4]) {
    let mut dropped = 0usize;
    for (x, y, px) in img.enumerate_pixels_mut() {
        if px[3] >= threshold_at(thresholds, x, y) {
            px[3] = 255;
        } else {
            px.0 = TRANSPARENT_KEY;
            dropped += 1;
        }
    }
    tracing::trace!(dropped, "transparency dispersed");
}

/// Add the ordered color offsets to every RGB channel, saturating at both ends.
/// Alpha is left alone.
pub fn dither_colors(img: &mut RgbaImage, offsets: &[[i32; 4]; 4]) {
    for (x, y, px) in img.enumerate_pixels_mut() {
        let d = offsets[(y % 4) as usize][(x % 4) as usize];
        for c in px.0.iter_mut().take(3) {
            *c = (*c as i32 + d).clamp(0, 255) as u8;
        }
    }
}
