use image::{DynamicImage, RgbaImage};

/// Blue value given to artwork that is pure black. One step of the 32-level
/// palette (256 / 32), so the pixel stays visually black but no longer reads
/// as the transparency key.
pub const NUDGED_BLUE: u8 = 8;

/// Move pure black (0,0,0) off the transparency sentinel.
///
/// Works on an RGBA copy; sources without alpha come back fully opaque. Only
/// the blue channel of exact (0,0,0) pixels changes.
pub fn adjust_black_point(img: &DynamicImage) -> RgbaImage {
    let mut buf = img.to_rgba8();
    let mut nudged = 0usize;
    for px in buf.pixels_mut() {
        if px[0] == 0 && px[1] == 0 && px[2] == 0 {
            px[2] = NUDGED_BLUE;
            nudged += 1;
        }
    }
    tracing::trace!(nudged, "black point adjusted");
    buf
}
