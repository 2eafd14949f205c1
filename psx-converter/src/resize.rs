use crate::config::Tuning;
use image::DynamicImage;
use image::imageops::FilterType;

/// Fit `width`x`height` to `target_height`, never letting the width exceed `max_edge`.
/// Aspect ratio is kept up to integer rounding; both results are at least 1.
pub fn fit_dimensions(width: u32, height: u32, target_height: u32, max_edge: u32) -> (u32, u32) {
    let aspect = width as f64 / height as f64;
    let mut new_h = target_height;
    let mut new_w = (aspect * new_h as f64).round() as u32;
    if new_w > max_edge {
        new_w = max_edge;
        new_h = (new_w as f64 / aspect).round() as u32;
    }
    (new_w.max(1), new_h.max(1))
}

/// Nearest-neighbor resize to `target_height` (width capped at the tuning's target size).
///
/// When the source is taller than `target_height / pixel_scale` an intermediate
/// downscale by `pixel_scale` runs first, so the final pass blows the image back up
/// into chunky pixels. With a scale of 1 that intermediate step is the final size
/// and is skipped.
pub fn resize(img: &DynamicImage, target_height: u32, tuning: &Tuning) -> DynamicImage {
    let (w, h) = fit_dimensions(img.width(), img.height(), target_height, tuning.target_size);
    let scale = tuning.pixel_scale.max(1);
    let mut src = img.clone();
    if img.height() > target_height / scale && scale > 1 {
        let (pw, ph) = ((w / scale).max(1), (h / scale).max(1));
        tracing::trace!(pre_w = pw, pre_h = ph, scale, "pixel scale pre-pass");
        src = src.resize_exact(pw, ph, FilterType::Nearest);
    }
    if src.width() == w && src.height() == h {
        return src;
    }
    src.resize_exact(w, h, FilterType::Nearest)
}
