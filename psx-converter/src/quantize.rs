//! Median-cut palette reduction.
//!
//! Colors are mapped to the nearest palette entry without any error diffusion;
//! ordered effects belong to the dither stages, not here.

use image::{DynamicImage, GrayImage, RgbImage, RgbaImage};
use std::collections::HashMap;

/// A box of distinct colors with their pixel counts.
#[derive(Debug, Clone)]
struct ColorBox {
    entries: Vec<([u8; 3], u32)>,
}

impl ColorBox {
    fn total_weight(&self) -> u64 {
        self.entries.iter().map(|(_, w)| *w as u64).sum()
    }

    /// Range (max - min) per channel.
    fn ranges(&self) -> [u8; 3] {
        let mut lo = [u8::MAX; 3];
        let mut hi = [u8::MIN; 3];
        for (c, _) in &self.entries {
            for ch in 0..3 {
                lo[ch] = lo[ch].min(c[ch]);
                hi[ch] = hi[ch].max(c[ch]);
            }
        }
        [
            hi[0].saturating_sub(lo[0]),
            hi[1].saturating_sub(lo[1]),
            hi[2].saturating_sub(lo[2]),
        ]
    }

    /// Heavier boxes with wider spread split first.
    fn priority(&self) -> u64 {
        if self.entries.len() < 2 {
            return 0;
        }
        let widest = *self.ranges().iter().max().unwrap_or(&0) as u64;
        self.total_weight() * widest
    }

    fn mean(&self) -> [u8; 3] {
        let mut sum = [0u64; 3];
        let mut total = 0u64;
        for (c, w) in &self.entries {
            for ch in 0..3 {
                sum[ch] += c[ch] as u64 * *w as u64;
            }
            total += *w as u64;
        }
        if total == 0 {
            return [0, 0, 0];
        }
        // rounded integer mean, always within [0,255]
        sum.map(|s| ((s + total / 2) / total).min(255) as u8)
    }

    /// Split along the widest channel at the weighted median.
    fn split(mut self) -> (ColorBox, ColorBox) {
        let ranges = self.ranges();
        let axis = if ranges[0] >= ranges[1] && ranges[0] >= ranges[2] {
            0
        } else if ranges[1] >= ranges[2] {
            1
        } else {
            2
        };
        self.entries.sort_unstable_by_key(|(c, _)| c[axis]);
        let half = self.total_weight() / 2;
        let mut acc = 0u64;
        let mut cut = self.entries.len() / 2;
        for (i, (_, w)) in self.entries.iter().enumerate() {
            acc += *w as u64;
            if acc >= half {
                cut = i + 1;
                break;
            }
        }
        let cut = cut.clamp(1, self.entries.len() - 1);
        let upper = self.entries.split_off(cut);
        (self, ColorBox { entries: upper })
    }
}

/// Build a palette of at most `colors` entries from a color histogram.
fn median_cut(histogram: &HashMap<[u8; 3], u32>, colors: usize) -> Vec<[u8; 3]> {
    let mut boxes = vec![ColorBox {
        entries: histogram.iter().map(|(c, w)| (*c, *w)).collect(),
    }];
    while boxes.len() < colors {
        let Some((idx, best)) = boxes
            .iter()
            .enumerate()
            .map(|(i, b)| (i, b.priority()))
            .max_by_key(|(_, p)| *p)
        else {
            break;
        };
        if best == 0 {
            break;
        }
        let (a, b) = boxes.swap_remove(idx).split();
        boxes.push(a);
        boxes.push(b);
    }
    boxes.iter().map(ColorBox::mean).collect()
}

fn nearest(palette: &[[u8; 3]], c: [u8; 3]) -> [u8; 3] {
    let mut best = palette[0];
    let mut best_d = u32::MAX;
    for &p in palette {
        let dr = c[0] as i32 - p[0] as i32;
        let dg = c[1] as i32 - p[1] as i32;
        let db = c[2] as i32 - p[2] as i32;
        let d = (dr * dr + dg * dg + db * db) as u32;
        if d < best_d {
            best_d = d;
            best = p;
        }
    }
    best
}

/// Reduce an RGB image to at most `colors` distinct colors.
pub fn quantize(img: &RgbImage, colors: usize) -> RgbImage {
    let colors = colors.max(1);
    let mut histogram: HashMap<[u8; 3], u32> = HashMap::new();
    for px in img.pixels() {
        *histogram.entry(px.0).or_insert(0) += 1;
    }
    if histogram.len() <= colors {
        return img.clone();
    }
    let palette = median_cut(&histogram, colors);
    tracing::trace!(
        distinct = histogram.len(),
        palette = palette.len(),
        "median cut palette"
    );
    let lookup: HashMap<[u8; 3], [u8; 3]> = histogram
        .keys()
        .map(|&c| (c, nearest(&palette, c)))
        .collect();
    let mut out = img.clone();
    for px in out.pixels_mut() {
        if let Some(mapped) = lookup.get(&px.0) {
            px.0 = *mapped;
        }
    }
    out
}

/// Quantize the color channels only; an alpha channel, if any, is carried over untouched.
pub fn quantize_keep_alpha(img: &DynamicImage, colors: usize) -> DynamicImage {
    if !img.color().has_alpha() {
        return DynamicImage::ImageRgb8(quantize(&img.to_rgb8(), colors));
    }
    let rgba = img.to_rgba8();
    let (w, h) = rgba.dimensions();
    let alpha = GrayImage::from_fn(w, h, |x, y| image::Luma([rgba.get_pixel(x, y)[3]]));
    let rgb = quantize(&DynamicImage::ImageRgba8(rgba).to_rgb8(), colors);
    let merged = RgbaImage::from_fn(w, h, |x, y| {
        let c = rgb.get_pixel(x, y);
        image::Rgba([c[0], c[1], c[2], alpha.get_pixel(x, y)[0]])
    });
    DynamicImage::ImageRgba8(merged)
}
