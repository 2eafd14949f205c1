use crate::black_point::adjust_black_point;
use crate::config::Tuning;
use crate::dither::{dither_colors, dither_transparency};
use crate::error::ConvertError;
use crate::quantize::quantize_keep_alpha;
use crate::resize::resize;
use image::DynamicImage;

/// Channel layout a source is decoded into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelMode {
    Rgb,
    Rgba,
}

/// The conversions a batch can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Recipe {
    /// Downscale only.
    Reduce,
    /// Move pure black off the transparency key (and dither alpha).
    BlackPoint,
    /// Fit to the long edge at the current height and reduce to the palette.
    Quantize,
    /// Everything, flattened to RGB.
    Full,
}

/// Height a resize stage aims for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeTarget {
    /// The configured target size.
    LongEdge,
    /// The current image height (the "second pass"; only clamps the width).
    SourceHeight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Resize(ResizeTarget),
    PreDither,
    Quantize(usize),
    BlackPoint,
    DisperseTransparency,
    FlattenRgb,
}

impl Recipe {
    /// Whether a source decoded as `mode` is handled by this recipe.
    pub fn accepts(self, mode: ChannelMode) -> bool {
        match self {
            Recipe::Reduce | Recipe::Quantize => mode == ChannelMode::Rgb,
            Recipe::BlackPoint | Recipe::Full => true,
        }
    }

    /// Ordered stage list for a source of the given channel mode.
    pub fn plan(self, mode: ChannelMode, tuning: &Tuning) -> Result<Vec<Stage>, ConvertError> {
        if !self.accepts(mode) {
            return Err(ConvertError::UnsupportedMode { recipe: self, mode });
        }
        let has_alpha = mode == ChannelMode::Rgba;
        let mut stages = Vec::new();
        if self == Recipe::Reduce || self == Recipe::Full {
            stages.push(Stage::Resize(ResizeTarget::LongEdge));
        }
        if self == Recipe::Quantize || self == Recipe::Full {
            stages.push(Stage::Resize(ResizeTarget::SourceHeight));
            if tuning.pre_dither {
                stages.push(Stage::PreDither);
            }
            stages.push(Stage::Quantize(tuning.palette_colors));
        }
        if self == Recipe::BlackPoint || self == Recipe::Full {
            stages.push(Stage::BlackPoint);
            // the dropped-out pixels are the sentinel itself and must come after the nudge
            if has_alpha {
                stages.push(Stage::DisperseTransparency);
            }
        }
        if self == Recipe::Full {
            stages.push(Stage::FlattenRgb);
        }
        Ok(stages)
    }
}

pub fn apply_stage(img: DynamicImage, stage: Stage, tuning: &Tuning) -> DynamicImage {
    match stage {
        Stage::Resize(ResizeTarget::LongEdge) => resize(&img, tuning.target_size, tuning),
        Stage::Resize(ResizeTarget::SourceHeight) => resize(&img, img.height(), tuning),
        Stage::PreDither => {
            let had_alpha = img.color().has_alpha();
            let mut buf = img.to_rgba8();
            dither_colors(&mut buf, &tuning.dither_offsets);
            let out = DynamicImage::ImageRgba8(buf);
            if had_alpha {
                out
            } else {
                DynamicImage::ImageRgb8(out.to_rgb8())
            }
        }
        Stage::Quantize(colors) => quantize_keep_alpha(&img, colors),
        Stage::BlackPoint => DynamicImage::ImageRgba8(adjust_black_point(&img)),
        Stage::DisperseTransparency => {
            let mut buf = img.to_rgba8();
            dither_transparency(&mut buf, &tuning.transparency_thresholds);
            DynamicImage::ImageRgba8(buf)
        }
        Stage::FlattenRgb => DynamicImage::ImageRgb8(img.to_rgb8()),
    }
}

/// Run `recipe` over a decoded image.
pub fn run(
    img: DynamicImage,
    mode: ChannelMode,
    recipe: Recipe,
    tuning: &Tuning,
) -> Result<DynamicImage, ConvertError> {
    if img.width() == 0 || img.height() == 0 {
        return Err(ConvertError::EmptyImage {
            width: img.width(),
            height: img.height(),
        });
    }
    let stages = recipe.plan(mode, tuning)?;
    let mut img = img;
    for stage in stages {
        img = apply_stage(img, stage, tuning);
        tracing::debug!(?stage, w = img.width(), h = img.height(), "stage done");
    }
    Ok(img)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};
    use std::collections::HashSet;

    fn scene(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| {
            if x < 64 {
                // pure black artwork, opaque
                Rgba([0, 0, 0, 255])
            } else {
                Rgba([
                    (x % 256) as u8,
                    (y * 255 / h) as u8,
                    ((x / 2 + y) % 256) as u8,
                    (x * 255 / w) as u8,
                ])
            }
        })
    }

    #[test]
    fn full_plan_orders_every_stage() {
        let t = Tuning::default();
        assert_eq!(
            Recipe::Full.plan(ChannelMode::Rgba, &t).unwrap(),
            vec![
                Stage::Resize(ResizeTarget::LongEdge),
                Stage::Resize(ResizeTarget::SourceHeight),
                Stage::Quantize(32),
                Stage::BlackPoint,
                Stage::DisperseTransparency,
                Stage::FlattenRgb,
            ]
        );
        let rgb = Recipe::Full.plan(ChannelMode::Rgb, &t).unwrap();
        assert!(!rgb.contains(&Stage::DisperseTransparency));
        assert_eq!(rgb.last(), Some(&Stage::FlattenRgb));
    }

    #[test]
    fn other_plans() {
        let t = Tuning::default();
        assert_eq!(
            Recipe::Reduce.plan(ChannelMode::Rgb, &t).unwrap(),
            vec![Stage::Resize(ResizeTarget::LongEdge)]
        );
        assert_eq!(
            Recipe::Quantize.plan(ChannelMode::Rgb, &t).unwrap(),
            vec![Stage::Resize(ResizeTarget::SourceHeight), Stage::Quantize(32)]
        );
        assert_eq!(
            Recipe::BlackPoint.plan(ChannelMode::Rgba, &t).unwrap(),
            vec![Stage::BlackPoint, Stage::DisperseTransparency]
        );
        assert_eq!(
            Recipe::BlackPoint.plan(ChannelMode::Rgb, &t).unwrap(),
            vec![Stage::BlackPoint]
        );
        let pre = Tuning {
            pre_dither: true,
            ..Tuning::default()
        };
        assert_eq!(
            Recipe::Quantize.plan(ChannelMode::Rgb, &pre).unwrap(),
            vec![
                Stage::Resize(ResizeTarget::SourceHeight),
                Stage::PreDither,
                Stage::Quantize(32)
            ]
        );
    }

    #[test]
    fn rgb_only_recipes_reject_alpha_sources() {
        let t = Tuning::default();
        for recipe in [Recipe::Reduce, Recipe::Quantize] {
            assert!(!recipe.accepts(ChannelMode::Rgba));
            let img = DynamicImage::ImageRgba8(scene(8, 8));
            assert!(matches!(
                run(img, ChannelMode::Rgba, recipe, &t),
                Err(ConvertError::UnsupportedMode { .. })
            ));
        }
        assert!(Recipe::Full.accepts(ChannelMode::Rgb));
        assert!(Recipe::BlackPoint.accepts(ChannelMode::Rgba));
    }

    #[test]
    fn full_recipe_end_to_end() {
        let t = Tuning::default();
        let src = DynamicImage::ImageRgba8(scene(512, 256));
        let out = run(src.clone(), ChannelMode::Rgba, Recipe::Full, &t).unwrap();
        let out = out.as_rgb8().expect("full output is flattened rgb").clone();
        assert_eq!(out.dimensions(), (256, 128));
        let colors: HashSet<[u8; 3]> = out.pixels().map(|p| p.0).collect();
        // 32 palette colors plus the transparency key
        assert!(colors.len() <= 33);

        // replay up to the black point to learn the alpha the disperser saw
        let stages = Recipe::Full.plan(ChannelMode::Rgba, &t).unwrap();
        let mut pre = src;
        for stage in stages.iter().take_while(|s| **s != Stage::DisperseTransparency) {
            pre = apply_stage(pre, *stage, &t);
        }
        let pre = pre.to_rgba8();
        assert!(pre.pixels().all(|p| p.0[..3] != [0, 0, 0]));
        for (x, y, px) in out.enumerate_pixels() {
            let alpha = pre.get_pixel(x, y)[3] as i32;
            let threshold = t.transparency_thresholds[(y % 4) as usize][(x % 4) as usize];
            if px.0 == [0, 0, 0] {
                assert!(alpha < threshold, "unexpected black at {x},{y}");
            } else {
                assert!(alpha >= threshold);
            }
        }
        // the opaque dark artwork on the left is never mistaken for the key
        assert_ne!(out.get_pixel(0, 0).0, [0, 0, 0]);
    }

    #[test]
    fn full_recipe_on_rgb_source_has_no_sentinel() {
        let src = DynamicImage::ImageRgb8(RgbImage::from_fn(300, 600, |x, y| {
            if y < 100 { Rgb([0, 0, 0]) } else { Rgb([(x % 256) as u8, (y % 256) as u8, 40]) }
        }));
        let out = run(src, ChannelMode::Rgb, Recipe::Full, &Tuning::default()).unwrap();
        let out = out.as_rgb8().unwrap();
        assert_eq!(out.dimensions(), (128, 256));
        assert!(out.pixels().all(|p| p.0 != [0, 0, 0]));
    }

    #[test]
    fn black_point_recipe_keeps_size_and_alpha_opacity() {
        let src = DynamicImage::ImageRgba8(scene(128, 20));
        let out = run(src, ChannelMode::Rgba, Recipe::BlackPoint, &Tuning::default()).unwrap();
        let out = out.as_rgba8().unwrap();
        assert_eq!(out.dimensions(), (128, 20));
        assert!(out.pixels().all(|p| p[3] == 255));
    }

    #[test]
    fn quantize_recipe_clamps_width_and_palette() {
        let src = DynamicImage::ImageRgb8(RgbImage::from_fn(512, 256, |x, y| {
            Rgb([(x / 2) as u8, y as u8, ((x + y) / 3) as u8])
        }));
        let out = run(src, ChannelMode::Rgb, Recipe::Quantize, &Tuning::default()).unwrap();
        let out = out.to_rgb8();
        assert_eq!(out.dimensions(), (256, 128));
        let colors: HashSet<[u8; 3]> = out.pixels().map(|p| p.0).collect();
        assert!(colors.len() <= 32);
    }

    #[test]
    fn pre_dither_quantize_stays_rgb_within_palette() {
        let src = DynamicImage::ImageRgb8(RgbImage::from_fn(512, 256, |x, y| {
            Rgb([(x / 2) as u8, y as u8, ((x + y) / 3) as u8])
        }));
        let t = Tuning {
            pre_dither: true,
            ..Tuning::default()
        };
        let out = run(src, ChannelMode::Rgb, Recipe::Quantize, &t).unwrap();
        let out = out.as_rgb8().expect("pre-dithered output stays rgb");
        assert_eq!(out.dimensions(), (256, 128));
        let colors: HashSet<[u8; 3]> = out.pixels().map(|p| p.0).collect();
        assert!(colors.len() <= 32);
    }

    #[test]
    fn pre_dither_stage_keeps_alpha() {
        let src = DynamicImage::ImageRgba8(scene(16, 8));
        let out = apply_stage(src.clone(), Stage::PreDither, &Tuning::default());
        let out = out.as_rgba8().unwrap();
        let src = src.to_rgba8();
        for (a, b) in src.pixels().zip(out.pixels()) {
            assert_eq!(a[3], b[3]);
        }
        // offset -4 at (0,0) cannot push pure black below zero
        assert_eq!(out.get_pixel(0, 0).0, [0, 0, 0, 255]);
    }

    #[test]
    fn reduce_recipe_fits_long_edge() {
        let src = DynamicImage::ImageRgb8(RgbImage::from_pixel(100, 1000, Rgb([5, 6, 7])));
        let out = run(src, ChannelMode::Rgb, Recipe::Reduce, &Tuning::default()).unwrap();
        assert_eq!((out.width(), out.height()), (26, 256));
        assert!(out.as_rgb8().is_some());
    }

    #[test]
    fn empty_image_is_rejected() {
        let src = DynamicImage::ImageRgb8(RgbImage::new(0, 4));
        assert!(matches!(
            run(src, ChannelMode::Rgb, Recipe::Reduce, &Tuning::default()),
            Err(ConvertError::EmptyImage { width: 0, height: 4 })
        ));
    }
}
