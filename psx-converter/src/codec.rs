use std::path::{Path, PathBuf};
use std::str::FromStr;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};

use crate::error::ConvertError;
use crate::pipeline::ChannelMode;

/// Encoding used for processed images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Lossless, keeps every channel present.
    #[default]
    Png,
    /// Quality 100; alpha is flattened away.
    Jpeg,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(OutputFormat::Png),
            "jpg" | "jpeg" => Ok(OutputFormat::Jpeg),
            _ => Err(ConvertError::InvalidFormat(s.to_string())),
        }
    }
}

/// Decode a file into the channel layout the pipeline expects for it.
pub fn decode(path: &Path, mode: ChannelMode) -> Result<DynamicImage, ConvertError> {
    let img = image::open(path)?;
    Ok(match mode {
        ChannelMode::Rgb => DynamicImage::ImageRgb8(img.to_rgb8()),
        ChannelMode::Rgba => DynamicImage::ImageRgba8(img.to_rgba8()),
    })
}

/// Encode into an in-memory buffer.
pub fn encode(img: &DynamicImage, format: OutputFormat) -> Result<Vec<u8>, ConvertError> {
    let mut bytes = Vec::new();
    match format {
        OutputFormat::Png => {
            img.write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Png)?;
        }
        OutputFormat::Jpeg => {
            let rgb = img.to_rgb8();
            JpegEncoder::new_with_quality(&mut bytes, 100).encode_image(&rgb)?;
        }
    }
    Ok(bytes)
}

/// Encode and write `img`, forcing the path's extension to match `format`.
/// Returns the path actually written.
pub fn save_image(
    img: &DynamicImage,
    path: &Path,
    format: OutputFormat,
) -> Result<PathBuf, ConvertError> {
    let out = path.with_extension(format.extension());
    let bytes = encode(img, format)?;
    std::fs::write(&out, bytes)?;
    Ok(out)
}
