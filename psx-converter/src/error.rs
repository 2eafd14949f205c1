use thiserror::Error;

use crate::pipeline::{ChannelMode, Recipe};

/// Errors raised by the image transforms and the codec layer.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("invalid output format '{0}' (expected png or jpg)")]
    InvalidFormat(String),
    #[error("recipe {recipe:?} does not accept {mode:?} sources")]
    UnsupportedMode { recipe: Recipe, mode: ChannelMode },
    #[error("image has a zero dimension ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },
    #[error("invalid tuning: {0}")]
    InvalidTuning(String),
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
