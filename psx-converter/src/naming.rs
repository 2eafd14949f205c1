//! File name convention: `<stem>HD.jpg` / `<stem>HD.png` in, `<stem>SD.<ext>` out.

use crate::codec::OutputFormat;
use crate::pipeline::ChannelMode;

pub const SOURCE_TAG: &str = "HD";
pub const OUTPUT_TAG: &str = "SD";

/// Recognized source extensions and the channel mode each implies.
const SOURCE_EXTENSIONS: [(&str, ChannelMode); 2] =
    [("jpg", ChannelMode::Rgb), ("png", ChannelMode::Rgba)];

/// A file name that follows the HD tag convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceName {
    /// Everything before the `HD` tag.
    pub stem: String,
    pub mode: ChannelMode,
}

impl SourceName {
    /// Parse a bare file name. Returns `None` for anything not ending in `HD.jpg` or `HD.png`.
    pub fn parse(file_name: &str) -> Option<Self> {
        let (base, ext) = file_name.rsplit_once('.')?;
        let mode = SOURCE_EXTENSIONS
            .iter()
            .find(|(e, _)| *e == ext)
            .map(|(_, m)| *m)?;
        let stem = base.strip_suffix(SOURCE_TAG)?;
        Some(Self {
            stem: stem.to_string(),
            mode,
        })
    }

    pub fn output_file_name(&self, format: OutputFormat) -> String {
        format!("{}{}.{}", self.stem, OUTPUT_TAG, format.extension())
    }
}
