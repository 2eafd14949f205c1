use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;
use toml_edit::{DocumentMut, Item, value};

use crate::dither::{DITHER_OFFSETS, TRANSPARENCY_THRESHOLDS};
use crate::error::ConvertError;

/// Default on-disk config filename
pub const DEFAULT_CONFIG_PATH: &str = "psx-converter.toml";

/// Written when no config file exists yet.
const CONFIG_TEMPLATE: &str = r#"# psx-converter configuration

[logging]
# filter = "info,psx_converter=debug"

[workspace]
# Folder holding the Unprocessed/ and Processed/ subfolders.
# Set by `psx-converter init <parent>`.
# root = "/path/to/PSX Images"

[output]
# png or jpg
format = "png"

[tuning]
# target_size = 256
# pixel_scale = 1
# palette_colors = 32
# pre_dither = false
"#;

/// Strongly typed representation of the configuration.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    pub logging: Option<Logging>,
    pub workspace: Option<WorkspaceConfig>,
    pub output: Option<Output>,
    #[serde(default)]
    pub tuning: Tuning,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Logging {
    pub filter: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct WorkspaceConfig {
    pub root: Option<PathBuf>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Output {
    /// Output format token ("png", "jpg" or "jpeg").
    pub format: Option<String>,
}

/// Knobs of the conversion pipeline. Defaults reproduce the console look:
/// 256px long edge, 32 colors, the stock 4x4 transparency thresholds.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Tuning {
    /// Long edge of the output canvas.
    pub target_size: u32,
    /// Pre-pass downscale factor for chunkier pixels; 1 disables the pre-pass.
    pub pixel_scale: u32,
    pub palette_colors: usize,
    pub transparency_thresholds: [[i32; 4]; 4],
    pub dither_offsets: [[i32; 4]; 4],
    /// Apply the color offsets before quantizing.
    pub pre_dither: bool,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            target_size: 256,
            pixel_scale: 1,
            palette_colors: 32,
            transparency_thresholds: TRANSPARENCY_THRESHOLDS,
            dither_offsets: DITHER_OFFSETS,
            pre_dither: false,
        }
    }
}

impl Tuning {
    pub fn validate(&self) -> Result<(), ConvertError> {
        if self.target_size == 0 {
            return Err(ConvertError::InvalidTuning("target_size must be > 0".into()));
        }
        if self.pixel_scale == 0 {
            return Err(ConvertError::InvalidTuning("pixel_scale must be > 0".into()));
        }
        if !(1..=256).contains(&self.palette_colors) {
            return Err(ConvertError::InvalidTuning(format!(
                "palette_colors must be within 1..=256, got {}",
                self.palette_colors
            )));
        }
        Ok(())
    }
}

/// Owns the config document so edits keep the user's comments and layout.
#[derive(Debug)]
pub struct ConfigManager {
    path: PathBuf,
    doc: DocumentMut,
}

impl ConfigManager {
    /// Load existing config file. If the file does not exist, creates it from the template.
    pub async fn load(path: Option<PathBuf>) -> Result<Self> {
        let path = path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
        if !path.exists() {
            fs::write(&path, CONFIG_TEMPLATE)
                .await
                .with_context(|| format!("writing default config to {}", path.display()))?;
            // logging is not initialised yet
            eprintln!("Created default config file: {}", path.display());
        }
        let text = fs::read_to_string(&path)
            .await
            .with_context(|| format!("reading config file {}", path.display()))?;
        let doc = text
            .parse::<DocumentMut>()
            .with_context(|| format!("parsing config file {}", path.display()))?;
        Ok(Self { path, doc })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Convert current document to strongly typed struct.
    pub fn to_struct(&self) -> Result<Config> {
        let typed: Config = toml_edit::de::from_document(self.doc.clone())
            .with_context(|| format!("invalid config in {}", self.path.display()))?;
        Ok(typed)
    }

    /// Remember the workspace root folder.
    pub fn set_workspace_root(&mut self, root: &Path) {
        let ws = self.doc["workspace"].or_insert(Item::Table(toml_edit::Table::new()));
        ws["root"] = value(root.display().to_string());
    }

    /// Atomic write of current document to disk (best-effort durability via rename).
    pub async fn save(&self) -> Result<()> {
        let tmp = self.path.with_extension("toml.tmp");
        fs::write(&tmp, self.doc.to_string())
            .await
            .with_context(|| format!("writing tmp config {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("renaming tmp config to {}", self.path.display()))?;
        Ok(())
    }
}
