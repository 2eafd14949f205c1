use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tokio::fs;

pub const WORKSPACE_DIR: &str = "PSX Images";
pub const INPUT_DIR: &str = "Unprocessed";
pub const OUTPUT_DIR: &str = "Processed";

/// Root folder with its input and output subfolders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    pub root: PathBuf,
    pub input: PathBuf,
    pub output: PathBuf,
}

impl Workspace {
    fn at(root: PathBuf) -> Self {
        Self {
            input: root.join(INPUT_DIR),
            output: root.join(OUTPUT_DIR),
            root,
        }
    }

    /// Open an existing workspace root, recreating missing subfolders.
    pub async fn open(root: &Path) -> Result<Self> {
        if !root.is_dir() {
            bail!("workspace root {} does not exist", root.display());
        }
        let ws = Self::at(root.to_path_buf());
        ws.ensure_dirs().await?;
        Ok(ws)
    }

    async fn ensure_dirs(&self) -> Result<()> {
        for dir in [&self.input, &self.output] {
            fs::create_dir_all(dir)
                .await
                .with_context(|| format!("creating {}", dir.display()))?;
        }
        Ok(())
    }
}

/// Create `<parent>/PSX Images/{Unprocessed,Processed}`. `parent` must already exist.
pub async fn create_workspace(parent: &Path) -> Result<Workspace> {
    if !parent.is_dir() {
        bail!("folder {} does not exist", parent.display());
    }
    let ws = Workspace::at(parent.join(WORKSPACE_DIR));
    ws.ensure_dirs().await?;
    tracing::info!(root = %ws.root.display(), "workspace folders ready");
    Ok(ws)
}
