mod batch;
mod black_point;
mod codec;
mod config;
mod dither;
mod error;
mod folders;
mod naming;
mod pipeline;
mod quantize;
mod resize;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt};

use crate::codec::OutputFormat;
use crate::pipeline::Recipe;

#[derive(Parser)]
#[command(name = "psx-converter")]
#[command(about = "Convert HD images into 256px, 32-color PlayStation-style textures")]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create "PSX Images/Unprocessed" and "PSX Images/Processed" under PARENT and remember it
    Init {
        /// Existing folder to create the workspace in
        parent: PathBuf,
    },
    /// Convert every *HD.jpg / *HD.png in Unprocessed into Processed
    Convert {
        #[arg(value_enum)]
        recipe: Recipe,

        /// Output format: png or jpg (defaults to the config's output.format)
        #[arg(short, long)]
        format: Option<String>,

        /// Workspace root to use instead of the remembered one
        #[arg(short, long)]
        root: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    // Load config first so we can honor logging.filter directive.
    let mut cfg_mgr = config::ConfigManager::load(cli.config).await?;
    let cfg = cfg_mgr.to_struct()?;
    let filter_directive = cfg
        .logging
        .as_ref()
        .and_then(|l| l.filter.clone())
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| "info,psx_converter=debug".to_string());
    fmt()
        .with_env_filter(EnvFilter::new(filter_directive))
        .init();

    match cli.command {
        Commands::Init { parent } => {
            let ws = folders::create_workspace(&parent).await?;
            cfg_mgr.set_workspace_root(&ws.root);
            cfg_mgr.save().await?;
            tracing::info!(
                config = %cfg_mgr.path().display(),
                input = %ws.input.display(),
                "workspace saved; place images ending in HD in the input folder"
            );
        }
        Commands::Convert {
            recipe,
            format,
            root,
        } => {
            let Some(root) = root.or_else(|| cfg.workspace.as_ref().and_then(|w| w.root.clone()))
            else {
                bail!("no workspace configured; run `psx-converter init <folder>` first or pass --root");
            };
            let token = format
                .or_else(|| cfg.output.as_ref().and_then(|o| o.format.clone()))
                .unwrap_or_else(|| "png".to_string());
            let format: OutputFormat = token.parse()?;
            cfg.tuning.validate()?;
            let ws = folders::Workspace::open(&root)
                .await
                .with_context(|| format!("opening workspace {}", root.display()))?;
            let report = batch::run_batch(&ws, recipe, format, Arc::new(cfg.tuning)).await?;
            if report.failed > 0 {
                tracing::warn!(failed = report.failed, "some files could not be converted");
            }
        }
    }
    Ok(())
}
