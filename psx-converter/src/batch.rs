use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use glob::{Pattern, glob};
use tokio::task::JoinError;

use crate::codec::{self, OutputFormat};
use crate::config::Tuning;
use crate::folders::Workspace;
use crate::naming::SourceName;
use crate::pipeline::{self, Recipe};

/// Counts for one batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Regular files directly inside `dir`, sorted by name.
pub fn list_inputs(dir: &Path) -> Result<Vec<PathBuf>> {
    let pattern = format!("{}/*", Pattern::escape(&dir.to_string_lossy()));
    let mut files: Vec<PathBuf> = glob(&pattern)
        .with_context(|| format!("evaluating glob {pattern}"))?
        .flatten()
        .filter(|p| p.is_file())
        .collect();
    files.sort();
    Ok(files)
}

/// Decode, convert and write a single source. Returns the written path.
fn convert_file(
    input: &Path,
    source: &SourceName,
    output_dir: &Path,
    recipe: Recipe,
    format: OutputFormat,
    tuning: &Tuning,
) -> Result<PathBuf> {
    let img = codec::decode(input, source.mode)
        .with_context(|| format!("decoding {}", input.display()))?;
    let converted = pipeline::run(img, source.mode, recipe, tuning)?;
    let target = output_dir.join(source.output_file_name(format));
    let written = codec::save_image(&converted, &target, format)
        .with_context(|| format!("writing {}", target.display()))?;
    Ok(written)
}

/// Log and count the result of one conversion task. A task that panicked
/// counts as a failure like any other.
fn record_outcome(
    report: &mut BatchReport,
    name: &str,
    joined: Result<Result<PathBuf>, JoinError>,
) {
    match joined {
        Ok(Ok(written)) => {
            tracing::info!(file = %name, output = %written.display(), "converted");
            report.processed += 1;
        }
        Ok(Err(e)) => {
            let error = format!("{e:#}");
            tracing::warn!(file = %name, %error, "conversion failed");
            report.failed += 1;
        }
        Err(e) => {
            tracing::warn!(file = %name, error = %e, "conversion task panicked");
            report.failed += 1;
        }
    }
}

/// Run `recipe` over every matching file in the workspace input folder, one at a time.
///
/// Files that do not follow the naming convention, or whose channel mode the
/// recipe does not handle, are skipped. A file that fails is logged and the
/// batch moves on.
pub async fn run_batch(
    workspace: &Workspace,
    recipe: Recipe,
    format: OutputFormat,
    tuning: Arc<Tuning>,
) -> Result<BatchReport> {
    let mut report = BatchReport::default();
    let inputs = list_inputs(&workspace.input)?;
    tracing::info!(?recipe, ?format, files = inputs.len(), input = %workspace.input.display(), "starting batch");
    for path in inputs {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let Some(source) = SourceName::parse(&name) else {
            tracing::trace!(file = %name, "not an HD source; skipping");
            report.skipped += 1;
            continue;
        };
        if !recipe.accepts(source.mode) {
            tracing::trace!(file = %name, mode = ?source.mode, "recipe does not take this source; skipping");
            report.skipped += 1;
            continue;
        }
        let output_dir = workspace.output.clone();
        let tuning = Arc::clone(&tuning);
        let input = path.clone();
        let joined = tokio::task::spawn_blocking(move || {
            convert_file(&input, &source, &output_dir, recipe, format, &tuning)
        })
        .await;
        record_outcome(&mut report, &name, joined);
    }
    tracing::info!(
        processed = report.processed,
        skipped = report.skipped,
        failed = report.failed,
        "batch finished"
    );
    Ok(report)
}
